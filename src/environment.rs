use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::Error;
use crate::value::Value;

/// Shared handle to an environment frame.
///
/// The global environment is held by the caller of the evaluator; every other
/// frame is owned by exactly one [`crate::Lambda`].
pub type EnvRef = Rc<RefCell<Environment>>;

/// One frame of variable bindings plus a non-owning link to the frame below it.
///
/// Bindings keep their insertion order. The parent link is only set on a
/// lambda's frame for the duration of a call (see [`ParentScope`]); at rest every
/// frame other than the global one is detached.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    bindings: Vec<(String, Value)>,
    parent: Option<Weak<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            bindings: Vec::new(),
            parent: None,
        }
    }

    /// Wrap a fresh frame in a shared handle
    pub fn new_ref() -> EnvRef {
        Rc::new(RefCell::new(Environment::new()))
    }

    fn parent(&self) -> Option<EnvRef> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Binding in this frame only
    pub fn get_local(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value)
    }

    /// Resolve `name` in this frame, then along the parent chain.
    ///
    /// Returns a copy of the bound value, or an Error value naming the symbol
    /// once the root has been searched.
    pub fn lookup(&self, name: &str) -> Value {
        if let Some(value) = self.get_local(name) {
            return value.clone();
        }
        match self.parent() {
            Some(parent) => parent.borrow().lookup(name),
            None => Error::UnboundSymbol(name.to_owned()).into(),
        }
    }

    /// Bind in this frame, replacing an existing binding of the same name in place
    pub fn bind_local(&mut self, name: &str, value: Value) {
        match self.bindings.iter_mut().find(|(bound, _)| bound == name) {
            Some((_, slot)) => *slot = value,
            None => self.bindings.push((name.to_owned(), value)),
        }
    }

    /// Bind in the root frame of the chain, skipping every intermediate frame.
    ///
    /// This is the global namespace side channel used by `def`: a definition made
    /// inside a lambda body is visible to everyone after the call returns.
    pub fn bind_global(&mut self, name: &str, value: Value) {
        match self.parent() {
            Some(parent) => parent.borrow_mut().bind_global(name, value),
            None => self.bind_local(name, value),
        }
    }

    /// Bindings of this frame in insertion order
    pub fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }
}

/// Temporarily layers a lambda's frame on top of the calling environment.
///
/// While the guard lives, lookups that miss in `frame` continue in `caller`.
/// Dropping the guard detaches the frame again, also on early return, so a frame
/// never keeps pointing at a caller that has finished.
pub(crate) struct ParentScope<'a> {
    frame: &'a EnvRef,
    previous: Option<Weak<RefCell<Environment>>>,
}

impl<'a> ParentScope<'a> {
    pub(crate) fn attach(frame: &'a EnvRef, caller: &EnvRef) -> Self {
        let previous = frame.borrow_mut().parent.replace(Rc::downgrade(caller));
        ParentScope { frame, previous }
    }
}

impl Drop for ParentScope<'_> {
    fn drop(&mut self) {
        self.frame.borrow_mut().parent = self.previous.take();
    }
}
