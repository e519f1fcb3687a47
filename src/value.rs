//! This module defines [`Value`], the single datum every part of the interpreter
//! works with: numbers, errors, symbols, builtin and user-defined functions, and
//! the two list flavours (evaluable S-expressions and literal Q-expressions).
//!
//! Values have value semantics. Every composite exclusively owns its children and
//! `Clone` is a deep copy, including the private environment frame of a
//! [`Lambda`]. Binding a value anywhere therefore stores an independent copy.
//! Ergonomic helpers such as [`num`], [`sym`], [`sexpr`] and [`qexpr`] keep AST
//! construction in code and tests short.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::Error;
use crate::builtinops::BuiltinOp;
use crate::environment::{EnvRef, Environment};

/// Type alias for number values in interpreter
pub type NumberType = i64;

/// The formal that makes the following formal collect all remaining arguments
pub const REST_MARKER: &str = "&";

/// Core value type of the interpreter
#[derive(Clone)]
pub enum Value {
    /// Numbers (integers only)
    Number(NumberType),
    /// First-class failure carrying its message
    Error(String),
    /// Identifiers, resolved through the environment when evaluated
    Symbol(String),
    /// Primitive operation from the builtin registry
    Builtin(&'static BuiltinOp),
    /// User-defined function
    Lambda(Lambda),
    /// Evaluable list `( ... )`
    Sexpr(Vec<Value>),
    /// Literal list `{ ... }`, never evaluated implicitly
    Qexpr(Vec<Value>),
}

/// A user-defined function.
///
/// The lambda owns its own environment frame. Arguments are bound into that frame
/// as they arrive, and the frame survives between calls, which is what makes a
/// partially applied lambda remember the arguments it has already received.
pub struct Lambda {
    pub(crate) formals: Vec<String>,
    pub(crate) body: Vec<Value>,
    pub(crate) env: EnvRef,
}

impl Lambda {
    pub(crate) fn new(formals: Vec<String>, body: Vec<Value>) -> Self {
        Lambda {
            formals,
            body,
            env: Rc::new(RefCell::new(Environment::new())),
        }
    }

    /// Formals that have not been bound yet
    pub fn formals(&self) -> &[String] {
        &self.formals
    }

    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Snapshot of the arguments bound so far, in binding order
    pub fn bound(&self) -> Vec<(String, Value)> {
        self.env.borrow().bindings().to_vec()
    }
}

impl Clone for Lambda {
    /// Deep copy: the copy gets its own frame holding copies of the bound arguments.
    fn clone(&self) -> Self {
        let frame = self.env.borrow().clone();
        Lambda {
            formals: self.formals.clone(),
            body: self.body.clone(),
            env: Rc::new(RefCell::new(frame)),
        }
    }
}

impl PartialEq for Lambda {
    // The captured frame does not take part in equality.
    fn eq(&self, other: &Self) -> bool {
        self.formals == other.formals && self.body == other.body
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lambda(formals={:?}, body={:?})", self.formals, self.body)
    }
}

impl Value {
    /// Type name used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => Value::NUMBER,
            Value::Error(_) => Value::ERROR,
            Value::Symbol(_) => Value::SYMBOL,
            Value::Builtin(_) | Value::Lambda(_) => Value::FUNCTION,
            Value::Sexpr(_) => Value::SEXPR,
            Value::Qexpr(_) => Value::QEXPR,
        }
    }

    pub const NUMBER: &'static str = "Number";
    pub const ERROR: &'static str = "Error";
    pub const SYMBOL: &'static str = "Symbol";
    pub const FUNCTION: &'static str = "Function";
    pub const SEXPR: &'static str = "S-Expression";
    pub const QEXPR: &'static str = "Q-Expression";

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Builtin(_) | Value::Lambda(_))
    }

    /// Empty evaluable list, the result of definitions
    pub fn unit() -> Value {
        Value::Sexpr(Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({n})"),
            Value::Error(msg) => write!(f, "Error({msg:?})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Builtin(op) => write!(f, "Builtin({})", op.id),
            Value::Lambda(lambda) => write!(f, "{lambda:?}"),
            Value::Sexpr(cells) => write!(f, "Sexpr({cells:?})"),
            Value::Qexpr(cells) => write!(f, "Qexpr({cells:?})"),
        }
    }
}

fn write_cells(f: &mut fmt::Formatter<'_>, open: char, cells: &[Value], close: char) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Error(msg) => write!(f, "Error: {msg}"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Builtin(_) => write!(f, "<builtin>"),
            Value::Lambda(lambda) => {
                write!(f, "(\\ {{")?;
                for (i, formal) in lambda.formals.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{formal}")?;
                }
                write!(f, "}} ")?;
                write_cells(f, '{', &lambda.body, '}')?;
                write!(f, ")")
            }
            Value::Sexpr(cells) => write_cells(f, '(', cells, ')'),
            Value::Qexpr(cells) => write_cells(f, '{', cells, '}'),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            // Builtins are equal when they are the same registry entry
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Lambda(a), Value::Lambda(b)) => a == b,
            (Value::Sexpr(a), Value::Sexpr(b)) => a == b,
            (Value::Qexpr(a), Value::Qexpr(b)) => a == b,
            _ => false,
        }
    }
}

// From trait implementations for Value - enables .into() conversion

impl From<Error> for Value {
    fn from(err: Error) -> Self {
        Value::Error(err.to_string())
    }
}

/// Truth values are the numbers 1 and 0.
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Number(NumberType::from(b))
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Number(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

/// Helper for creating numbers
pub fn num(n: NumberType) -> Value {
    Value::Number(n)
}

/// Helper for creating symbols, accepts both &str and String
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper for creating evaluable lists from anything convertible to values
pub fn sexpr<T: Into<Value>>(cells: Vec<T>) -> Value {
    Value::Sexpr(cells.into_iter().map(Into::into).collect())
}

/// Helper for creating literal lists from anything convertible to values
pub fn qexpr<T: Into<Value>>(cells: Vec<T>) -> Value {
    Value::Qexpr(cells.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtinops::find_builtin_op;
    use pretty_assertions::assert_eq;

    fn lambda(formals: &[&str], body: Vec<Value>) -> Value {
        Value::Lambda(Lambda::new(
            formals.iter().map(|s| (*s).to_owned()).collect(),
            body,
        ))
    }

    #[test]
    fn test_structural_equality() {
        // (left, right, expected equality)
        let cases = vec![
            (num(1), num(1), true),
            (num(1), num(2), false),
            (sym("x"), sym("x"), true),
            (sym("x"), sym("y"), false),
            (Value::Error("a".into()), Value::Error("a".into()), true),
            (Value::Error("a".into()), Value::Error("b".into()), false),
            (
                qexpr(vec![num(1), num(2), qexpr(vec![num(3)])]),
                qexpr(vec![num(1), num(2), qexpr(vec![num(3)])]),
                true,
            ),
            (
                qexpr(vec![num(1), num(2)]),
                qexpr(vec![num(1), num(2), num(3)]),
                false,
            ),
            // Same children, different list flavour
            (qexpr(vec![num(1)]), sexpr(vec![num(1)]), false),
            (qexpr(Vec::<Value>::new()), Value::unit(), false),
            // Different variants are never equal
            (num(0), sym("0"), false),
            (
                lambda(&["x"], vec![sym("x")]),
                lambda(&["x"], vec![sym("x")]),
                true,
            ),
            (
                lambda(&["x"], vec![sym("x")]),
                lambda(&["y"], vec![sym("y")]),
                false,
            ),
        ];

        for (i, (left, right, expected)) in cases.into_iter().enumerate() {
            assert_eq!(left == right, expected, "case #{}: {left:?} vs {right:?}", i + 1);
            assert_eq!(right == left, expected, "case #{} (symmetry)", i + 1);
        }
    }

    #[test]
    #[expect(clippy::unwrap_used)] // test code OK
    fn test_builtin_equality_is_identity() {
        let add = Value::Builtin(find_builtin_op("+").unwrap());
        let add_again = Value::Builtin(find_builtin_op("+").unwrap());
        let sub = Value::Builtin(find_builtin_op("-").unwrap());
        assert_eq!(add, add_again);
        assert_ne!(add, sub);

        // Aliases are the same registry entry
        let def = Value::Builtin(find_builtin_op("def").unwrap());
        let define = Value::Builtin(find_builtin_op("define").unwrap());
        assert_eq!(def, define);
    }

    #[test]
    fn test_lambda_equality_ignores_captured_frame() {
        let Value::Lambda(bound) = lambda(&["b"], vec![sym("a"), sym("b")]) else {
            unreachable!()
        };
        bound.env.borrow_mut().bind_local("a", num(1));
        let unbound = lambda(&["b"], vec![sym("a"), sym("b")]);
        assert_eq!(Value::Lambda(bound), unbound);
    }

    #[test]
    fn test_clone_is_deep() {
        let Value::Lambda(original) = lambda(&["b"], vec![sym("b")]) else {
            unreachable!()
        };
        original.env.borrow_mut().bind_local("a", num(1));

        let copy = original.clone();
        copy.env.borrow_mut().bind_local("a", num(99));
        copy.env.borrow_mut().bind_local("c", num(3));

        assert!(!Rc::ptr_eq(&original.env, &copy.env));
        assert_eq!(original.bound(), vec![("a".to_owned(), num(1))]);
        assert_eq!(copy.bound().len(), 2);
    }

    #[test]
    fn test_display() {
        let cases = vec![
            (num(42), "42"),
            (num(-7), "-7"),
            (Value::Error("Division by zero".into()), "Error: Division by zero"),
            (sym("head"), "head"),
            (Value::unit(), "()"),
            (qexpr(Vec::<Value>::new()), "{}"),
            (sexpr(vec![sym("+"), num(1), num(2)]), "(+ 1 2)"),
            (
                qexpr(vec![num(1), qexpr(vec![num(2), num(3)]), sexpr(vec![sym("x")])]),
                "{1 {2 3} (x)}",
            ),
            (
                lambda(&["x", "y"], vec![sym("+"), sym("x"), sym("y")]),
                "(\\ {x y} {+ x y})",
            ),
            (lambda(&[], vec![num(1)]), "(\\ {} {1})"),
        ];

        for (value, expected) in cases {
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    #[expect(clippy::unwrap_used)] // test code OK
    fn test_builtin_display_is_opaque() {
        let value = Value::Builtin(find_builtin_op("head").unwrap());
        assert_eq!(value.to_string(), "<builtin>");
        assert_eq!(value.type_name(), "Function");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(num(1).type_name(), "Number");
        assert_eq!(Value::Error(String::new()).type_name(), "Error");
        assert_eq!(sym("a").type_name(), "Symbol");
        assert_eq!(lambda(&[], vec![]).type_name(), "Function");
        assert_eq!(Value::unit().type_name(), "S-Expression");
        assert_eq!(qexpr(Vec::<Value>::new()).type_name(), "Q-Expression");
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Value::from(true), num(1));
        assert_eq!(Value::from(false), num(0));
        assert_eq!(Value::from(7u8), num(7));
        assert_eq!(Value::from(-3i32), num(-3));
        assert_eq!(
            Value::from(Error::DivisionByZero),
            Value::Error("Division by zero".into())
        );
    }
}
