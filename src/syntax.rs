//! The boundary with the text front end.
//!
//! A parser hands the core a tree of tagged nodes; the [`crate::reader`] turns that
//! tree into [`crate::Value`]s. Any parser can be plugged in by implementing
//! [`SyntaxTree`] for its node type. [`SyntaxNode`] is the owned implementation
//! produced by the bundled `parser` module and used in tests.

/// Grammar rule a node was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Integer literal, `-?[0-9]+`
    Number,
    /// Identifier made of symbol characters
    Symbol,
    /// `( ... )`
    Sexpr,
    /// `{ ... }`
    Qexpr,
    /// The whole input, read as an evaluable list
    Program,
    /// Bracket tokens, kept in the tree but never read
    Punct,
    /// Start and end of input markers
    Anchor,
}

/// A read-only view of one node of a parsed syntax tree
pub trait SyntaxTree: Sized {
    fn kind(&self) -> NodeKind;

    /// Source text of a leaf node (digits, symbol name, bracket or anchor)
    fn contents(&self) -> &str;

    fn children(&self) -> &[Self];
}

/// Owned syntax tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub contents: String,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn leaf(kind: NodeKind, contents: impl Into<String>) -> Self {
        SyntaxNode {
            kind,
            contents: contents.into(),
            children: Vec::new(),
        }
    }

    pub fn branch(kind: NodeKind, children: Vec<SyntaxNode>) -> Self {
        SyntaxNode {
            kind,
            contents: String::new(),
            children,
        }
    }

    pub fn number(digits: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Number, digits)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Self::leaf(NodeKind::Symbol, name)
    }

    pub fn punct(token: char) -> Self {
        Self::leaf(NodeKind::Punct, token)
    }

    /// `( children )` including its bracket tokens
    pub fn sexpr(children: Vec<SyntaxNode>) -> Self {
        Self::branch(NodeKind::Sexpr, Self::bracketed('(', children, ')'))
    }

    /// `{ children }` including its bracket tokens
    pub fn qexpr(children: Vec<SyntaxNode>) -> Self {
        Self::branch(NodeKind::Qexpr, Self::bracketed('{', children, '}'))
    }

    /// Whole-input node framed by its start and end anchors
    pub fn program(children: Vec<SyntaxNode>) -> Self {
        let mut framed = Vec::with_capacity(children.len() + 2);
        framed.push(Self::leaf(NodeKind::Anchor, "^"));
        framed.extend(children);
        framed.push(Self::leaf(NodeKind::Anchor, "$"));
        Self::branch(NodeKind::Program, framed)
    }

    fn bracketed(open: char, children: Vec<SyntaxNode>, close: char) -> Vec<SyntaxNode> {
        let mut framed = Vec::with_capacity(children.len() + 2);
        framed.push(Self::punct(open));
        framed.extend(children);
        framed.push(Self::punct(close));
        framed
    }
}

impl SyntaxTree for SyntaxNode {
    fn kind(&self) -> NodeKind {
        self.kind
    }

    fn contents(&self) -> &str {
        &self.contents
    }

    fn children(&self) -> &[Self] {
        &self.children
    }
}
