use crate::Error;
use crate::syntax::{NodeKind, SyntaxTree};
use crate::value::{NumberType, Value};

/// Convert a parsed syntax tree into a value tree.
///
/// Bracket and anchor nodes are skipped. A number literal that does not fit
/// [`NumberType`] reads as an Error value, which evaluation then propagates like
/// any other error.
pub fn read<N: SyntaxTree>(node: &N) -> Value {
    match node.kind() {
        NodeKind::Number => read_number(node.contents()),
        NodeKind::Symbol => Value::Symbol(node.contents().to_owned()),
        NodeKind::Sexpr | NodeKind::Program => Value::Sexpr(read_children(node)),
        NodeKind::Qexpr => Value::Qexpr(read_children(node)),
        NodeKind::Punct | NodeKind::Anchor => {
            Error::UnreadableNode(node.contents().to_owned()).into()
        }
    }
}

fn read_number(digits: &str) -> Value {
    match digits.parse::<NumberType>() {
        Ok(n) => Value::Number(n),
        Err(_) => Error::InvalidNumber(digits.to_owned()).into(),
    }
}

fn read_children<N: SyntaxTree>(node: &N) -> Vec<Value> {
    node.children()
        .iter()
        .filter(|child| !matches!(child.kind(), NodeKind::Punct | NodeKind::Anchor))
        .map(read)
        .collect()
}
