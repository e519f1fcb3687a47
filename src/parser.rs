//! Text front end producing [`SyntaxNode`] trees.
//!
//! ```text
//! number  : -?[0-9]+
//! symbol  : [a-zA-Z0-9_+\-*/\\=<>!&%^]+
//! sexpr   : '(' expr* ')'
//! qexpr   : '{' expr* '}'
//! expr    : number | symbol | sexpr | qexpr
//! program : ^ expr* $
//! ```
//!
//! The whole input is one `program` node, so a line such as `+ 1 2` reads as the
//! evaluable list `(+ 1 2)`. A token of symbol characters is a number exactly when
//! it matches `-?[0-9]+`.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{cut, value},
    error::ErrorKind,
    multi::many0,
    sequence::{preceded, terminated},
};

use crate::syntax::SyntaxNode;
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters allowed in symbols besides ASCII letters and digits
const SYMBOL_SPECIAL_CHARS: &str = "_+-*/\\=<>!&%^";

/// Options for the text front end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseConfig {
    /// Treat `;` as the start of a comment running to end of line
    pub handle_comments: bool,
}

impl Default for ParseConfig {
    fn default() -> Self {
        ParseConfig {
            handle_comments: true,
        }
    }
}

fn is_symbol_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

fn is_number_token(token: &str) -> bool {
    let digits = token.strip_prefix('-').unwrap_or(token);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Skip whitespace, and comments when enabled
fn trivia(input: &str, config: ParseConfig) -> IResult<&str, ()> {
    if config.handle_comments {
        let comment = preceded(char(';'), take_while(|c: char| c != '\n'));
        value((), many0(alt((multispace1, comment)))).parse(input)
    } else {
        value((), multispace0).parse(input)
    }
}

/// Parse a number or symbol token
fn parse_atom(input: &str) -> IResult<&str, SyntaxNode> {
    let (input, token) = take_while1(is_symbol_char).parse(input)?;
    let node = if is_number_token(token) {
        SyntaxNode::number(token)
    } else {
        SyntaxNode::symbol(token)
    };
    Ok((input, node))
}

/// Parse a bracketed group; `depth` counts the groups already open around it
fn parse_group(
    input: &str,
    (open, close): (char, char),
    build: fn(Vec<SyntaxNode>) -> SyntaxNode,
    depth: usize,
    config: ParseConfig,
) -> IResult<&str, SyntaxNode> {
    let (input, _) = char(open).parse(input)?;
    if depth >= MAX_PARSE_DEPTH {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            ErrorKind::TooLarge,
        )));
    }
    let (input, children) = parse_exprs(input, depth + 1, config)?;
    let (input, _) = trivia(input, config)?;
    // Once a group is open, a missing close bracket is not recoverable
    let (input, _) = cut(char(close)).parse(input)?;
    Ok((input, build(children)))
}

fn parse_expr(input: &str, depth: usize, config: ParseConfig) -> IResult<&str, SyntaxNode> {
    alt((
        parse_atom,
        |input| parse_group(input, ('(', ')'), SyntaxNode::sexpr, depth, config),
        |input| parse_group(input, ('{', '}'), SyntaxNode::qexpr, depth, config),
    ))
    .parse(input)
}

fn parse_exprs(input: &str, depth: usize, config: ParseConfig) -> IResult<&str, Vec<SyntaxNode>> {
    many0(preceded(
        |input| trivia(input, config),
        |input| parse_expr(input, depth, config),
    ))
    .parse(input)
}

/// Convert nom parsing errors to structured parse errors
fn to_parse_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> ParseError {
    match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            match e.code {
                ErrorKind::TooLarge => ParseError::with_context(
                    ParseErrorKind::TooDeeplyNested,
                    format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
                    input,
                    position,
                ),
                _ if e.input.is_empty() => ParseError::new(
                    ParseErrorKind::Incomplete,
                    "Unexpected end of input, unclosed bracket",
                    None,
                ),
                ErrorKind::Char => ParseError::with_context(
                    ParseErrorKind::InvalidSyntax,
                    format!("Expected closing bracket at position {position}"),
                    input,
                    position,
                ),
                _ => ParseError::with_context(
                    ParseErrorKind::InvalidSyntax,
                    format!("Invalid syntax at position {position}"),
                    input,
                    position,
                ),
            }
        }
        nom::Err::Incomplete(_) => {
            ParseError::new(ParseErrorKind::Incomplete, "Incomplete input", None)
        }
    }
}

/// Parse a complete program with the default configuration.
pub fn parse_program(input: &str) -> Result<SyntaxNode, Error> {
    parse_program_with_config(input, ParseConfig::default())
}

/// Parse a complete program: every expression of the input under one `program` node.
pub fn parse_program_with_config(input: &str, config: ParseConfig) -> Result<SyntaxNode, Error> {
    let result = terminated(
        |input| parse_exprs(input, 0, config),
        |input| trivia(input, config),
    )
    .parse(input);

    match result {
        Ok(("", children)) => Ok(SyntaxNode::program(children)),
        Ok((remaining, _)) => {
            let position = input.len() - remaining.len();
            Err(Error::ParseError(ParseError::with_context(
                ParseErrorKind::TrailingContent,
                format!("Unexpected input at position {position}"),
                input,
                position,
            )))
        }
        Err(e) => Err(Error::ParseError(to_parse_error(input, e))),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::reader::read;
    use crate::syntax::NodeKind;
    use crate::value::{Value, num, qexpr, sexpr, sym};
    use pretty_assertions::assert_eq;

    /// Parse and read, so expectations can be written as values
    fn parse_value(input: &str) -> Result<Value, Error> {
        parse_program(input).map(|tree| read(&tree))
    }

    #[test]
    fn test_parse_comprehensive() {
        let empty = || Vec::<Value>::new();
        let cases: Vec<(&str, Value)> = vec![
            ("", sexpr(empty())),
            ("   ", sexpr(empty())),
            ("42", sexpr(vec![num(42)])),
            ("-5", sexpr(vec![num(-5)])),
            ("007", sexpr(vec![num(7)])),
            ("-", sexpr(vec![sym("-")])),
            ("--5", sexpr(vec![sym("--5")])),
            ("12abc", sexpr(vec![sym("12abc")])),
            ("a-b", sexpr(vec![sym("a-b")])),
            ("+ 1 2", sexpr(vec![sym("+"), num(1), num(2)])),
            ("(+ 1 2)", sexpr(vec![sexpr(vec![sym("+"), num(1), num(2)])])),
            (
                "  ( +  1\t(* 2 3) )  ",
                sexpr(vec![sexpr(vec![
                    sym("+"),
                    num(1),
                    sexpr(vec![sym("*"), num(2), num(3)]),
                ])]),
            ),
            ("{}", sexpr(vec![qexpr(empty())])),
            ("()", sexpr(vec![sexpr(empty())])),
            (
                "{1 2 {3}}",
                sexpr(vec![qexpr(vec![num(1), num(2), qexpr(vec![num(3)])])]),
            ),
            (
                "\\ {x & xs} {xs}",
                sexpr(vec![
                    sym("\\"),
                    qexpr(vec![sym("x"), sym("&"), sym("xs")]),
                    qexpr(vec![sym("xs")]),
                ]),
            ),
            (
                "== != <= >= % ^ _a !x",
                sexpr(vec![
                    sym("=="),
                    sym("!="),
                    sym("<="),
                    sym(">="),
                    sym("%"),
                    sym("^"),
                    sym("_a"),
                    sym("!x"),
                ]),
            ),
            // Brackets end tokens without whitespace
            ("(a)(b)", sexpr(vec![sexpr(vec![sym("a")]), sexpr(vec![sym("b")])])),
            ("{a}b", sexpr(vec![qexpr(vec![sym("a")]), sym("b")])),
            // Comments
            ("def {x} 1 ; trailing comment", sexpr(vec![sym("def"), qexpr(vec![sym("x")]), num(1)])),
            ("; only a comment", sexpr(empty())),
            ("(+ 1 ; inside\n 2)", sexpr(vec![sexpr(vec![sym("+"), num(1), num(2)])])),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_value(input).unwrap(), expected, "input: {input:?}");
        }
    }

    #[test]
    fn test_parse_errors() {
        let cases = vec![
            ("(+ 1 2", ParseErrorKind::Incomplete),
            ("{1 {2}", ParseErrorKind::Incomplete),
            ("(", ParseErrorKind::Incomplete),
            ("(1 #)", ParseErrorKind::InvalidSyntax),
            ("(1 2}", ParseErrorKind::InvalidSyntax),
            ("(+ 1 2))", ParseErrorKind::TrailingContent),
            ("}", ParseErrorKind::TrailingContent),
            ("1 . 2", ParseErrorKind::TrailingContent),
            ("\"text\"", ParseErrorKind::TrailingContent),
        ];

        for (input, expected_kind) in cases {
            match parse_program(input) {
                Err(Error::ParseError(e)) => {
                    assert_eq!(e.kind, expected_kind, "input: {input:?}, error: {e:?}");
                }
                other => panic!("input {input:?}: expected parse error, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_comments_can_be_disabled() {
        let config = ParseConfig {
            handle_comments: false,
        };
        assert!(parse_program_with_config("1 ; two", config).is_err());
        assert!(parse_program_with_config("1 2", config).is_ok());
    }

    #[test]
    fn test_depth_limit() {
        let nested = |depth: usize| format!("{}{}", "(".repeat(depth), ")".repeat(depth));

        assert!(parse_program(&nested(MAX_PARSE_DEPTH)).is_ok());

        match parse_program(&nested(MAX_PARSE_DEPTH + 1)) {
            Err(Error::ParseError(e)) => {
                assert_eq!(e.kind, ParseErrorKind::TooDeeplyNested);
                assert!(e.message.contains("too deeply nested"));
            }
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn test_tree_keeps_punctuation_and_anchors() {
        let tree = parse_program("(a {1})").unwrap();
        assert_eq!(
            tree,
            SyntaxNode::program(vec![SyntaxNode::sexpr(vec![
                SyntaxNode::symbol("a"),
                SyntaxNode::qexpr(vec![SyntaxNode::number("1")]),
            ])])
        );

        let kinds: Vec<NodeKind> = tree.children.iter().map(|child| child.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Anchor, NodeKind::Sexpr, NodeKind::Anchor]);

        let group = &tree.children[1];
        assert_eq!(group.children[0].contents, "(");
        assert_eq!(group.children[3].contents, ")");
    }

    #[test]
    fn test_error_context() {
        let Err(Error::ParseError(e)) = parse_program("(+ 1 2))") else {
            panic!("expected parse error");
        };
        assert_eq!(e.context.as_deref(), Some(")"));
        assert!(
            Error::ParseError(e)
                .to_string()
                .starts_with("ParseError: Unexpected input at position 7")
        );
    }
}
