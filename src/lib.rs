//! qlisp - a small Lisp-family expression language
//!
//! This crate implements the read-eval core of a dynamically typed Lisp with two
//! kinds of lists: evaluable S-expressions and inert Q-expressions.
//!
//! ```text
//! (+ 1 2 3)                        ; arithmetic
//! (head {1 2 3})                   ; Q-expressions are data: {1}
//! (eval {+ 1 2})                   ; ...until explicitly evaluated: 3
//! (def {add} (\ {a b} {+ a b}))    ; lambdas and global definitions
//! ((add 1) 2)                      ; partial application: 3
//! (\ {x & rest} {rest})            ; variadic formals
//! ```
//!
//! ## Errors are values
//!
//! Evaluation never fails in the Rust sense. Every failure (unbound symbols,
//! arity or type mismatches, division by zero, malformed lambdas) becomes a
//! [`Value::Error`] that short-circuits the enclosing expression and is returned
//! as the result. [`Error`] is the structured form of those failures; builtins
//! work with `Result<Value, Error>` and the evaluator turns `Err` into an Error
//! value at the application boundary.
//!
//! ## Modules
//!
//! - `value`: the tagged value type, deep copy, structural equality and rendering
//! - `environment`: chained symbol tables with local and global binding
//! - `builtinops`: the registry of primitive operations
//! - `evaluator`: evaluation and the function application protocol
//! - `syntax` / `reader`: the boundary with an external parser and the adapter
//!   turning its syntax tree into values
//! - `parser`: a `nom` based text front end producing syntax trees

use std::fmt;

/// Maximum nesting accepted by the parser front end
pub const MAX_PARSE_DEPTH: usize = 64;

/// Maximum number of nested lambda applications before evaluation is abandoned
/// with an Error value. The evaluator grows its stack on demand up to this depth.
pub const MAX_EVAL_DEPTH: usize = 4096;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad characters, unbalanced brackets)
    InvalidSyntax,
    /// Input ended before a group was closed
    Incomplete,
    /// Expression nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
    /// Extra input found after the last complete expression
    TrailingContent,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 40 chars)
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, context: Option<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
        }
    }

    /// Create a ParseError with context extracted from input at a given byte offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 40;

        let tail = input.get(error_offset..).unwrap_or_default();
        let mut context: String = tail.chars().take(MAX_CONTEXT).collect();
        if tail.chars().count() > MAX_CONTEXT {
            context.push_str("[...]");
        }
        let context = context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(context))
    }
}

/// Every failure the language can report.
///
/// The `Display` form is the message carried by [`Value::Error`].
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    ParseError(ParseError),
    UnboundSymbol(String),
    ArityError {
        function: String,
        expected: Arity,
        got: usize,
    },
    TypeError {
        function: String,
        index: usize,
        got: &'static str,
        expected: &'static str,
    },
    EmptyArgument {
        function: String,
        index: usize,
    },
    DivisionByZero,
    Overflow(&'static str),
    NegativeExponent(NumberType),
    NonSymbolBinding {
        function: String,
        got: &'static str,
    },
    BindingCountMismatch {
        function: String,
        symbols: usize,
        values: usize,
    },
    InvalidFormals(String),
    TooManyArguments {
        given: usize,
        expected: usize,
    },
    UnknownBuiltin(String),
    InvalidNumber(String),
    NotCallable(&'static str),
    DepthExceeded,
    UnreadableNode(String),
}

impl Error {
    pub(crate) fn type_error(
        function: &str,
        index: usize,
        got: &Value,
        expected: &'static str,
    ) -> Self {
        Error::TypeError {
            function: function.to_owned(),
            index,
            got: got.type_name(),
            expected,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ParseError(e) => {
                write!(f, "ParseError: {}", e.message)?;
                if let Some(context) = &e.context {
                    write!(f, " near '{context}'")?;
                }
                Ok(())
            }
            Error::UnboundSymbol(name) => write!(f, "Unbound symbol '{name}'"),
            Error::ArityError {
                function,
                expected,
                got,
            } => write!(
                f,
                "Function '{function}' passed incorrect number of arguments. Got {got}, Expected {expected}."
            ),
            Error::TypeError {
                function,
                index,
                got,
                expected,
            } => write!(
                f,
                "Function '{function}' passed incorrect type for argument {index}. Got {got}, Expected {expected}."
            ),
            Error::EmptyArgument { function, index } => {
                write!(f, "Function '{function}' passed {{}} for argument {index}.")
            }
            Error::DivisionByZero => write!(f, "Division by zero"),
            Error::Overflow(operation) => write!(f, "Integer overflow in {operation}"),
            Error::NegativeExponent(exp) => {
                write!(f, "Negative exponent {exp} in integer exponentiation")
            }
            Error::NonSymbolBinding { function, got } => write!(
                f,
                "Function '{function}' cannot define non-symbol. Got {got}, Expected Symbol."
            ),
            Error::BindingCountMismatch {
                function,
                symbols,
                values,
            } => write!(
                f,
                "Function '{function}' passed mismatched symbols and values. Got {values} values for {symbols} symbols."
            ),
            Error::InvalidFormals(msg) => write!(f, "Function format invalid. {msg}"),
            Error::TooManyArguments { given, expected } => write!(
                f,
                "Function passed too many arguments. Got {given}, Expected {expected}."
            ),
            Error::UnknownBuiltin(name) => write!(f, "Unknown function '{name}'"),
            Error::InvalidNumber(text) => write!(f, "Invalid number '{text}'"),
            Error::NotCallable(got) => write!(
                f,
                "S-Expression starts with incorrect type. Got {got}, Expected Function."
            ),
            Error::DepthExceeded => write!(
                f,
                "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
            ),
            Error::UnreadableNode(tag) => write!(f, "Cannot read syntax node '{tag}'"),
        }
    }
}

impl std::error::Error for Error {}

pub mod builtinops;
pub mod environment;
pub mod evaluator;
pub mod reader;
pub mod syntax;
pub mod value;

#[cfg(feature = "parser")]
pub mod parser;

pub use builtinops::Arity;
pub use environment::{EnvRef, Environment};
pub use evaluator::{create_global_env, eval};
pub use reader::read;
pub use value::{Lambda, NumberType, Value};
