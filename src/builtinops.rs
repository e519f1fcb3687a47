//! Built-in operations registry.
//!
//! Every primitive of the language is described once by a [`BuiltinOp`] entry:
//! its name, any aliases, its [`Arity`] and the function implementing it. The
//! global environment is populated from this table at startup, so builtins are
//! ordinary first-class values that can be passed around and compared.
//!
//! ```text
//! (+ 1 2 3)            ; arithmetic: + - * / % ^
//! (head {1 2 3})       ; list operations: list head tail join eval
//! (def {x} 5)          ; variables: def (global), = (local)
//! (\ {a b} {+ a b})    ; lambda construction
//! (if (> x 1) {1} {0}) ; comparison and branching
//! ```
//!
//! ## Error handling
//!
//! All builtins receive their arguments already evaluated and return
//! `Result<Value, Error>`. Arity and argument types are validated before the
//! operation does anything, so a rejected call never leaves a partial binding
//! behind. Integer overflow is detected and reported rather than wrapping.
//!
//! ## Adding New Operations
//!
//! 1. **Implement the function** following the [`BuiltinFn`] signature
//! 2. **Add an entry to BUILTIN_OPS** with its name, aliases and arity
//! 3. **Add table tests** covering success and error cases

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use crate::Error;
use crate::environment::EnvRef;
use crate::evaluator::eval_with_depth_tracking;
use crate::value::{Lambda, NumberType, REST_MARKER, Value};

/// Canonical builtin signature: evaluated arguments, calling environment and the
/// current evaluation depth (for builtins that evaluate further).
pub type BuiltinFn = fn(Vec<Value>, &EnvRef, usize) -> Result<Value, Error>;

/// Number of arguments an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    /// Check an argument count for the operation named `function`
    pub fn validate(self, function: &str, got: usize) -> Result<(), Error> {
        let ok = match self {
            Arity::Exact(n) => got == n,
            Arity::AtLeast(n) => got >= n,
            Arity::Any => true,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::ArityError {
                function: function.to_owned(),
                expected: self,
                got,
            })
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
            Arity::Any => write!(f, "any number"),
        }
    }
}

/// Definition of a built-in operation
pub struct BuiltinOp {
    /// Name the operation is bound to in the global environment
    pub id: &'static str,
    /// Additional names bound to the same operation
    pub aliases: &'static [&'static str],
    /// Only reachable through [`BuiltinOp::call`], which checks the arity first
    pub(crate) func: BuiltinFn,
    pub arity: Arity,
}

impl fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("id", &self.id)
            .field("aliases", &self.aliases)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl BuiltinOp {
    /// Validate arity, then run the operation
    pub fn call(&self, args: Vec<Value>, env: &EnvRef, depth: usize) -> Result<Value, Error> {
        self.arity.validate(self.id, args.len())?;
        (self.func)(args, env, depth)
    }

    /// Every name this operation is reachable under
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        std::iter::once(self.id).chain(self.aliases.iter().copied())
    }
}

//
// Argument validation helpers
//

fn missing_argument(function: &str, args: &[Value], index: usize) -> Error {
    Error::ArityError {
        function: function.to_owned(),
        expected: Arity::AtLeast(index + 1),
        got: args.len(),
    }
}

fn expect_number(function: &str, args: &[Value], index: usize) -> Result<NumberType, Error> {
    match args.get(index) {
        Some(Value::Number(n)) => Ok(*n),
        Some(other) => Err(Error::type_error(function, index, other, Value::NUMBER)),
        None => Err(missing_argument(function, args, index)),
    }
}

fn expect_numbers(function: &str, args: &[Value]) -> Result<Vec<NumberType>, Error> {
    (0..args.len())
        .map(|index| expect_number(function, args, index))
        .collect()
}

fn expect_qexpr<'a>(function: &str, args: &'a [Value], index: usize) -> Result<&'a [Value], Error> {
    match args.get(index) {
        Some(Value::Qexpr(cells)) => Ok(cells),
        Some(other) => Err(Error::type_error(function, index, other, Value::QEXPR)),
        None => Err(missing_argument(function, args, index)),
    }
}

/// Take ownership of the cells of a Q-expression argument
fn into_qexpr(function: &str, value: Value, index: usize) -> Result<Vec<Value>, Error> {
    match value {
        Value::Qexpr(cells) => Ok(cells),
        other => Err(Error::type_error(function, index, &other, Value::QEXPR)),
    }
}

/// Take exactly `N` arguments by value
fn exact_args<const N: usize>(function: &str, args: Vec<Value>) -> Result<[Value; N], Error> {
    <[Value; N]>::try_from(args).map_err(|args| Error::ArityError {
        function: function.to_owned(),
        expected: Arity::Exact(N),
        got: args.len(),
    })
}

/// Take the single argument of a one-argument builtin as a Q-expression
fn single_qexpr(function: &str, args: Vec<Value>) -> Result<Vec<Value>, Error> {
    let [arg] = exact_args(function, args)?;
    into_qexpr(function, arg, 0)
}

/// Like [`single_qexpr`], rejecting `{}`
fn single_non_empty_qexpr(function: &str, args: Vec<Value>) -> Result<Vec<Value>, Error> {
    let cells = single_qexpr(function, args)?;
    if cells.is_empty() {
        return Err(Error::EmptyArgument {
            function: function.to_owned(),
            index: 0,
        });
    }
    Ok(cells)
}

fn symbol_names(function: &str, cells: &[Value]) -> Result<Vec<String>, Error> {
    cells
        .iter()
        .map(|cell| match cell {
            Value::Symbol(name) => Ok(name.clone()),
            other => Err(Error::NonSymbolBinding {
                function: function.to_owned(),
                got: other.type_name(),
            }),
        })
        .collect()
}

//
// Arithmetic
//

/// Fold the numeric arguments left to right with a checked operation
fn fold_numbers(
    function: &str,
    args: &[Value],
    step: impl Fn(NumberType, NumberType) -> Result<NumberType, Error>,
) -> Result<Value, Error> {
    let numbers = expect_numbers(function, args)?;
    let mut iter = numbers.into_iter();
    let Some(first) = iter.next() else {
        return Err(Error::ArityError {
            function: function.to_owned(),
            expected: Arity::AtLeast(1),
            got: 0,
        });
    };
    iter.try_fold(first, step).map(Value::Number)
}

fn builtin_add(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    fold_numbers("+", &args, |a, b| {
        a.checked_add(b).ok_or(Error::Overflow("addition"))
    })
}

fn builtin_sub(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    if args.len() == 1 {
        return expect_number("-", &args, 0)?
            .checked_neg()
            .map(Value::Number)
            .ok_or(Error::Overflow("negation"));
    }
    fold_numbers("-", &args, |a, b| {
        a.checked_sub(b).ok_or(Error::Overflow("subtraction"))
    })
}

fn builtin_mul(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    fold_numbers("*", &args, |a, b| {
        a.checked_mul(b).ok_or(Error::Overflow("multiplication"))
    })
}

fn builtin_div(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    fold_numbers("/", &args, |a, b| {
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        a.checked_div(b).ok_or(Error::Overflow("division"))
    })
}

fn builtin_rem(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    fold_numbers("%", &args, |a, b| {
        if b == 0 {
            return Err(Error::DivisionByZero);
        }
        a.checked_rem(b).ok_or(Error::Overflow("remainder"))
    })
}

fn builtin_pow(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    fold_numbers("^", &args, |base, exp| {
        if exp < 0 {
            return Err(Error::NegativeExponent(exp));
        }
        u32::try_from(exp)
            .ok()
            .and_then(|exp| base.checked_pow(exp))
            .ok_or(Error::Overflow("exponentiation"))
    })
}

//
// List operations
//

fn builtin_list(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    Ok(Value::Qexpr(args))
}

fn builtin_head(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let mut cells = single_non_empty_qexpr("head", args)?;
    cells.truncate(1);
    Ok(Value::Qexpr(cells))
}

fn builtin_tail(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let mut cells = single_non_empty_qexpr("tail", args)?;
    cells.remove(0);
    Ok(Value::Qexpr(cells))
}

fn builtin_join(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let lists = args
        .into_iter()
        .enumerate()
        .map(|(index, arg)| into_qexpr("join", arg, index))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Qexpr(lists.into_iter().flatten().collect()))
}

fn builtin_eval(args: Vec<Value>, env: &EnvRef, depth: usize) -> Result<Value, Error> {
    let cells = single_qexpr("eval", args)?;
    Ok(eval_with_depth_tracking(env, Value::Sexpr(cells), depth))
}

//
// Variables
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingScope {
    Global,
    Local,
}

/// Shared implementation of `def` and `=`: `{sym...}` followed by one value per symbol
fn bind_variables(
    function: &str,
    args: Vec<Value>,
    env: &EnvRef,
    scope: BindingScope,
) -> Result<Value, Error> {
    let names = symbol_names(function, expect_qexpr(function, &args, 0)?)?;
    let values = args.len().saturating_sub(1);
    if names.len() != values {
        return Err(Error::BindingCountMismatch {
            function: function.to_owned(),
            symbols: names.len(),
            values,
        });
    }

    let mut frame = env.borrow_mut();
    for (name, value) in names.iter().zip(args.into_iter().skip(1)) {
        tracing::debug!(%name, ?scope, "binding variable");
        match scope {
            BindingScope::Global => frame.bind_global(name, value),
            BindingScope::Local => frame.bind_local(name, value),
        }
    }
    Ok(Value::unit())
}

fn builtin_def(args: Vec<Value>, env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    bind_variables("def", args, env, BindingScope::Global)
}

fn builtin_put(args: Vec<Value>, env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    bind_variables("=", args, env, BindingScope::Local)
}

//
// Functions
//

/// Check that `&` appears at most once, immediately before the last formal
pub(crate) fn validate_formals(formals: &[String]) -> Result<(), Error> {
    match formals.iter().position(|f| f == REST_MARKER) {
        Some(pos) if pos + 2 != formals.len() => Err(Error::InvalidFormals(
            "Symbol '&' not followed by single symbol.".to_owned(),
        )),
        Some(_) if formals[formals.len() - 1] == REST_MARKER => Err(Error::InvalidFormals(
            "Symbol '&' not followed by single symbol.".to_owned(),
        )),
        _ => Ok(()),
    }
}

fn builtin_lambda(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let [formals, body] = exact_args("\\", args)?;
    let formals = symbol_names("\\", &into_qexpr("\\", formals, 0)?)?;
    let body = into_qexpr("\\", body, 1)?;
    validate_formals(&formals)?;

    Ok(Value::Lambda(Lambda::new(formals, body)))
}

//
// Comparison and branching
//

// Macro to generate ordering comparisons over exactly two numbers
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $op_str:expr) => {
        fn $name(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
            pair($op_str, &args)?;
            let a = expect_number($op_str, &args, 0)?;
            let b = expect_number($op_str, &args, 1)?;
            Ok(Value::from(a $op b))
        }
    };
}

numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_ge, >=, ">=");
numeric_comparison!(builtin_le, <=, "<=");

/// Borrow the two operands of a binary operation
fn pair<'a>(function: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), Error> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(Error::ArityError {
            function: function.to_owned(),
            expected: Arity::Exact(2),
            got: args.len(),
        }),
    }
}

fn builtin_eq(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let (a, b) = pair("==", &args)?;
    Ok(Value::from(a == b))
}

fn builtin_ne(args: Vec<Value>, _env: &EnvRef, _depth: usize) -> Result<Value, Error> {
    let (a, b) = pair("!=", &args)?;
    Ok(Value::from(a != b))
}

fn builtin_if(args: Vec<Value>, env: &EnvRef, depth: usize) -> Result<Value, Error> {
    let [condition, then_branch, else_branch] = exact_args("if", args)?;
    let condition = expect_number("if", std::slice::from_ref(&condition), 0)?;
    let then_branch = into_qexpr("if", then_branch, 1)?;
    let else_branch = into_qexpr("if", else_branch, 2)?;

    // The branch not taken is dropped without ever being evaluated
    let branch = if condition != 0 { then_branch } else { else_branch };
    Ok(eval_with_depth_tracking(env, Value::Sexpr(branch), depth))
}

/// Global registry of all built-in operations, in the order they are bound
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    vec![
        // List operations
        BuiltinOp {
            id: "list",
            aliases: &[],
            func: builtin_list,
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "head",
            aliases: &[],
            func: builtin_head,
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "tail",
            aliases: &[],
            func: builtin_tail,
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "eval",
            aliases: &[],
            func: builtin_eval,
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "join",
            aliases: &[],
            func: builtin_join,
            arity: Arity::AtLeast(1),
        },
        // Arithmetic operations
        BuiltinOp {
            id: "+",
            aliases: &[],
            func: builtin_add,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "-",
            aliases: &[],
            func: builtin_sub,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "*",
            aliases: &[],
            func: builtin_mul,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "/",
            aliases: &[],
            func: builtin_div,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "%",
            aliases: &[],
            func: builtin_rem,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "^",
            aliases: &[],
            func: builtin_pow,
            arity: Arity::AtLeast(1),
        },
        // Variables
        BuiltinOp {
            id: "def",
            aliases: &["define"],
            func: builtin_def,
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "=",
            aliases: &["set", "put"],
            func: builtin_put,
            arity: Arity::AtLeast(1),
        },
        // Functions
        BuiltinOp {
            id: "\\",
            aliases: &[],
            func: builtin_lambda,
            arity: Arity::Exact(2),
        },
        // Comparison and branching
        BuiltinOp {
            id: "if",
            aliases: &[],
            func: builtin_if,
            arity: Arity::Exact(3),
        },
        BuiltinOp {
            id: "==",
            aliases: &[],
            func: builtin_eq,
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "!=",
            aliases: &[],
            func: builtin_ne,
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: ">",
            aliases: &[],
            func: builtin_gt,
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "<",
            aliases: &[],
            func: builtin_lt,
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: ">=",
            aliases: &[],
            func: builtin_ge,
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "<=",
            aliases: &[],
            func: builtin_le,
            arity: Arity::Exact(2),
        },
    ]
});

/// Lazy static map from every name and alias to its BuiltinOp
static BUILTINS_BY_NAME: LazyLock<HashMap<&'static str, &'static BuiltinOp>> =
    LazyLock::new(|| {
        let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
        ops.iter()
            .flat_map(|op| op.names().map(move |name| (name, op)))
            .collect()
    });

/// Get all builtin operations (used to populate the global environment)
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by name or alias
pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTINS_BY_NAME.get(name).copied()
}

/// Invoke a builtin by name. Unknown names yield an Error value.
pub fn call_builtin(name: &str, args: Vec<Value>, env: &EnvRef) -> Value {
    match find_builtin_op(name) {
        Some(op) => op.call(args, env, 0).unwrap_or_else(Value::from),
        None => Error::UnknownBuiltin(name.to_owned()).into(),
    }
}
