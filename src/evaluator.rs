use std::collections::VecDeque;

use crate::builtinops::get_builtin_ops;
use crate::environment::{EnvRef, Environment, ParentScope};
use crate::value::{Lambda, REST_MARKER, Value};
use crate::{Error, MAX_EVAL_DEPTH};

/// Evaluate a value in `env` (public API).
///
/// Never fails in the Rust sense: every failure is returned as a [`Value::Error`].
pub fn eval(env: &EnvRef, value: Value) -> Value {
    eval_with_depth_tracking(env, value, 0)
}

/// Bytes of stack that must remain before another evaluation frame runs in place
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment allocated when the red zone is reached
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a fresh stack segment if the current one is nearly full.
#[inline]
fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// Evaluate a value with depth tracking to prevent runaway recursion.
///
/// `depth` counts the lambda applications in progress, so nesting inside one
/// expression is free and only recursion through lambdas approaches the limit.
pub(crate) fn eval_with_depth_tracking(env: &EnvRef, value: Value, depth: usize) -> Value {
    ensure_sufficient_stack(|| eval_value(env, value, depth))
}

fn eval_value(env: &EnvRef, value: Value, depth: usize) -> Value {
    if depth >= MAX_EVAL_DEPTH {
        tracing::debug!(depth, "evaluation depth limit reached");
        return Error::DepthExceeded.into();
    }
    match value {
        // Variable lookup hands out an independent copy of the bound value
        Value::Symbol(name) => env.borrow().lookup(&name),

        Value::Sexpr(cells) => eval_sexpr(env, cells, depth),

        // Self-evaluating forms
        Value::Number(_)
        | Value::Error(_)
        | Value::Builtin(_)
        | Value::Lambda(_)
        | Value::Qexpr(_) => value,
    }
}

/// Evaluate an S-expression: reduce every child left to right, then apply.
fn eval_sexpr(env: &EnvRef, cells: Vec<Value>, depth: usize) -> Value {
    let mut cells: Vec<Value> = cells
        .into_iter()
        .map(|cell| eval_with_depth_tracking(env, cell, depth))
        .collect();

    // The first Error in list order wins, the rest of the list is discarded
    if let Some(pos) = cells.iter().position(Value::is_error) {
        return cells.swap_remove(pos);
    }

    match cells.len() {
        0 => Value::Sexpr(cells),
        1 => cells.remove(0),
        _ => {
            let func = cells.remove(0);
            if !func.is_function() {
                return Error::NotCallable(func.type_name()).into();
            }
            apply(env, func, cells, depth)
        }
    }
}

/// Apply a function value to already evaluated arguments.
///
/// Builtins are invoked directly. Lambdas bind arguments into their own frame;
/// once every formal is bound the body is evaluated with the calling environment
/// layered beneath that frame, otherwise the partially bound lambda is returned.
pub(crate) fn apply(env: &EnvRef, func: Value, args: Vec<Value>, depth: usize) -> Value {
    match func {
        Value::Builtin(op) => {
            tracing::trace!(builtin = op.id, args = args.len(), "applying builtin");
            op.call(args, env, depth).unwrap_or_else(Value::from)
        }
        Value::Lambda(lambda) => apply_lambda(env, lambda, args, depth),
        other => Error::NotCallable(other.type_name()).into(),
    }
}

fn apply_lambda(env: &EnvRef, mut lambda: Lambda, args: Vec<Value>, depth: usize) -> Value {
    if let Err(err) = bind_arguments(&mut lambda, args) {
        return err.into();
    }

    if !lambda.formals.is_empty() {
        tracing::trace!(remaining = lambda.formals.len(), "partial application");
        return Value::Lambda(lambda);
    }

    tracing::trace!(bound = lambda.env.borrow().len(), "applying lambda");
    let body = std::mem::take(&mut lambda.body);
    let _scope = ParentScope::attach(&lambda.env, env);
    eval_with_depth_tracking(&lambda.env, Value::Sexpr(body), depth + 1)
}

fn invalid_rest_marker() -> Error {
    Error::InvalidFormals("Symbol '&' not followed by single symbol.".to_owned())
}

/// Consume formals and arguments left to right, binding each pair in the lambda's frame
fn bind_arguments(lambda: &mut Lambda, args: Vec<Value>) -> Result<(), Error> {
    let given = args.len();
    let expected = lambda.formals.len();
    let mut args = VecDeque::from(args);
    let mut formals = VecDeque::from(std::mem::take(&mut lambda.formals));
    let mut frame = lambda.env.borrow_mut();

    while let Some(arg) = args.pop_front() {
        let Some(formal) = formals.pop_front() else {
            return Err(Error::TooManyArguments { given, expected });
        };

        if formal == REST_MARKER {
            let rest = match (formals.pop_front(), formals.is_empty()) {
                (Some(rest), true) => rest,
                _ => return Err(invalid_rest_marker()),
            };
            let collected = std::iter::once(arg).chain(args.drain(..)).collect();
            frame.bind_local(&rest, Value::Qexpr(collected));
            break;
        }

        frame.bind_local(&formal, arg);
    }

    // A variadic lambda called without any rest arguments
    if formals.front().is_some_and(|formal| formal == REST_MARKER) {
        if formals.len() != 2 {
            return Err(invalid_rest_marker());
        }
        formals.pop_front();
        if let Some(rest) = formals.pop_front() {
            frame.bind_local(&rest, Value::Qexpr(Vec::new()));
        }
    }

    drop(frame);
    lambda.formals = formals.into();
    Ok(())
}

/// Create a global environment with every builtin operation bound under its name and aliases
pub fn create_global_env() -> EnvRef {
    let env = Environment::new_ref();
    {
        let mut global = env.borrow_mut();
        for op in get_builtin_ops() {
            for name in op.names() {
                global.bind_local(name, Value::Builtin(op));
            }
        }
    }
    env
}
