#![cfg(feature = "parser")]
#![expect(clippy::unwrap_used)] // test code OK

use pretty_assertions::assert_eq;
use qlisp::parser::parse_program;
use qlisp::value::{num, qexpr, sym};
use qlisp::{EnvRef, Value, create_global_env, eval, read};

/// Run each line in order against one global environment, returning the rendered results
fn session(lines: &[&str]) -> Vec<String> {
    let env = create_global_env();
    lines.iter().map(|line| run(&env, line).to_string()).collect()
}

fn run(env: &EnvRef, line: &str) -> Value {
    eval(env, read(&parse_program(line).unwrap()))
}

#[test]
fn arithmetic_session() {
    assert_eq!(
        session(&[
            "+ 1 2",
            "(- 10)",
            "* 2 (+ 3 4)",
            "/ 7 2",
            "% 7 2",
            "^ 3 4",
            "/ 1 0",
        ]),
        vec!["3", "-10", "14", "3", "1", "81", "Error: Division by zero"]
    );
}

#[test]
fn list_session() {
    assert_eq!(
        session(&[
            "list 1 2 3",
            "head {1 2 3}",
            "tail {1 2 3}",
            "join {1 2} {3} {}",
            "eval (list + 1 2 3)",
            "head {}",
            "{head (list 1 2)}",
        ]),
        vec![
            "{1 2 3}",
            "{1}",
            "{2 3}",
            "{1 2 3}",
            "6",
            "Error: Function 'head' passed {} for argument 0.",
            "{head (list 1 2)}",
        ]
    );
}

#[test]
fn functions_session() {
    assert_eq!(
        session(&[
            "def {add3} (\\ {a b c} {+ a b c})",
            "add3",
            "add3 1",
            "(add3 1) 2 3",
            "def {first-and-rest} (\\ {x & xs} {list x xs})",
            "first-and-rest 1 2 3",
            "first-and-rest 1",
            "def {pair} (\\ {a b} {list a b})",
            "pair 1 2 3",
            "head",
        ]),
        vec![
            "()",
            "(\\ {a b c} {+ a b c})",
            "(\\ {b c} {+ a b c})",
            "6",
            "()",
            "{1 {2 3}}",
            "{1 {}}",
            "()",
            "Error: Function passed too many arguments. Got 3, Expected 2.",
            "<builtin>",
        ]
    );
}

#[test]
fn definitions_inside_functions() {
    let env = create_global_env();
    run(&env, "def {x} 5");
    run(&env, "def {show-x} (\\ {_} {x})");
    assert_eq!(run(&env, "show-x 0"), num(5));

    // Redefinition updates the one global binding
    let count = env.borrow().len();
    run(&env, "def {x} 6");
    assert_eq!(env.borrow().len(), count);
    assert_eq!(run(&env, "show-x 0"), num(6));

    // def escapes the function frame, = does not
    run(&env, "def {globalize} (\\ {v} {def {seen} v})");
    run(&env, "def {localize} (\\ {v} {= {hidden} v})");
    run(&env, "globalize 1");
    run(&env, "localize 2");
    assert_eq!(run(&env, "seen"), num(1));
    assert_eq!(
        run(&env, "hidden"),
        Value::Error("Unbound symbol 'hidden'".into())
    );
}

#[test]
fn bound_values_are_copies() {
    let env = create_global_env();
    run(&env, "def {xs} {1 2 3}");
    run(&env, "def {f} (\\ {a b} {list a b})");
    run(&env, "def {g} (f xs)");

    // Rebinding xs does not reach into the argument captured by g
    run(&env, "def {xs} {}");
    assert_eq!(
        run(&env, "g 4"),
        qexpr(vec![qexpr(vec![num(1), num(2), num(3)]), num(4)])
    );

    // Applying g twice starts from the same stored partial application
    assert_eq!(run(&env, "g 5"), qexpr(vec![qexpr(vec![num(1), num(2), num(3)]), num(5)]));
}

#[test]
fn conditionals_are_lazy() {
    let env = create_global_env();
    assert_eq!(run(&env, "if (== 1 1) {+ 1 1} {def {boom} 1}"), num(2));
    assert!(run(&env, "boom").is_error());
    assert_eq!(run(&env, "if 0 {def {boom} 1} {head {a b}}"), qexpr(vec![sym("a")]));
    assert!(run(&env, "boom").is_error());
}

#[test]
fn errors_propagate_as_values() {
    let env = create_global_env();
    let result = run(&env, "+ 1 (head (tail {1}))");
    assert_eq!(
        result,
        Value::Error("Function 'head' passed {} for argument 0.".into())
    );

    // An error argument stops the definition before it happens
    assert_eq!(run(&env, "def {oops} (/ 1 0)"), Value::Error("Division by zero".into()));
    assert_eq!(run(&env, "oops"), Value::Error("Unbound symbol 'oops'".into()));
    assert_eq!(run(&env, "== (/ 1 0) (% 1 0)"), Value::Error("Division by zero".into()));

    assert_eq!(
        run(&env, "1 2"),
        Value::Error("S-Expression starts with incorrect type. Got Number, Expected Function.".into())
    );
}

#[test]
fn parse_errors_are_reported_before_evaluation() {
    let err = parse_program("(+ 1 2").unwrap_err();
    assert!(err.to_string().starts_with("ParseError:"));
}
