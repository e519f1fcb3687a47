use qlisp::parser::parse_program;
use qlisp::{EnvRef, Value, create_global_env, eval, read};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

fn run_repl() {
    println!("qlisp version {}", env!("CARGO_PKG_VERSION"));
    println!("Enter expressions like: + 1 2   or   (head {{1 2 3}})");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize REPL: {err}");
            return;
        }
    };
    let env = create_global_env();

    loop {
        match rl.readline("qlisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Add the line to history
                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                // Each line is one program: parse, read, evaluate, print
                match parse_program(line) {
                    Ok(tree) => println!("{}", eval(&env, read(&tree))),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() {
    println!("qlisp commands:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Values:");
    println!("  Numbers: 42, -5");
    println!("  S-expressions are evaluated: (+ 1 2)");
    println!("  Q-expressions are data: {{1 2 3}}");
    println!();
    println!("Builtins:");
    println!("  Arithmetic: + - * / % ^");
    println!("  Lists: list head tail join eval");
    println!("  Comparison: == != > < >= <=");
    println!("  Conditionals: if");
    println!("  Variables: def (global), = (local)");
    println!("  Functions: \\ {{formals}} {{body}}, with & for the rest of the arguments");
    println!();
    println!("Examples:");
    println!("  def {{add}} (\\ {{a b}} {{+ a b}})");
    println!("  (add 1) 2");
    println!("  eval (join {{+}} {{1 2 3}})");
    println!("  if (> 2 1) {{1}} {{0}}");
    println!();
}

fn print_environment(env: &EnvRef) {
    let env = env.borrow();

    if env.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", env.len());
    println!();

    // Separate built-in functions from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in env.bindings() {
        match value {
            Value::Builtin(_) => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    // Print built-in functions
    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        for row in builtins.chunks(4) {
            for name in row {
                print!("  {name:<15}");
            }
            println!();
        }
        println!();
    }

    // Print user-defined values
    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
