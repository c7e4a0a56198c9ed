// ABOUTME: CLI driver running scripts or an interactive REPL

use clap::Parser;
use lyre_lisp::config::{HISTORY_FILE, VERSION, WELCOME_FOOTER, WELCOME_MESSAGE};
use lyre_lisp::interp::Interpreter;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use std::process::ExitCode;

/// A small homoiconic Lisp with eval-time macros and a C FFI bridge
#[derive(Parser, Debug)]
#[command(name = "lyre")]
#[command(version = VERSION)]
#[command(about = "A small homoiconic Lisp interpreter")]
struct CliArgs {
    /// Script files, evaluated in order in one shared environment
    #[arg(value_name = "FILE")]
    scripts: Vec<PathBuf>,

    /// Evaluate a single expression and print its result
    #[arg(short = 'e', long = "eval", value_name = "EXPR")]
    expr: Option<String>,

    /// Skip loading the standard library
    #[arg(long = "no-stdlib")]
    no_stdlib: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = CliArgs::parse();

    let interp = if args.no_stdlib {
        Interpreter::without_stdlib()
    } else {
        match Interpreter::new() {
            Ok(interp) => interp,
            Err(e) => {
                eprintln!("lyre: failed to load stdlib: {}", e);
                return ExitCode::FAILURE;
            }
        }
    };

    if let Some(expr) = &args.expr {
        return match interp.eval_source(expr) {
            Ok(result) => {
                println!("{}", result);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("lyre: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    if !args.scripts.is_empty() {
        for path in &args.scripts {
            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) => {
                    eprintln!("lyre: cannot read {}: {}", path.display(), e);
                    return ExitCode::FAILURE;
                }
            };
            if let Err(e) = interp.eval_source(&source) {
                eprintln!("lyre: {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    repl(&interp)
}

/// Interactive loop: print each result, report errors, resume
fn repl(interp: &Interpreter) -> ExitCode {
    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match DefaultEditor::with_config(config) {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("lyre: failed to initialize REPL: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let _ = rl.load_history(HISTORY_FILE);

    println!("{} v{}", WELCOME_MESSAGE, VERSION);
    println!("{}", WELCOME_FOOTER);

    loop {
        match rl.readline("lyre> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                match interp.eval_source(&line) {
                    Ok(result) => println!("=> {}", result),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    ExitCode::SUCCESS
}
