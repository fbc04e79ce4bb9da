// ABOUTME: CLI entry point selecting between file mode and the REPL

mod ast;
mod config;
mod env;
mod error;
mod eval;
mod highlighter;
mod lexer;
mod parser;
mod report;
mod resolver;
mod token;
mod value;

use clap::Parser;
use eval::Interpreter;
use highlighter::LoxHelper;
use lexer::Lexer;
use log::debug;
use report::Reporter;
use resolver::Resolver;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, Editor};
use std::path::{Path, PathBuf};
use std::process;

/// Lox interpreter
#[derive(Parser, Debug)]
#[command(name = "lox")]
#[command(version = config::VERSION)]
#[command(about = "A tree-walking Lox interpreter")]
#[command(long_about = "A tree-walking interpreter for the Lox scripting language")]
struct CliArgs {
    /// Script file to execute (optional - if not provided, starts REPL)
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Log the pipeline stages at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    let level = if args.verbose {
        log::Level::Debug
    } else {
        log::Level::Warn
    };
    simple_logger::init_with_level(level)?;

    match args.script {
        Some(path) => run_file(&path),
        None => run_repl(),
    }
}

/// Script mode: run the file, then exit with the documented codes.
fn run_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read script file {}: {}", path.display(), e))?;

    let reporter = Reporter::new();
    let mut interpreter = Interpreter::new();
    run(&source, &mut interpreter, &reporter);

    if reporter.had_error() {
        process::exit(config::EXIT_STATIC_ERROR);
    }
    if reporter.had_runtime_error() {
        process::exit(config::EXIT_RUNTIME_ERROR);
    }
    Ok(())
}

/// Interactive mode: one persistent interpreter, one input per turn.
fn run_repl() -> Result<(), Box<dyn std::error::Error>> {
    let rl_config = Config::builder().auto_add_history(true).build();
    let mut rl: Editor<LoxHelper, FileHistory> = Editor::with_config(rl_config)?;
    rl.set_helper(Some(LoxHelper::new()));

    // History from previous sessions, if any
    let _ = rl.load_history(config::HISTORY_FILE);

    println!("{}", config::WELCOME_MESSAGE);
    println!("{}", config::WELCOME_SUBTITLE);
    println!("{}", config::WELCOME_FOOTER);

    let reporter = Reporter::new();
    let mut interpreter = Interpreter::new();

    loop {
        match rl.readline(config::PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    break;
                }

                // Errors print but never end the session
                reporter.reset();
                run(&line, &mut interpreter, &reporter);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                break;
            }
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(config::HISTORY_FILE);

    Ok(())
}

/// The pipeline: lex, parse, resolve, evaluate. Any static error reported
/// along the way suppresses evaluation.
fn run(source: &str, interpreter: &mut Interpreter, reporter: &Reporter) {
    let tokens = Lexer::new(source, reporter).scan_tokens();
    debug!("lexed {} tokens", tokens.len());

    let statements = parser::Parser::new(tokens, reporter).parse();
    if reporter.had_error() {
        return;
    }
    debug!("parsed {} statements", statements.len());

    let locals = Resolver::new(reporter).resolve(&statements);
    if reporter.had_error() {
        return;
    }
    debug!("resolved {} local references", locals.len());

    interpreter.resolve(locals);
    if let Err(error) = interpreter.interpret(&statements) {
        reporter.runtime_error(&error);
    }
}
