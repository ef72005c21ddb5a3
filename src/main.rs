// ABOUTME: CLI entry point — file runner and REPL front ends for the Lox interpreter

mod ast;
mod config;
mod env;
mod error;
mod highlighter;
mod interpreter;
mod lexer;
mod parser;
mod printer;
mod resolver;
mod stdlib;
mod token;
mod value;

use ast::Stmt;
use clap::Parser as ClapParser;
use config::{VERSION, WELCOME_MESSAGE, WELCOME_SUBTITLE};
use error::Diagnostics;
use highlighter::LoxHelper;
use interpreter::Interpreter;
use resolver::ResolutionTable;
use rustyline::error::ReadlineError;
use rustyline::{Config, Editor};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_USAGE: u8 = 64;
const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

/// A tree-walking interpreter for the Lox language.
///
/// With no arguments, starts a line-oriented REPL. With one argument, runs
/// that file and exits. The CLI accepts more than one positional argument
/// only so it can report spec.md's exact usage error instead of clap's.
#[derive(ClapParser, Debug)]
#[command(name = "lox", version = VERSION, about = "A tree-walking interpreter for the Lox language")]
struct CliArgs {
    /// Source file to run. Omit to start the REPL.
    #[arg(value_name = "source")]
    args: Vec<PathBuf>,

    /// Print the parsed AST instead of running it (diagnostic only).
    #[arg(long = "print-ast")]
    print_ast: bool,
}

fn main() -> ExitCode {
    let cli = CliArgs::parse();
    match cli.args.as_slice() {
        [] => run_repl(),
        [path] if cli.print_ast => print_ast(path),
        [path] => run_file(path),
        _ => {
            eprintln!("Syntax: lox [source]");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

/// `--print-ast` debug path: parse only, then render with `printer::print_program`
/// instead of resolving and running. Exits 65 on a parse error like a normal run.
fn print_ast(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read file {}: {}", path.display(), err);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let mut diagnostics = Diagnostics::named(path.display().to_string());
    let tokens = lexer::scan(&source, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);
    if diagnostics.had_error() {
        print_diagnostics(&mut diagnostics);
        return ExitCode::from(EXIT_COMPILE_ERROR);
    }

    println!("{}", printer::print_program(&statements));
    ExitCode::SUCCESS
}

fn print_diagnostics(diagnostics: &mut Diagnostics) {
    for line in diagnostics.take_report() {
        eprintln!("{}", line);
    }
}

/// Lexes, parses, resolves and interprets an entire file as one program
/// unit, following spec.md §7's rule that the resolver and evaluator only
/// run when lex/parse produced no error.
fn run_file(path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Cannot read file {}: {}", path.display(), err);
            return ExitCode::from(EXIT_USAGE);
        }
    };

    let mut diagnostics = Diagnostics::named(path.display().to_string());

    let tokens = lexer::scan(&source, &mut diagnostics);
    let statements = parser::parse(tokens, &mut diagnostics);
    if diagnostics.had_error() {
        print_diagnostics(&mut diagnostics);
        return ExitCode::from(EXIT_COMPILE_ERROR);
    }

    let resolutions = resolver::resolve(&statements, &mut diagnostics);
    if diagnostics.had_error() {
        print_diagnostics(&mut diagnostics);
        return ExitCode::from(EXIT_COMPILE_ERROR);
    }

    let mut interpreter = Interpreter::new(resolutions);
    match interpreter.interpret(&statements) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            diagnostics.report_runtime(&err);
            print_diagnostics(&mut diagnostics);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

fn run_repl() -> ExitCode {
    println!("{}", WELCOME_MESSAGE);
    println!("{}", WELCOME_SUBTITLE);

    let config = Config::builder().auto_add_history(true).build();
    let mut rl = match Editor::with_config(config) {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Failed to initialize REPL: {}", err);
            return ExitCode::from(EXIT_USAGE);
        }
    };
    rl.set_helper(Some(LoxHelper::new()));

    let history_file = ".lox_history";
    let _ = rl.load_history(history_file);

    let mut diagnostics = Diagnostics::named("repl");
    let mut interpreter = Interpreter::new(ResolutionTable::new());

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                diagnostics.reset();
                run_line(&line, &mut interpreter, &mut diagnostics);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(history_file);
    ExitCode::SUCCESS
}

/// Runs one REPL line against the accumulated global environment.
///
/// Per spec.md §9's recommended resolution of the auto-print open
/// question: a line that parses to exactly one top-level `Expression`
/// statement has its value printed (`=> value`); anything else runs for
/// its side effects only.
fn run_line(line: &str, interpreter: &mut Interpreter, diagnostics: &mut Diagnostics) {
    let tokens = lexer::scan(line, diagnostics);
    let statements = parser::parse(tokens, diagnostics);
    if diagnostics.had_error() {
        print_diagnostics(diagnostics);
        return;
    }

    let resolutions = resolver::resolve(&statements, diagnostics);
    if diagnostics.had_error() {
        print_diagnostics(diagnostics);
        return;
    }
    interpreter.set_resolutions(resolutions);

    if let [Stmt::Expression(expr)] = statements.as_slice() {
        match interpreter.interpret_expression(expr) {
            Ok(value) => println!("=> {}", value),
            Err(err) => {
                diagnostics.report_runtime(&err);
                print_diagnostics(diagnostics);
            }
        }
        return;
    }

    if let Err(err) = interpreter.interpret(&statements) {
        diagnostics.report_runtime(&err);
        print_diagnostics(diagnostics);
    }
}
