//! Command-line surface for the Breadcrumb compiler.

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::compile::{compile_source, run_source};

#[derive(Parser)]
#[command(name = "crumb")]
#[command(about = "The Breadcrumb compiler", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile and execute a source file
    Run {
        /// Path to a .brc source file
        file: PathBuf,
    },
    /// Compile a source file and print its bytecode listing
    Compile {
        /// Path to a .brc source file
        file: PathBuf,
    },
}

pub fn run_cli() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Run { file }) => run_file(&file),
        Some(Commands::Compile { file }) => compile_file(&file),
        None => repl(),
    }
}

fn run_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let display = path.display().to_string();

    let outcome = run_source(&source);
    if !outcome.compile.diags.is_empty() {
        eprintln!("{}", outcome.compile.render_diagnostics(&source, &display));
    }
    if outcome.compile.diags.has_errors() {
        return Err(format!(
            "{}: {} error(s)",
            display,
            outcome.compile.diags.error_count()
        )
        .into());
    }
    let _ = outcome.result?;
    Ok(())
}

fn compile_file(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let source = fs::read_to_string(path)?;
    let display = path.display().to_string();

    let out = compile_source(&source);
    if !out.diags.is_empty() {
        eprintln!("{}", out.render_diagnostics(&source, &display));
    }
    if out.diags.has_errors() {
        return Err(format!("{}: {} error(s)", display, out.diags.error_count()).into());
    }
    print!("{}", out.listing());
    Ok(())
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    println!("crumb {} — type a statement, or 'exit' to leave", env!("CARGO_PKG_VERSION"));
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("crumb> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let outcome = run_source(line);
        if !outcome.compile.diags.is_empty() {
            eprintln!("{}", outcome.compile.render_diagnostics(line, "<repl>"));
        }
        match outcome.result {
            Ok(Some(value)) => println!("{}", value),
            Ok(None) => {}
            Err(e) => eprintln!("vm error: {}", e),
        }
    }
    Ok(())
}
