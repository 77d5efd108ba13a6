//! `shaka`: compile and run a `.shaka` program.
//!
//! ```text
//! shaka [OPTIONS] <FILE>
//!
//! Options:
//!   --dump-tokens   Print the token stream
//!   --dump-ast      Print the syntax tree as JSON
//!   --dump-ir       Print the generated IR
//!   --dump-llvm     Print the LLVM module (needs the `llvm` feature)
//!   --check         Stop after compiling, do not run
//!   --backend <B>   interpreter | llvm
//!   --fuel <N>      Instruction budget for the interpreter
//!   -v, --verbose   More logging (repeatable); RUST_LOG overrides
//! ```

use shakalang::diagnostics;
use shakalang::driver::{self, Backend, Config};
use shakalang::source::FileSystem;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use yansi::Paint;

use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "shaka")]
#[command(version)]
#[command(about = "Compiler and runner for the shaka language", long_about = None)]
struct Cli {
    /// Source file to compile
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Print the token stream
    #[arg(long)]
    dump_tokens: bool,

    /// Print the syntax tree as JSON
    #[arg(long)]
    dump_ast: bool,

    /// Print the generated IR
    #[arg(long)]
    dump_ir: bool,

    /// Print the LLVM module
    #[arg(long)]
    dump_llvm: bool,

    /// Only compile and report diagnostics
    #[arg(long)]
    check: bool,

    /// How to execute the program
    #[arg(long, value_enum, default_value_t = Backend::Interpreter)]
    backend: Backend,

    /// Instruction budget for the interpreter
    #[arg(long, default_value_t = shakalang::ir::interp::DEFAULT_FUEL)]
    fuel: u64,

    /// Increase logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config {
        input: cli.input,
        dump_tokens: cli.dump_tokens,
        dump_ast: cli.dump_ast,
        dump_ir: cli.dump_ir,
        dump_llvm: cli.dump_llvm,
        run: !cli.check,
        backend: cli.backend,
        fuel: cli.fuel,
    };

    let outcome = driver::run(&config)
        .with_context(|| format!("failed to process `{}`", config.input.display()))?;

    for dump in [&outcome.tokens, &outcome.ast, &outcome.ir, &outcome.llvm_ir]
        .into_iter()
        .flatten()
    {
        println!("{dump}");
    }

    diagnostics::eprint(&outcome.diagnostics, &FileSystem);
    if outcome.has_errors() {
        let count = outcome.diagnostics.iter().filter(|d| d.is_error()).count();
        eprintln!("{} {} error(s) found", "aborting:".red().bold(), count);
        return Ok(ExitCode::FAILURE);
    }

    match outcome.execution {
        Some(execution) => {
            print!("{}", execution.output);
            Ok(ExitCode::from(execution.exit_code as u8))
        }
        None => {
            eprintln!("{} {}", "ok:".green().bold(), config.input.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}
