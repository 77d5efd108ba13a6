//! The whole pipeline behind the `shaka` binary: read, parse, compile,
//! validate, then optionally execute.

#[cfg(test)]
pub mod test;

use crate::compiler::compile;
use crate::diagnostics::{Diagnostic, has_errors};
use crate::ir::interp::{self, ExecError, Execution};
use crate::ir::{IRValidator, Module};
use crate::lexer::Lexer;
use crate::parser::parse;
use crate::source::{FileSystem, SourceProvider};

use thiserror::Error;
use tracing::info;

use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Run the IR directly. Always available.
    #[default]
    Interpreter,
    /// JIT through LLVM. Needs the `llvm` feature.
    Llvm,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub dump_tokens: bool,
    pub dump_ast: bool,
    pub dump_ir: bool,
    /// LLVM's own rendering of the module. Needs the `llvm` feature.
    pub dump_llvm: bool,
    pub run: bool,
    pub backend: Backend,
    /// Instruction budget for the interpreter.
    pub fuel: u64,
}

impl Config {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Config {
            input: input.into(),
            dump_tokens: false,
            dump_ast: false,
            dump_ir: false,
            dump_llvm: false,
            run: false,
            backend: Backend::default(),
            fuel: interp::DEFAULT_FUEL,
        }
    }
}

/// What one pass over a program produced. Dumps are only filled when
/// asked for; `execution` only when the program compiled cleanly and
/// `run` was set.
#[derive(Debug, Default)]
pub struct Outcome {
    pub diagnostics: Vec<Diagnostic>,
    pub tokens: Option<String>,
    pub ast: Option<String>,
    pub ir: Option<String>,
    pub llvm_ir: Option<String>,
    pub module: Option<Module>,
    pub execution: Option<Execution>,
}

impl Outcome {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot read `{path}`: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialise the syntax tree: {0}")]
    Ast(#[from] serde_json::Error),

    #[error("generated IR is invalid:\n{0}")]
    InvalidIr(String),

    #[error("runtime error: {0}")]
    Exec(#[from] ExecError),

    #[error("LLVM backend: {0}")]
    Codegen(String),

    #[error("this build has no LLVM backend, rebuild with `--features llvm`")]
    LlvmUnavailable,
}

/// Runs the pipeline over files on disk.
pub fn run(config: &Config) -> Result<Outcome, DriverError> {
    run_with(config, &FileSystem)
}

/// Runs the pipeline, reading the input and its imports through `provider`.
pub fn run_with(config: &Config, provider: &dyn SourceProvider) -> Result<Outcome, DriverError> {
    let file = config.input.display().to_string();
    let source = provider
        .load(&config.input)
        .map_err(|source| DriverError::Read {
            path: file.clone(),
            source,
        })?;
    let mut outcome = Outcome::default();

    if config.dump_tokens {
        outcome.tokens = Some(dump_tokens(&source));
    }

    info!(file = %file, "parsing");
    let (program, parse_errors) = parse(&source, &file);
    outcome.diagnostics.extend(parse_errors);
    if config.dump_ast {
        outcome.ast = Some(program.to_json()?);
    }

    info!(statements = program.statements.len(), "compiling");
    let (module, compile_errors) = compile(&program, &file, provider);
    outcome.diagnostics.extend(compile_errors);
    if config.dump_ir {
        outcome.ir = Some(module.to_string());
    }

    if outcome.has_errors() {
        info!(
            diagnostics = outcome.diagnostics.len(),
            "stopping before execution"
        );
        outcome.module = Some(module);
        return Ok(outcome);
    }

    IRValidator::validate_module(&module).map_err(|errors| {
        DriverError::InvalidIr(
            errors
                .iter()
                .map(|err| format!("  {err}"))
                .collect::<Vec<_>>()
                .join("\n"),
        )
    })?;

    if config.dump_llvm {
        outcome.llvm_ir = Some(llvm_ir(&module)?);
    }

    if config.run {
        info!(backend = ?config.backend, "running");
        outcome.execution = Some(execute(&module, config)?);
    }
    outcome.module = Some(module);
    Ok(outcome)
}

fn execute(module: &Module, config: &Config) -> Result<Execution, DriverError> {
    match config.backend {
        Backend::Interpreter => Ok(interp::run(module, config.fuel)?),
        #[cfg(feature = "llvm")]
        Backend::Llvm => {
            // the JIT writes straight to the process's stdout
            let exit_code = crate::codegen::jit_run(module)
                .map_err(|err| DriverError::Codegen(err.to_string()))?;
            Ok(Execution {
                exit_code,
                output: String::new(),
            })
        }
        #[cfg(not(feature = "llvm"))]
        Backend::Llvm => Err(DriverError::LlvmUnavailable),
    }
}

#[cfg(feature = "llvm")]
fn llvm_ir(module: &Module) -> Result<String, DriverError> {
    crate::codegen::emit_llvm_ir(module).map_err(|err| DriverError::Codegen(err.to_string()))
}

#[cfg(not(feature = "llvm"))]
fn llvm_ir(_module: &Module) -> Result<String, DriverError> {
    Err(DriverError::LlvmUnavailable)
}

/// One token per line as `line:column token`.
pub fn dump_tokens(source: &str) -> String {
    Lexer::new(source)
        .map(|lexeme| format!("{}:{} {}\n", lexeme.line, lexeme.column, lexeme.token))
        .collect()
}
