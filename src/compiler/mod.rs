//! Lowers a parsed [`Program`] to the control-flow IR in [`crate::ir`].
//!
//! Top-level statements become the body of an implicit `main() -> i32`.
//! Every problem found is recorded as a [`Diagnostic`] and compilation
//! carries on, so one pass reports as much as possible.

pub mod context;
pub mod expression;
pub mod function;
pub mod import;
pub mod statement;


use crate::ast::{BinOp, Program, Type, UnOp};
use crate::diagnostics::{Diagnostic, Severity};
use crate::environment::Environment;
use crate::ir::{Constant, Function, Global, IRType, Instruction, Module, Terminator, Value};
use crate::source::SourceProvider;

use context::FunctionContext;
use import::normalize;

use thiserror::Error;
use tracing::debug;

use std::collections::HashSet;
use std::ops::Range;
use std::path::{Path, PathBuf};

/// Name of the implicit entry function.
pub const ENTRY: &str = "main";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("undefined variable `{name}`")]
    UndefinedVariable { name: String },

    #[error("cannot assign to undefined variable `{name}`")]
    UndefinedAssignment { name: String },

    #[error("call to undefined function `{name}`")]
    UndefinedFunction { name: String },

    #[error("`{name}` is not a function")]
    NotAFunction { name: String },

    #[error("`{name}` is a function, not a variable")]
    NotAVariable { name: String },

    #[error("cannot assign to constant `{name}`")]
    AssignToConstant { name: String },

    #[error("`{name}` cannot be used here: it is a local of an enclosing function")]
    CapturedLocal { name: String },

    #[error("`{name}` expects {expected} arguments, found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("type mismatch: expected `{expected}`, found `{found}`")]
    TypeMismatch { expected: Type, found: Type },

    #[error("operator `{op}` cannot be applied to `{left}` and `{right}`")]
    InvalidOperands { op: BinOp, left: Type, right: Type },

    #[error("operator `{op}` cannot be applied to `{operand}`")]
    InvalidOperand { op: UnOp, operand: Type },

    #[error("condition must be `bool`, found `{found}`")]
    NonBoolCondition { found: Type },

    #[error("`{name}` cannot have type `void`")]
    VoidBinding { name: String },

    #[error("a `void` value cannot be used here")]
    VoidValue,

    #[error("parameter `{name}` is declared twice")]
    DuplicateParameter { name: String },

    #[error("the first argument of `print` must be a `str`, found `{found}`")]
    PrintFormat { found: Type },

    #[error("`print` needs at least a format string")]
    PrintWithoutFormat,

    #[error("`{keyword}` outside of a loop")]
    LoopControlOutsideLoop { keyword: &'static str },

    #[error("`{function}` must return a `{expected}` value")]
    ReturnValueMissing { function: String, expected: Type },

    #[error("`{function}` returns `void` and cannot return a value")]
    UnexpectedReturnValue { function: String },

    #[error("`{function}` can reach its end without returning a `{expected}`")]
    MissingReturn { function: String, expected: Type },

    #[error("`{name}` is declared again here with type `{declared}`, but the existing variable is `{existing}`")]
    RedeclarationType {
        name: String,
        declared: Type,
        existing: Type,
    },

    #[error("cannot read import `{path}`: {reason}")]
    ImportRead { path: String, reason: String },

    #[error("import `{path}` has syntax errors")]
    ImportSyntax { path: String },

    #[error("import cycle: {chain}")]
    ImportCycle { chain: String },

    #[error("`{path}` is already imported")]
    AlreadyImported { path: String },

    #[error("`import` is only allowed at the top level of a file")]
    NestedImport,
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::UndefinedVariable { .. }
            | CompileError::UndefinedAssignment { .. }
            | CompileError::UndefinedFunction { .. }
            | CompileError::NotAFunction { .. }
            | CompileError::NotAVariable { .. }
            | CompileError::AssignToConstant { .. }
            | CompileError::CapturedLocal { .. }
            | CompileError::DuplicateParameter { .. } => "Name Error",
            CompileError::LoopControlOutsideLoop { .. }
            | CompileError::ReturnValueMissing { .. }
            | CompileError::UnexpectedReturnValue { .. }
            | CompileError::MissingReturn { .. } => "Control Flow Error",
            CompileError::ImportRead { .. }
            | CompileError::ImportSyntax { .. }
            | CompileError::ImportCycle { .. }
            | CompileError::AlreadyImported { .. }
            | CompileError::NestedImport => "Import Error",
            _ => "Type Error",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            CompileError::AlreadyImported { .. } => Severity::Note,
            _ => Severity::Error,
        }
    }

    pub fn into_diagnostic(self, file: &str, span: Range<usize>) -> Diagnostic {
        let severity = self.severity();
        Diagnostic::error(self.code(), self.to_string(), file, span).with_severity(severity)
    }
}

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Location {
    /// Stack slot of the function with id `function`; `slot` is the
    /// register holding its address.
    Local { function: usize, slot: String },
    Global { name: String, constant: bool },
    Function(Signature),
    Builtin(Builtin),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub ir_name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
}

pub fn ir_type(ty: Type) -> IRType {
    match ty {
        Type::Int => IRType::I32,
        Type::Float => IRType::F32,
        Type::Bool => IRType::I1,
        Type::Void => IRType::Void,
        Type::Str => IRType::Ptr,
    }
}

pub struct Compiler<'p> {
    module: Module,
    env: Environment<Location>,
    context: FunctionContext,
    diagnostics: Vec<Diagnostic>,
    provider: &'p dyn SourceProvider,
    /// File whose statements are being compiled; changes during imports.
    file: String,
    /// IR symbol names handed out so far.
    symbols: HashSet<String>,
    imported: HashSet<PathBuf>,
    importing: Vec<PathBuf>,
    next_function_id: usize,
    program_end: usize,
}

/// Compiles `program`, read from `file`, into a module.
pub fn compile(program: &Program, file: &str, provider: &dyn SourceProvider) -> (Module, Vec<Diagnostic>) {
    let mut compiler = Compiler::new(file, provider);
    compiler.compile_program(program);
    compiler.finish()
}

impl<'p> Compiler<'p> {
    pub fn new(file: &str, provider: &'p dyn SourceProvider) -> Self {
        let module_name = Path::new(file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());

        let mut compiler = Self {
            module: Module::new(module_name),
            env: Environment::new(),
            context: FunctionContext::entry(),
            diagnostics: Vec::new(),
            provider,
            file: file.to_string(),
            symbols: HashSet::new(),
            imported: HashSet::new(),
            importing: vec![normalize(Path::new(file))],
            next_function_id: 1,
            program_end: 0,
        };

        compiler.add_builtins();
        compiler
    }

    fn add_builtins(&mut self) {
        let mut printf = Function::external("printf", vec![("format", IRType::Ptr)], IRType::I32);
        printf.is_variadic = true;
        self.module.functions.push(printf);
        self.module.functions.push(Function::external(
            "powf",
            vec![("x", IRType::F32), ("y", IRType::F32)],
            IRType::F32,
        ));

        for (name, value) in [("true", true), ("false", false)] {
            self.module.globals.push(Global {
                name: name.to_string(),
                ty: IRType::I1,
                initializer: Constant::Bool(value),
                is_constant: true,
            });
            self.env.define(
                name,
                Location::Global {
                    name: name.to_string(),
                    constant: true,
                },
                Type::Bool,
            );
        }
        self.env.define("print", Location::Builtin(Builtin::Print), Type::Int);

        self.symbols
            .extend([ENTRY, "printf", "powf", "true", "false"].map(String::from));
    }

    pub fn compile_program(&mut self, program: &Program) {
        for statement in &program.statements {
            self.compile_statement(statement);
        }
        if let Some((_, span)) = program.statements.last() {
            self.program_end = self.program_end.max(span.end);
        }
    }

    /// Closes `main` and hands back the module with every diagnostic.
    pub fn finish(mut self) -> (Module, Vec<Diagnostic>) {
        let end = self.program_end;
        self.finish_function(end..end);
        let Compiler {
            mut module,
            context,
            diagnostics,
            ..
        } = self;
        module.functions.push(context.builder.finish());
        debug!(
            functions = module.functions.len(),
            diagnostics = diagnostics.len(),
            "compiled module"
        );
        (module, diagnostics)
    }

    // ---- helpers shared by the submodules ----

    fn error(&mut self, err: CompileError, span: Range<usize>) {
        self.diagnostics.push(err.into_diagnostic(&self.file, span));
    }

    fn emit(&mut self, instruction: Instruction) {
        self.context.builder.add_instruction(instruction);
    }

    fn new_register(&mut self) -> String {
        self.context.builder.new_register()
    }

    fn terminate(&mut self, terminator: Terminator) {
        self.context.builder.set_terminator(terminator);
    }

    /// Moves to a fresh block after a `return`/`break`/`continue` so the
    /// statements that follow are still checked.
    fn begin_dead_block(&mut self) {
        let label = self.context.builder.new_label("dead");
        let block = self.context.builder.create_block(label);
        self.context.builder.set_current_block(block);
    }

    /// Creates a block and makes it the insertion point.
    fn switch_to_new_block(&mut self, label: String) {
        let block = self.context.builder.create_block(label);
        self.context.builder.set_current_block(block);
    }

    fn branch(&mut self, label: &str, span: Range<usize>) {
        self.terminate(Terminator::Br {
            label: label.to_string(),
            span,
        });
    }

    /// Reserves an IR symbol name, suffixing `.N` on collision.
    fn unique_name(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 0;
        while self.symbols.contains(&candidate) || self.module.has_symbol(&candidate) {
            n += 1;
            candidate = format!("{}.{}", name, n);
        }
        self.symbols.insert(candidate.clone());
        candidate
    }

    /// Interns a string literal and returns the global naming it.
    fn intern_string(&mut self, content: &str) -> Value {
        if let Some((name, _)) = self.module.global_strings.iter().find(|(_, s)| s == content) {
            return Value::Global(name.clone());
        }
        let name = format!(".str.{}", self.module.global_strings.len());
        self.module
            .global_strings
            .push((name.clone(), content.to_string()));
        Value::Global(name)
    }

    fn new_function_id(&mut self) -> usize {
        let id = self.next_function_id;
        self.next_function_id += 1;
        id
    }
}
