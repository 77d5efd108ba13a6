pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod driver;
pub mod environment;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod source;

#[cfg(feature = "llvm")]
pub mod codegen;
