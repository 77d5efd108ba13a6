use crate::ast::Type;
use crate::compiler::{ENTRY, ir_type};
use crate::ir::{FunctionBuilder, IRType};

/// Branch targets of the innermost enclosing loop.
#[derive(Debug, Clone)]
pub struct LoopTargets {
    pub break_label: String,
    pub continue_label: String,
}

/// Everything that belongs to the function currently being compiled. A
/// nested `def` swaps in a fresh context and restores the outer one when
/// it is done, so insertion points and loop targets never leak between
/// functions.
#[derive(Debug)]
pub struct FunctionContext {
    /// Distinguishes locals of this function from those of enclosing ones.
    pub id: usize,
    pub builder: FunctionBuilder,
    pub return_type: Type,
    pub loops: Vec<LoopTargets>,
    pub is_entry: bool,
}

impl FunctionContext {
    pub fn new(id: usize, ir_name: &str, params: Vec<(String, IRType)>, return_type: Type) -> Self {
        FunctionContext {
            id,
            builder: FunctionBuilder::new(ir_name, params, ir_type(return_type)),
            return_type,
            loops: Vec::new(),
            is_entry: false,
        }
    }

    /// The implicit `main` that top-level statements are compiled into.
    pub fn entry() -> Self {
        FunctionContext {
            is_entry: true,
            ..Self::new(0, ENTRY, vec![], Type::Int)
        }
    }

    pub fn name(&self) -> &str {
        self.builder.name()
    }

    pub fn innermost_loop(&self) -> Option<&LoopTargets> {
        self.loops.last()
    }
}
