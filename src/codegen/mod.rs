//! Native backend: lowers the IR to LLVM through inkwell, then either
//! prints the textual module or JIT-runs `main`.

use crate::compiler::ENTRY;
use crate::ir::{Constant, Function, IRType, Module, Value};

use inkwell::builder::{Builder, BuilderError};
use inkwell::context::Context;
use inkwell::module::{Linkage, Module as LLVMModule};
use inkwell::targets::{InitializationConfig, Target};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::{AddressSpace, OptimizationLevel};

use thiserror::Error;
use tracing::debug;

use std::collections::HashMap;

pub mod function;
pub mod instruction;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Builder(#[from] BuilderError),

    #[error("register `{0}` has no value")]
    UnknownRegister(String),

    #[error("global `{0}` is not declared")]
    UnknownGlobal(String),

    #[error("function `{0}` is not declared")]
    UnknownFunction(String),

    #[error("no block labelled `{0}`")]
    UnknownBlock(String),

    #[error("`void` has no value representation")]
    VoidValue,

    #[error("calls must name a function, found `{0}`")]
    IndirectCall(String),

    #[error("LLVM rejected function `{0}`")]
    InvalidFunction(String),

    #[error("LLVM module verification failed: {0}")]
    Verify(String),

    #[error("JIT failed: {0}")]
    Jit(String),
}

type MainFn = unsafe extern "C" fn() -> i32;

/// LLVM name for an IR register: `%x.3` becomes `x.3`, and purely numeric
/// registers are left for LLVM to number.
fn llvm_name(register: &str) -> &str {
    let name = register.trim_start_matches('%');
    if name.chars().all(|c| c.is_ascii_digit()) {
        ""
    } else {
        name
    }
}

pub struct LLVMCodegen<'ctx> {
    context: &'ctx Context,
    module: LLVMModule<'ctx>,
    builder: Builder<'ctx>,
    function_value_map: HashMap<String, FunctionValue<'ctx>>,
    value_map: HashMap<String, BasicValueEnum<'ctx>>,
}

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        Self {
            context,
            module,
            builder,
            function_value_map: HashMap::new(),
            value_map: HashMap::new(),
        }
    }

    pub fn get_llvm_type(&self, ir_type: IRType) -> Result<BasicTypeEnum<'ctx>, CodegenError> {
        Ok(match ir_type {
            IRType::I1 => self.context.bool_type().as_basic_type_enum(),
            IRType::I32 => self.context.i32_type().as_basic_type_enum(),
            IRType::F32 => self.context.f32_type().as_basic_type_enum(),
            IRType::F64 => self.context.f64_type().as_basic_type_enum(),
            IRType::Ptr => self
                .context
                .ptr_type(AddressSpace::default())
                .as_basic_type_enum(),
            IRType::Void => return Err(CodegenError::VoidValue),
        })
    }

    pub fn declare_function(&mut self, function: &Function) -> Result<FunctionValue<'ctx>, CodegenError> {
        if let Some(f) = self.module.get_function(&function.name) {
            self.function_value_map.insert(function.name.clone(), f);
            return Ok(f);
        }

        let param_types = function
            .params
            .iter()
            .map(|(_, ty)| self.get_llvm_type(*ty).map(BasicMetadataTypeEnum::from))
            .collect::<Result<Vec<_>, _>>()?;

        let fn_type = match function.return_type {
            IRType::Void => self
                .context
                .void_type()
                .fn_type(&param_types, function.is_variadic),
            ty => self
                .get_llvm_type(ty)?
                .fn_type(&param_types, function.is_variadic),
        };

        let fn_val = self.module.add_function(&function.name, fn_type, None);
        self.function_value_map
            .insert(function.name.clone(), fn_val);
        Ok(fn_val)
    }

    fn store_value(&mut self, name: String, value: BasicValueEnum<'ctx>) {
        self.value_map.insert(name, value);
    }

    pub fn codegen_value(&self, val: &Value) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match val {
            Value::Constant(c) => self.codegen_constant(c),
            Value::Register(name) | Value::Argument(name) => self
                .value_map
                .get(name)
                .copied()
                .ok_or_else(|| CodegenError::UnknownRegister(name.clone())),
            Value::Global(name) => {
                if let Some(global) = self.module.get_global(name) {
                    Ok(global.as_pointer_value().into())
                } else if let Some(func) = self.function_value_map.get(name) {
                    Ok(func.as_global_value().as_pointer_value().into())
                } else {
                    Err(CodegenError::UnknownGlobal(name.clone()))
                }
            }
        }
    }

    fn codegen_constant(&self, constant: &Constant) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        Ok(match constant {
            Constant::Int(i) => self.context.i32_type().const_int(*i as u64, true).into(),
            Constant::Bool(b) => self.context.bool_type().const_int(*b as u64, false).into(),
            Constant::Float(f) => self.context.f32_type().const_float(*f as f64).into(),
            Constant::Double(d) => self.context.f64_type().const_float(*d).into(),
            Constant::Null => self
                .context
                .ptr_type(AddressSpace::default())
                .const_null()
                .into(),
            Constant::Void => return Err(CodegenError::VoidValue),
        })
    }

    pub fn generate_module(&mut self, ir_module: &Module) -> Result<(), CodegenError> {
        for (name, content) in &ir_module.global_strings {
            let string_val = self.context.const_string(content.as_bytes(), true);
            let global = self.module.add_global(string_val.get_type(), None, name);
            global.set_initializer(&string_val);
            global.set_linkage(Linkage::Private);
            global.set_unnamed_addr(true);
            global.set_constant(true);
        }

        for ir_global in &ir_module.globals {
            let ty = self.get_llvm_type(ir_global.ty)?;
            let initializer = self.codegen_constant(&ir_global.initializer)?;
            let global = self.module.add_global(ty, None, &ir_global.name);
            global.set_initializer(&initializer);
            global.set_constant(ir_global.is_constant);
        }

        // declared up front so calls can refer to functions defined later
        for function in &ir_module.functions {
            self.declare_function(function)?;
        }

        for function in &ir_module.functions {
            if !function.is_external {
                self.codegen_function(function)?;
            }
        }

        self.module
            .verify()
            .map_err(|err| CodegenError::Verify(err.to_string()))?;
        debug!(module = %ir_module.name, "LLVM module verified");
        Ok(())
    }

    /// Textual LLVM IR of everything generated so far.
    pub fn ir_text(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// JIT-compiles the module and calls `main`, returning its exit code.
    pub fn run_main(&self) -> Result<i32, CodegenError> {
        Target::initialize_native(&InitializationConfig::default()).map_err(CodegenError::Jit)?;
        let engine = self
            .module
            .create_jit_execution_engine(OptimizationLevel::None)
            .map_err(|err| CodegenError::Jit(err.to_string()))?;

        let main = unsafe { engine.get_function::<MainFn>(ENTRY) }
            .map_err(|err| CodegenError::Jit(format!("{:?}", err)))?;
        Ok(unsafe { main.call() })
    }
}

/// Lowers `module` and returns the LLVM IR text.
pub fn emit_llvm_ir(module: &Module) -> Result<String, CodegenError> {
    let context = Context::create();
    let mut codegen = LLVMCodegen::new(&context, &module.name);
    codegen.generate_module(module)?;
    Ok(codegen.ir_text())
}

/// Lowers `module` and runs it natively.
pub fn jit_run(module: &Module) -> Result<i32, CodegenError> {
    let context = Context::create();
    let mut codegen = LLVMCodegen::new(&context, &module.name);
    codegen.generate_module(module)?;
    codegen.run_main()
}
