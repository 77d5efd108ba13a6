use crate::ast::{FunctionDecl, Type};
use crate::compiler::context::FunctionContext;
use crate::compiler::{CompileError, Compiler, Location, Signature, ir_type};
use crate::ir::{Constant, Instruction, Terminator, Value};

use tracing::debug;

use std::collections::HashSet;
use std::mem;
use std::ops::Range;

impl Compiler<'_> {
    pub(crate) fn compile_function(&mut self, decl: &FunctionDecl, span: Range<usize>) {
        let mut seen = HashSet::new();
        for (name, ty, param_span) in &decl.params {
            if *ty == Type::Void {
                self.error(CompileError::VoidBinding { name: name.clone() }, param_span.clone());
            }
            if !seen.insert(name.as_str()) {
                self.error(CompileError::DuplicateParameter { name: name.clone() }, param_span.clone());
            }
        }

        let signature = Signature {
            ir_name: self.unique_name(&decl.name),
            params: decl.params.iter().map(|(_, ty, _)| *ty).collect(),
            return_type: decl.return_type.0,
        };
        let return_type = signature.return_type;

        // visible to the rest of the enclosing scope, and to the body itself
        self.env
            .define(&decl.name, Location::Function(signature.clone()), return_type);
        let declaration_site = self.env.current();
        self.env.enter(declaration_site);
        self.env
            .define(&decl.name, Location::Function(signature.clone()), return_type);

        let id = self.new_function_id();
        let params = decl
            .params
            .iter()
            .map(|(name, ty, _)| (name.clone(), ir_type(*ty)))
            .collect();
        let outer = mem::replace(
            &mut self.context,
            FunctionContext::new(id, &signature.ir_name, params, return_type),
        );

        // parameters get stack slots so the body can assign to them
        for (name, ty, param_span) in &decl.params {
            if *ty == Type::Void {
                continue;
            }
            let slot = self
                .context
                .builder
                .add_alloca(name, ir_type(*ty), param_span.clone());
            self.emit(Instruction::Store {
                value: Value::Argument(name.clone()),
                ptr: Value::Register(slot.clone()),
                ty: ir_type(*ty),
                span: param_span.clone(),
            });
            self.env
                .define(name, Location::Local { function: id, slot }, *ty);
        }

        for statement in &decl.body.statements {
            self.compile_statement(statement);
        }
        self.finish_function(span.end..span.end);

        let inner = mem::replace(&mut self.context, outer);
        self.env.exit();
        self.env
            .define(&decl.name, Location::Function(signature.clone()), return_type);

        debug!(
            function = %decl.name,
            ir_name = %signature.ir_name,
            params = decl.params.len(),
            "compiled function"
        );
        self.module.functions.push(inner.builder.finish());
    }

    /// Terminates the block control falls into at the end of the function.
    pub(crate) fn finish_function(&mut self, span: Range<usize>) {
        let builder = &self.context.builder;
        if builder.is_terminated() {
            return;
        }

        let terminator = if !builder.current_is_reachable() {
            Terminator::Unreachable { span }
        } else if self.context.is_entry {
            Terminator::Ret {
                value: Some(Value::Constant(Constant::Int(0))),
                span,
            }
        } else if self.context.return_type == Type::Void {
            Terminator::Ret { value: None, span }
        } else {
            let expected = self.context.return_type;
            self.error(
                CompileError::MissingReturn {
                    function: self.context.name().to_string(),
                    expected,
                },
                span.clone(),
            );
            Terminator::Ret {
                value: Some(Value::Constant(ir_type(expected).zero())),
                span,
            }
        };
        self.terminate(terminator);
    }
}
