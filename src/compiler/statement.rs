use crate::ast::{Assignment, AssignOp, Block, Expr, Stmt, Type, VarDecl};
use crate::compiler::context::LoopTargets;
use crate::compiler::{CompileError, Compiler, Location, ir_type};
use crate::ir::{Constant, Global, Instruction, Terminator, Value};

use std::ops::Range;

impl Compiler<'_> {
    pub(crate) fn compile_statement(&mut self, statement: &(Stmt, Range<usize>)) {
        let (statement, span) = statement;
        let span = span.clone();
        match statement {
            Stmt::Expression { expr } => {
                self.compile_expr(expr);
            }
            Stmt::VarDecl(decl) => self.compile_var_decl(decl, span),
            Stmt::Assignment(assignment) => self.compile_assignment(assignment, span),
            Stmt::Block(block) => self.compile_scoped_block(block),
            Stmt::Return { value } => self.compile_return(value.as_ref(), span),
            Stmt::FunctionDecl(decl) => self.compile_function(decl, span),
            Stmt::If {
                condition,
                then_block,
                else_block,
            } => self.compile_if(condition, then_block, else_block.as_ref(), span),
            Stmt::While { condition, body } => self.compile_while(condition, body, span),
            Stmt::For {
                init,
                condition,
                step,
                body,
            } => self.compile_for(init, condition, step, body, span),
            Stmt::Break => self.compile_loop_control("break", span),
            Stmt::Continue => self.compile_loop_control("continue", span),
            Stmt::Import { path } => self.compile_import(path, span),
        }
    }

    /// Compiles `block` in a fresh scope frame.
    pub(crate) fn compile_scoped_block(&mut self, block: &Block) {
        let parent = self.env.current();
        self.env.enter(parent);
        for statement in &block.statements {
            self.compile_statement(statement);
        }
        self.env.exit();
    }

    pub(crate) fn compile_var_decl(&mut self, decl: &VarDecl, span: Range<usize>) {
        let (declared, type_span) = decl.ty.clone();
        let value = self.compile_expr(&decl.value);

        if declared == Type::Void {
            self.error(CompileError::VoidBinding { name: decl.name.clone() }, type_span);
            return;
        }

        // redeclaring in the same frame reuses the existing storage
        if let Some((Location::Local { .. } | Location::Global { constant: false, .. }, existing)) =
            self.env.lookup_local(&decl.name)
        {
            if existing != declared {
                self.error(
                    CompileError::RedeclarationType {
                        name: decl.name.clone(),
                        declared,
                        existing,
                    },
                    type_span,
                );
                return;
            }
            let Some(value) = value else { return };
            let Some((ptr, ty)) = self.variable_slot(&decl.name, span.clone(), true) else {
                return;
            };
            if let Some(value) = self.convert(value, ty, decl.value.1.clone()) {
                self.store(value, ptr, ty, span);
            }
            return;
        }

        let ptr = if self.context.is_entry && self.env.is_root() {
            let name = self.unique_name(&decl.name);
            self.module.globals.push(Global {
                name: name.clone(),
                ty: ir_type(declared),
                initializer: ir_type(declared).zero(),
                is_constant: false,
            });
            self.env.define(
                &decl.name,
                Location::Global {
                    name: name.clone(),
                    constant: false,
                },
                declared,
            );
            Value::Global(name)
        } else {
            let slot = self
                .context
                .builder
                .add_alloca(&decl.name, ir_type(declared), span.clone());
            self.env.define(
                &decl.name,
                Location::Local {
                    function: self.context.id,
                    slot: slot.clone(),
                },
                declared,
            );
            Value::Register(slot)
        };

        if let Some(value) = value {
            if let Some(value) = self.convert(value, declared, decl.value.1.clone()) {
                self.store(value, ptr, declared, span);
            }
        }
    }

    pub(crate) fn compile_assignment(&mut self, assignment: &Assignment, span: Range<usize>) {
        // an unresolved target emits nothing, not even the right-hand side
        let Some((ptr, ty)) = self.variable_slot(&assignment.name, span.clone(), true) else {
            return;
        };
        let Some(rhs) = self.compile_expr(&assignment.value) else {
            return;
        };

        let result = match assignment.op.binop() {
            None => Some(rhs),
            Some(op) => {
                let dest = self.new_register();
                self.emit(Instruction::Load {
                    dest: dest.clone(),
                    ptr: ptr.clone(),
                    ty: ir_type(ty),
                    span: span.clone(),
                });
                self.compile_binary(op, (Value::Register(dest), ty), rhs, span.clone())
            }
        };
        let Some(result) = result else { return };

        let value_span = if assignment.op == AssignOp::Assign {
            assignment.value.1.clone()
        } else {
            span.clone()
        };
        if let Some(value) = self.convert(result, ty, value_span) {
            self.store(value, ptr, ty, span);
        }
    }

    fn store(&mut self, value: Value, ptr: Value, ty: Type, span: Range<usize>) {
        self.emit(Instruction::Store {
            value,
            ptr,
            ty: ir_type(ty),
            span,
        });
    }

    fn compile_return(&mut self, value: Option<&(Expr, Range<usize>)>, span: Range<usize>) {
        let expected = self.context.return_type;
        let function = self.context.name().to_string();

        let returned = match value {
            None => {
                if expected != Type::Void {
                    self.error(CompileError::ReturnValueMissing { function, expected }, span.clone());
                }
                None
            }
            Some(expr) => {
                let value = self.compile_expr(expr);
                if expected == Type::Void {
                    self.error(CompileError::UnexpectedReturnValue { function }, expr.1.clone());
                    None
                } else {
                    value.and_then(|value| self.convert(value, expected, expr.1.clone()))
                }
            }
        };

        // the block ends here even when the returned value was rejected
        let value = match returned {
            None if expected != Type::Void => Some(Value::Constant(ir_type(expected).zero())),
            returned => returned,
        };
        self.terminate(Terminator::Ret { value, span });
        self.begin_dead_block();
    }

    /// Compiles a condition and checks that it is a `bool`. On failure a
    /// constant stands in so the branches are still compiled.
    fn compile_condition(&mut self, condition: &(Expr, Range<usize>)) -> Value {
        match self.compile_expr(condition) {
            Some((value, Type::Bool)) => value,
            Some((_, found)) => {
                self.error(CompileError::NonBoolCondition { found }, condition.1.clone());
                Value::Constant(Constant::Bool(false))
            }
            None => Value::Constant(Constant::Bool(false)),
        }
    }

    fn compile_if(
        &mut self,
        condition: &(Expr, Range<usize>),
        then_block: &Block,
        else_block: Option<&Block>,
        span: Range<usize>,
    ) {
        let cond = self.compile_condition(condition);

        let then_label = self.context.builder.new_label("then");
        let merge_label = self.context.builder.new_label("merge");
        let else_label = match else_block {
            Some(_) => self.context.builder.new_label("else"),
            None => merge_label.clone(),
        };

        self.terminate(Terminator::CondBr {
            cond,
            then_label: then_label.clone(),
            else_label: else_label.clone(),
            span: condition.1.clone(),
        });

        self.switch_to_new_block(then_label);
        self.compile_scoped_block(then_block);
        self.branch(&merge_label, span.clone());

        if let Some(else_block) = else_block {
            self.switch_to_new_block(else_label);
            self.compile_scoped_block(else_block);
            self.branch(&merge_label, span);
        }

        self.switch_to_new_block(merge_label);
    }

    fn compile_while(&mut self, condition: &(Expr, Range<usize>), body: &Block, span: Range<usize>) {
        let cond_label = self.context.builder.new_label("while.cond");
        let body_label = self.context.builder.new_label("while.body");
        let end_label = self.context.builder.new_label("while.end");

        self.branch(&cond_label, span.clone());
        self.switch_to_new_block(cond_label.clone());
        let cond = self.compile_condition(condition);
        self.terminate(Terminator::CondBr {
            cond,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
            span: condition.1.clone(),
        });

        self.switch_to_new_block(body_label);
        self.context.loops.push(LoopTargets {
            break_label: end_label.clone(),
            continue_label: cond_label.clone(),
        });
        self.compile_scoped_block(body);
        self.context.loops.pop();
        self.branch(&cond_label, span);

        self.switch_to_new_block(end_label);
    }

    fn compile_for(
        &mut self,
        init: &(VarDecl, Range<usize>),
        condition: &(Expr, Range<usize>),
        step: &(Assignment, Range<usize>),
        body: &Block,
        span: Range<usize>,
    ) {
        // the loop variable lives in its own scope around the whole loop
        let parent = self.env.current();
        self.env.enter(parent);
        self.compile_var_decl(&init.0, init.1.clone());

        let cond_label = self.context.builder.new_label("for.cond");
        let body_label = self.context.builder.new_label("for.body");
        let step_label = self.context.builder.new_label("for.step");
        let end_label = self.context.builder.new_label("for.end");

        self.branch(&cond_label, span.clone());
        self.switch_to_new_block(cond_label.clone());
        let cond = self.compile_condition(condition);
        self.terminate(Terminator::CondBr {
            cond,
            then_label: body_label.clone(),
            else_label: end_label.clone(),
            span: condition.1.clone(),
        });

        self.switch_to_new_block(body_label);
        self.context.loops.push(LoopTargets {
            break_label: end_label.clone(),
            continue_label: step_label.clone(),
        });
        self.compile_scoped_block(body);
        self.context.loops.pop();
        self.branch(&step_label, span.clone());

        self.switch_to_new_block(step_label);
        self.compile_assignment(&step.0, step.1.clone());
        self.branch(&cond_label, span);

        self.switch_to_new_block(end_label);
        self.env.exit();
    }

    fn compile_loop_control(&mut self, keyword: &'static str, span: Range<usize>) {
        let target = self.context.innermost_loop().map(|targets| {
            if keyword == "break" {
                targets.break_label.clone()
            } else {
                targets.continue_label.clone()
            }
        });
        match target {
            Some(label) => {
                self.branch(&label, span);
                self.begin_dead_block();
            }
            None => self.error(CompileError::LoopControlOutsideLoop { keyword }, span),
        }
    }
}
