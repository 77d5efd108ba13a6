use crate::ast::{BinOp, Expr, Type, UnOp};
use crate::compiler::{Builtin, CompileError, Compiler, Location, ir_type};
use crate::ir::{Constant, FCmpCond, ICmpCond, IRType, Instruction, Value};

use std::ops::Range;

/// An IR value together with its source-level type.
pub type Typed = (Value, Type);

fn icmp_cond(op: BinOp) -> Option<ICmpCond> {
    Some(match op {
        BinOp::Eq => ICmpCond::Eq,
        BinOp::NotEq => ICmpCond::Ne,
        BinOp::Less => ICmpCond::Slt,
        BinOp::LessEq => ICmpCond::Sle,
        BinOp::Greater => ICmpCond::Sgt,
        BinOp::GreaterEq => ICmpCond::Sge,
        _ => return None,
    })
}

fn fcmp_cond(op: BinOp) -> Option<FCmpCond> {
    Some(match op {
        BinOp::Eq => FCmpCond::Oeq,
        BinOp::NotEq => FCmpCond::One,
        BinOp::Less => FCmpCond::Olt,
        BinOp::LessEq => FCmpCond::Ole,
        BinOp::Greater => FCmpCond::Ogt,
        BinOp::GreaterEq => FCmpCond::Oge,
        _ => return None,
    })
}

impl Compiler<'_> {
    /// Emits code computing `expr`. `None` means a diagnostic was recorded.
    pub(crate) fn compile_expr(&mut self, expr: &(Expr, Range<usize>)) -> Option<Typed> {
        let (expr, span) = expr;
        let span = span.clone();
        match expr {
            Expr::Int { value } => Some((Value::Constant(Constant::Int(*value)), Type::Int)),
            Expr::Float { value } => Some((Value::Constant(Constant::Float(*value)), Type::Float)),
            Expr::Str { value } => Some((self.intern_string(value), Type::Str)),
            Expr::Bool { value } => self.load_variable(if *value { "true" } else { "false" }, span),
            Expr::Identifier { name } => self.load_variable(name, span),

            Expr::Prefix { operator, operand } => {
                let operand = self.compile_expr(operand)?;
                self.compile_prefix(*operator, operand, span)
            }

            Expr::Infix {
                operator,
                left,
                right,
            } => {
                // both sides are compiled so errors in either get reported
                let left = self.compile_expr(left);
                let right = self.compile_expr(right);
                self.compile_binary(*operator, left?, right?, span)
            }

            Expr::Call { callee, args } => self.compile_call(callee, args, span),
        }
    }

    /// Resolves `name` to the address of its storage.
    pub(crate) fn variable_slot(&mut self, name: &str, span: Range<usize>, assigning: bool) -> Option<(Value, Type)> {
        match self.env.lookup(name) {
            Some((Location::Local { function, slot }, ty)) => {
                if function != self.context.id {
                    self.error(CompileError::CapturedLocal { name: name.to_string() }, span);
                    return None;
                }
                Some((Value::Register(slot), ty))
            }
            Some((Location::Global { name: global, constant }, ty)) => {
                if constant && assigning {
                    self.error(CompileError::AssignToConstant { name: name.to_string() }, span);
                    return None;
                }
                Some((Value::Global(global), ty))
            }
            Some((Location::Function(_) | Location::Builtin(_), _)) => {
                self.error(CompileError::NotAVariable { name: name.to_string() }, span);
                None
            }
            None => {
                let name = name.to_string();
                let err = if assigning {
                    CompileError::UndefinedAssignment { name }
                } else {
                    CompileError::UndefinedVariable { name }
                };
                self.error(err, span);
                None
            }
        }
    }

    fn load_variable(&mut self, name: &str, span: Range<usize>) -> Option<Typed> {
        let (ptr, ty) = self.variable_slot(name, span.clone(), false)?;
        let dest = self.new_register();
        self.emit(Instruction::Load {
            dest: dest.clone(),
            ptr,
            ty: ir_type(ty),
            span,
        });
        Some((Value::Register(dest), ty))
    }

    /// Converts `value` to `to`, inserting an int/float conversion when
    /// needed. Any other mismatch is reported.
    pub(crate) fn convert(&mut self, value: Typed, to: Type, span: Range<usize>) -> Option<Value> {
        let (value, from) = value;
        match (from, to) {
            _ if from == to => Some(value),
            (Type::Int, Type::Float) => Some(self.int_to_float(value, IRType::F32, span)),
            (Type::Float, Type::Int) => Some(self.float_to_int(value, span)),
            (Type::Void, _) => {
                self.error(CompileError::VoidValue, span);
                None
            }
            _ => {
                self.error(
                    CompileError::TypeMismatch {
                        expected: to,
                        found: from,
                    },
                    span,
                );
                None
            }
        }
    }

    fn int_to_float(&mut self, value: Value, to_ty: IRType, span: Range<usize>) -> Value {
        let dest = self.new_register();
        self.emit(Instruction::SIToFP {
            dest: dest.clone(),
            value,
            from_ty: IRType::I32,
            to_ty,
            span,
        });
        Value::Register(dest)
    }

    fn float_to_int(&mut self, value: Value, span: Range<usize>) -> Value {
        let dest = self.new_register();
        self.emit(Instruction::FPToSI {
            dest: dest.clone(),
            value,
            from_ty: IRType::F32,
            to_ty: IRType::I32,
            span,
        });
        Value::Register(dest)
    }

    fn compile_prefix(&mut self, op: UnOp, operand: Typed, span: Range<usize>) -> Option<Typed> {
        let (value, ty) = operand;
        let dest = self.new_register();
        let instruction = match (op, ty) {
            (UnOp::Minus, Type::Int | Type::Float) => Instruction::Neg {
                dest: dest.clone(),
                value,
                ty: ir_type(ty),
                span: span.clone(),
            },
            (UnOp::Not, Type::Bool) => Instruction::Not {
                dest: dest.clone(),
                value,
                span: span.clone(),
            },
            _ => {
                self.error(CompileError::InvalidOperand { op, operand: ty }, span);
                return None;
            }
        };
        self.emit(instruction);
        Some((Value::Register(dest), ty))
    }

    /// Promotes an int operand to float when the other one is a float.
    fn unify(&mut self, left: Typed, right: Typed, span: Range<usize>) -> (Value, Value, Type) {
        match (left.1, right.1) {
            (Type::Int, Type::Float) => {
                let lhs = self.int_to_float(left.0, IRType::F32, span);
                (lhs, right.0, Type::Float)
            }
            (Type::Float, Type::Int) => {
                let rhs = self.int_to_float(right.0, IRType::F32, span);
                (left.0, rhs, Type::Float)
            }
            (ty, _) => (left.0, right.0, ty),
        }
    }

    /// Arithmetic and comparisons, shared by infix expressions and
    /// compound assignment.
    pub(crate) fn compile_binary(&mut self, op: BinOp, left: Typed, right: Typed, span: Range<usize>) -> Option<Typed> {
        let (lt, rt) = (left.1, right.1);

        if op == BinOp::Power {
            return self.compile_power(left, right, span);
        }

        if matches!(op, BinOp::Eq | BinOp::NotEq) && lt == Type::Bool && rt == Type::Bool {
            let dest = self.new_register();
            self.emit(Instruction::ICmp {
                dest: dest.clone(),
                cond: icmp_cond(op).unwrap_or(ICmpCond::Eq),
                lhs: left.0,
                rhs: right.0,
                ty: IRType::I1,
                span,
            });
            return Some((Value::Register(dest), Type::Bool));
        }

        if !lt.is_numeric() || !rt.is_numeric() {
            self.error(
                CompileError::InvalidOperands {
                    op,
                    left: lt,
                    right: rt,
                },
                span,
            );
            return None;
        }

        let (lhs, rhs, ty) = self.unify(left, right, span.clone());
        let dest = self.new_register();
        let result_ty = if op.is_comparison() { Type::Bool } else { ty };
        let ir_ty = ir_type(ty);
        let instruction = match op {
            BinOp::Add => Instruction::Add {
                dest: dest.clone(),
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
            BinOp::Sub => Instruction::Sub {
                dest: dest.clone(),
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
            BinOp::Mul => Instruction::Mul {
                dest: dest.clone(),
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
            BinOp::Div => Instruction::Div {
                dest: dest.clone(),
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
            BinOp::Mod => Instruction::Rem {
                dest: dest.clone(),
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
            _ if ty == Type::Float => Instruction::FCmp {
                dest: dest.clone(),
                cond: fcmp_cond(op)?,
                lhs,
                rhs,
                span,
            },
            _ => Instruction::ICmp {
                dest: dest.clone(),
                cond: icmp_cond(op)?,
                lhs,
                rhs,
                ty: ir_ty,
                span,
            },
        };
        self.emit(instruction);
        Some((Value::Register(dest), result_ty))
    }

    /// `a ^ b` calls `powf`; two int operands give an int result.
    fn compile_power(&mut self, left: Typed, right: Typed, span: Range<usize>) -> Option<Typed> {
        let (lt, rt) = (left.1, right.1);
        if !lt.is_numeric() || !rt.is_numeric() {
            self.error(
                CompileError::InvalidOperands {
                    op: BinOp::Power,
                    left: lt,
                    right: rt,
                },
                span,
            );
            return None;
        }

        let base = self.convert(left, Type::Float, span.clone())?;
        let exponent = self.convert(right, Type::Float, span.clone())?;
        let dest = self.new_register();
        self.emit(Instruction::Call {
            dest: Some(dest.clone()),
            func: Value::Global("powf".to_string()),
            args: vec![base, exponent],
            ty: IRType::F32,
            span: span.clone(),
        });

        let result = (Value::Register(dest), Type::Float);
        if lt == Type::Int && rt == Type::Int {
            let value = self.convert(result, Type::Int, span)?;
            Some((value, Type::Int))
        } else {
            Some(result)
        }
    }

    fn compile_call(&mut self, callee: &str, args: &[(Expr, Range<usize>)], span: Range<usize>) -> Option<Typed> {
        let signature = match self.env.lookup(callee) {
            Some((Location::Builtin(Builtin::Print), _)) => return self.compile_print(args, span),
            Some((Location::Function(signature), _)) => signature,
            other => {
                let name = callee.to_string();
                let err = match other {
                    None => CompileError::UndefinedFunction { name },
                    Some(_) => CompileError::NotAFunction { name },
                };
                self.error(err, span);
                for arg in args {
                    self.compile_expr(arg);
                }
                return None;
            }
        };

        if args.len() != signature.params.len() {
            self.error(
                CompileError::ArityMismatch {
                    name: callee.to_string(),
                    expected: signature.params.len(),
                    found: args.len(),
                },
                span,
            );
            for arg in args {
                self.compile_expr(arg);
            }
            return None;
        }

        let mut values = Vec::with_capacity(args.len());
        let mut ok = true;
        for (arg, param) in args.iter().zip(&signature.params) {
            let converted = match self.compile_expr(arg) {
                Some(value) => self.convert(value, *param, arg.1.clone()),
                None => None,
            };
            match converted {
                Some(value) => values.push(value),
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }

        let return_type = signature.return_type;
        let dest = (return_type != Type::Void).then(|| self.new_register());
        self.emit(Instruction::Call {
            dest: dest.clone(),
            func: Value::Global(signature.ir_name),
            args: values,
            ty: ir_type(return_type),
            span,
        });
        let value = dest.map_or(Value::Constant(Constant::Void), Value::Register);
        Some((value, return_type))
    }

    /// `print(fmt, args...)` forwards to the C `printf`, promoting floats
    /// to double and bools to int the way varargs expect.
    fn compile_print(&mut self, args: &[(Expr, Range<usize>)], span: Range<usize>) -> Option<Typed> {
        let Some((format, rest)) = args.split_first() else {
            self.error(CompileError::PrintWithoutFormat, span);
            return None;
        };

        let mut values = Vec::with_capacity(args.len());
        let mut ok = true;
        match self.compile_expr(format) {
            Some((value, Type::Str)) => values.push(value),
            Some((_, found)) => {
                self.error(CompileError::PrintFormat { found }, format.1.clone());
                ok = false;
            }
            None => ok = false,
        }

        for arg in rest {
            let arg_span = arg.1.clone();
            match self.compile_expr(arg) {
                Some((value, Type::Float)) => {
                    let dest = self.new_register();
                    self.emit(Instruction::FPExt {
                        dest: dest.clone(),
                        value,
                        from_ty: IRType::F32,
                        to_ty: IRType::F64,
                        span: arg_span,
                    });
                    values.push(Value::Register(dest));
                }
                Some((value, Type::Bool)) => {
                    let dest = self.new_register();
                    self.emit(Instruction::ZExt {
                        dest: dest.clone(),
                        value,
                        from_ty: IRType::I1,
                        to_ty: IRType::I32,
                        span: arg_span,
                    });
                    values.push(Value::Register(dest));
                }
                Some((_, Type::Void)) => {
                    self.error(CompileError::VoidValue, arg_span);
                    ok = false;
                }
                Some((value, _)) => values.push(value),
                None => ok = false,
            }
        }
        if !ok {
            return None;
        }

        let dest = self.new_register();
        self.emit(Instruction::Call {
            dest: Some(dest.clone()),
            func: Value::Global("printf".to_string()),
            args: values,
            ty: IRType::I32,
            span,
        });
        Some((Value::Register(dest), Type::Int))
    }
}
