use crate::codegen::{CodegenError, LLVMCodegen, llvm_name};
use crate::ir::{FCmpCond, ICmpCond, IRType, Instruction, Value};

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};
use inkwell::{FloatPredicate, IntPredicate};

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl<'ctx> LLVMCodegen<'ctx> {
    pub fn codegen_instruction(&mut self, instr: &Instruction) -> Result<(), CodegenError> {
        match instr {
            Instruction::Add {
                dest, lhs, rhs, ty, ..
            } => self.codegen_arith(ArithOp::Add, dest, lhs, rhs, *ty),
            Instruction::Sub {
                dest, lhs, rhs, ty, ..
            } => self.codegen_arith(ArithOp::Sub, dest, lhs, rhs, *ty),
            Instruction::Mul {
                dest, lhs, rhs, ty, ..
            } => self.codegen_arith(ArithOp::Mul, dest, lhs, rhs, *ty),
            Instruction::Div {
                dest, lhs, rhs, ty, ..
            } => self.codegen_arith(ArithOp::Div, dest, lhs, rhs, *ty),
            Instruction::Rem {
                dest, lhs, rhs, ty, ..
            } => self.codegen_arith(ArithOp::Rem, dest, lhs, rhs, *ty),

            Instruction::Neg {
                dest, value, ty, ..
            } => {
                let val = self.codegen_value(value)?;
                let name = llvm_name(dest);
                let res: BasicValueEnum = if ty.is_float() {
                    self.builder
                        .build_float_neg(val.into_float_value(), name)?
                        .into()
                } else {
                    self.builder.build_int_neg(val.into_int_value(), name)?.into()
                };
                self.store_value(dest.clone(), res);
                Ok(())
            }

            Instruction::Not { dest, value, .. } => {
                let val = self.codegen_value(value)?;
                let res = self.builder.build_not(val.into_int_value(), llvm_name(dest))?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::ICmp {
                dest,
                cond,
                lhs,
                rhs,
                ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let predicate = match cond {
                    ICmpCond::Eq => IntPredicate::EQ,
                    ICmpCond::Ne => IntPredicate::NE,
                    ICmpCond::Slt => IntPredicate::SLT,
                    ICmpCond::Sle => IntPredicate::SLE,
                    ICmpCond::Sgt => IntPredicate::SGT,
                    ICmpCond::Sge => IntPredicate::SGE,
                };
                let res = self.builder.build_int_compare(
                    predicate,
                    lhs_val.into_int_value(),
                    rhs_val.into_int_value(),
                    llvm_name(dest),
                )?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::FCmp {
                dest,
                cond,
                lhs,
                rhs,
                ..
            } => {
                let lhs_val = self.codegen_value(lhs)?;
                let rhs_val = self.codegen_value(rhs)?;
                let predicate = match cond {
                    FCmpCond::Oeq => FloatPredicate::OEQ,
                    FCmpCond::One => FloatPredicate::ONE,
                    FCmpCond::Ogt => FloatPredicate::OGT,
                    FCmpCond::Oge => FloatPredicate::OGE,
                    FCmpCond::Olt => FloatPredicate::OLT,
                    FCmpCond::Ole => FloatPredicate::OLE,
                };
                let res = self.builder.build_float_compare(
                    predicate,
                    lhs_val.into_float_value(),
                    rhs_val.into_float_value(),
                    llvm_name(dest),
                )?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::Alloca { dest, ty, .. } => {
                let alloca_type = self.get_llvm_type(*ty)?;
                let alloca = self.builder.build_alloca(alloca_type, llvm_name(dest))?;
                self.store_value(dest.clone(), alloca.into());
                Ok(())
            }

            Instruction::Load { dest, ptr, ty, .. } => {
                let ptr_val = self.codegen_value(ptr)?;
                let load_type = self.get_llvm_type(*ty)?;
                let loaded = self.builder.build_load(
                    load_type,
                    ptr_val.into_pointer_value(),
                    llvm_name(dest),
                )?;
                self.store_value(dest.clone(), loaded);
                Ok(())
            }

            Instruction::Store { value, ptr, .. } => {
                let val = self.codegen_value(value)?;
                let ptr_val = self.codegen_value(ptr)?;
                self.builder.build_store(ptr_val.into_pointer_value(), val)?;
                Ok(())
            }

            Instruction::Call {
                dest, func, args, ..
            } => {
                let func_val = match func {
                    Value::Global(name) => *self
                        .function_value_map
                        .get(name)
                        .ok_or_else(|| CodegenError::UnknownFunction(name.clone()))?,
                    other => return Err(CodegenError::IndirectCall(other.to_string())),
                };

                let llvm_args = args
                    .iter()
                    .map(|arg| self.codegen_value(arg).map(BasicMetadataValueEnum::from))
                    .collect::<Result<Vec<_>, _>>()?;

                // void calls must stay unnamed
                let name = dest.as_deref().map_or("", llvm_name);
                let call_site = self.builder.build_call(func_val, &llvm_args, name)?;

                if let Some(dest_name) = dest {
                    if let Some(return_value) = call_site.try_as_basic_value().left() {
                        self.store_value(dest_name.clone(), return_value);
                    }
                }
                Ok(())
            }

            Instruction::SIToFP {
                dest, value, to_ty, ..
            } => {
                let val = self.codegen_value(value)?;
                let float_type = self.get_llvm_type(*to_ty)?.into_float_type();
                let res = self.builder.build_signed_int_to_float(
                    val.into_int_value(),
                    float_type,
                    llvm_name(dest),
                )?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::FPToSI {
                dest, value, to_ty, ..
            } => {
                let val = self.codegen_value(value)?;
                let int_type = self.get_llvm_type(*to_ty)?.into_int_type();
                let res = self.builder.build_float_to_signed_int(
                    val.into_float_value(),
                    int_type,
                    llvm_name(dest),
                )?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::FPExt {
                dest, value, to_ty, ..
            } => {
                let val = self.codegen_value(value)?;
                let float_type = self.get_llvm_type(*to_ty)?.into_float_type();
                let res = self
                    .builder
                    .build_float_ext(val.into_float_value(), float_type, llvm_name(dest))?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }

            Instruction::ZExt {
                dest, value, to_ty, ..
            } => {
                let val = self.codegen_value(value)?;
                let int_type = self.get_llvm_type(*to_ty)?.into_int_type();
                let res = self
                    .builder
                    .build_int_z_extend(val.into_int_value(), int_type, llvm_name(dest))?;
                self.store_value(dest.clone(), res.into());
                Ok(())
            }
        }
    }

    fn codegen_arith(
        &mut self,
        op: ArithOp,
        dest: &str,
        lhs: &Value,
        rhs: &Value,
        ty: IRType,
    ) -> Result<(), CodegenError> {
        let lhs_val = self.codegen_value(lhs)?;
        let rhs_val = self.codegen_value(rhs)?;
        let name = llvm_name(dest);

        let res: BasicValueEnum = if ty.is_float() {
            let (l, r) = (lhs_val.into_float_value(), rhs_val.into_float_value());
            match op {
                ArithOp::Add => self.builder.build_float_add(l, r, name)?,
                ArithOp::Sub => self.builder.build_float_sub(l, r, name)?,
                ArithOp::Mul => self.builder.build_float_mul(l, r, name)?,
                ArithOp::Div => self.builder.build_float_div(l, r, name)?,
                ArithOp::Rem => self.builder.build_float_rem(l, r, name)?,
            }
            .into()
        } else {
            let (l, r) = (lhs_val.into_int_value(), rhs_val.into_int_value());
            match op {
                ArithOp::Add => self.builder.build_int_add(l, r, name)?,
                ArithOp::Sub => self.builder.build_int_sub(l, r, name)?,
                ArithOp::Mul => self.builder.build_int_mul(l, r, name)?,
                ArithOp::Div => self.builder.build_int_signed_div(l, r, name)?,
                ArithOp::Rem => self.builder.build_int_signed_rem(l, r, name)?,
            }
            .into()
        };
        self.store_value(dest.to_string(), res);
        Ok(())
    }
}
