use super::*;

use std::collections::{HashMap, HashSet};

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("function `{function}` has no entry block")]
    NoEntryBlock { function: String },

    #[error("block `{block}` in `{function}` has no terminator")]
    MissingTerminator { function: String, block: String },

    #[error("label `{label}` is defined twice in `{function}`")]
    DuplicateLabel { function: String, label: String },

    #[error("register `{register}` is assigned twice in `{function}`")]
    DuplicateRegister { function: String, register: String },

    #[error("block `{block}` in `{function}` branches to unknown label `{label}`")]
    UnknownLabel {
        function: String,
        block: String,
        label: String,
    },

    #[error("`{function}` returns {expected} but block `{block}` returns {found}")]
    ReturnMismatch {
        function: String,
        block: String,
        expected: IRType,
        found: String,
    },

    #[error("`{function}` calls unknown function `{callee}`")]
    UnknownCallee { function: String, callee: String },

    #[error("`{function}` calls `{callee}` with {found} arguments, expected {expected}")]
    ArityMismatch {
        function: String,
        callee: String,
        expected: usize,
        found: usize,
    },
}

/// Structural checks over a finished module: every block terminated, names
/// unique, branch targets and callees resolvable, returns matching the
/// declared type.
pub struct IRValidator;

impl IRValidator {
    pub fn validate_module(module: &Module) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for function in &module.functions {
            if let Err(mut func_errors) = Self::validate_function(module, function) {
                errors.append(&mut func_errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_function(module: &Module, function: &Function) -> Result<(), Vec<ValidationError>> {
        if function.is_external {
            return Ok(());
        }

        let mut errors = Vec::new();
        let name = &function.name;

        if function.blocks.is_empty() {
            return Err(vec![ValidationError::NoEntryBlock {
                function: name.clone(),
            }]);
        }

        let mut labels = HashSet::new();
        for block in &function.blocks {
            if !labels.insert(block.label.as_str()) {
                errors.push(ValidationError::DuplicateLabel {
                    function: name.clone(),
                    label: block.label.clone(),
                });
            }
        }

        let mut registers: HashMap<&str, IRType> = HashMap::new();
        for block in &function.blocks {
            for instruction in &block.instructions {
                if let Some((dest, ty)) = instruction.dest() {
                    if registers.insert(dest, ty).is_some() {
                        errors.push(ValidationError::DuplicateRegister {
                            function: name.clone(),
                            register: dest.to_string(),
                        });
                    }
                }
                if let Instruction::Call { func, args, .. } = instruction {
                    Self::check_call(module, name, func, args.len(), &mut errors);
                }
            }
        }

        for block in &function.blocks {
            let Some(terminator) = &block.terminator else {
                errors.push(ValidationError::MissingTerminator {
                    function: name.clone(),
                    block: block.label.clone(),
                });
                continue;
            };

            for target in terminator.successors() {
                if !labels.contains(target) {
                    errors.push(ValidationError::UnknownLabel {
                        function: name.clone(),
                        block: block.label.clone(),
                        label: target.to_string(),
                    });
                }
            }

            if let Terminator::Ret { value, .. } = terminator {
                let found = match value {
                    None => Some(IRType::Void),
                    Some(Value::Constant(c)) => Some(c.ty()),
                    Some(Value::Register(r)) => registers.get(r.as_str()).copied(),
                    Some(Value::Argument(a)) => function
                        .params
                        .iter()
                        .find(|(p, _)| p == a)
                        .map(|(_, ty)| *ty),
                    Some(Value::Global(_)) => Some(IRType::Ptr),
                };
                if let Some(found) = found {
                    if found != function.return_type {
                        errors.push(ValidationError::ReturnMismatch {
                            function: name.clone(),
                            block: block.label.clone(),
                            expected: function.return_type,
                            found: found.to_string(),
                        });
                    }
                }
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    fn check_call(
        module: &Module,
        caller: &str,
        func: &Value,
        arg_count: usize,
        errors: &mut Vec<ValidationError>,
    ) {
        let Value::Global(callee) = func else {
            return;
        };
        match module.function(callee) {
            None => errors.push(ValidationError::UnknownCallee {
                function: caller.to_string(),
                callee: callee.clone(),
            }),
            Some(target) => {
                let expected = target.params.len();
                let ok = if target.is_variadic {
                    arg_count >= expected
                } else {
                    arg_count == expected
                };
                if !ok {
                    errors.push(ValidationError::ArityMismatch {
                        function: caller.to_string(),
                        callee: callee.clone(),
                        expected,
                        found: arg_count,
                    });
                }
            }
        }
    }
}
