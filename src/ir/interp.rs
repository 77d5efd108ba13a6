//! A direct interpreter over the IR, used to run programs without LLVM.
//!
//! Stack slots live in one flat vector that is truncated when a call
//! returns. Pointers are symbolic (a slot index, a global name, or a string
//! literal name), so a pointer can never alias across kinds.

use super::*;

use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use thiserror::Error;
use tracing::trace;

pub const DEFAULT_FUEL: u64 = 10_000_000;
pub const MAX_CALL_DEPTH: usize = 512;
/// Largest printf field width or precision accepted.
pub const MAX_FIELD: usize = 4096;

#[derive(Debug, Clone, PartialEq)]
pub enum RtValue {
    Void,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Ptr(Pointer),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pointer {
    Null,
    Slot(usize),
    Global(String),
    Str(String),
}

impl From<&Constant> for RtValue {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Void => RtValue::Void,
            Constant::Bool(b) => RtValue::Bool(*b),
            Constant::Int(i) => RtValue::Int(*i),
            Constant::Float(f) => RtValue::Float(*f),
            Constant::Double(d) => RtValue::Double(*d),
            Constant::Null => RtValue::Ptr(Pointer::Null),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExecError {
    #[error("no function named `{0}`")]
    UnknownFunction(String),

    #[error("external function `{0}` is not available in the interpreter")]
    UnknownExternal(String),

    #[error("unknown global `{0}`")]
    UnknownGlobal(String),

    #[error("register `{register}` read before it was written in `{function}`")]
    UndefinedRegister { function: String, register: String },

    #[error("block `{label}` not found in `{function}`")]
    UnknownLabel { function: String, label: String },

    #[error("block `{block}` in `{function}` has no terminator")]
    MissingTerminator { function: String, block: String },

    #[error("reached unreachable code in `{function}`")]
    Unreachable { function: String },

    #[error("division by zero in `{function}`")]
    DivisionByZero { function: String },

    #[error("`{function}` expects {expected} arguments, got {found}")]
    Arity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("call depth exceeded {0}")]
    StackOverflow(usize),

    #[error("execution ran out of fuel")]
    OutOfFuel,

    #[error("type mismatch in `{function}`: {message}")]
    TypeMismatch { function: String, message: String },

    #[error("invalid memory access through {0:?}")]
    InvalidPointer(Pointer),

    #[error("cannot write to constant `{0}`")]
    WriteToConstant(String),

    #[error("bad printf call: {0}")]
    Format(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub exit_code: i32,
    pub output: String,
}

/// Runs `main` and collects everything it printed.
pub fn run(module: &Module, fuel: u64) -> Result<Execution, ExecError> {
    let mut interpreter = Interpreter::new(module, fuel);
    let exit_code = match interpreter.call("main", vec![])? {
        RtValue::Int(code) => code,
        RtValue::Void => 0,
        other => {
            return Err(ExecError::TypeMismatch {
                function: "main".to_string(),
                message: format!("expected an integer exit code, got {:?}", other),
            });
        }
    };
    Ok(Execution {
        exit_code,
        output: interpreter.output,
    })
}

#[derive(Clone, Copy)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

struct Frame {
    registers: HashMap<String, RtValue>,
    arguments: HashMap<String, RtValue>,
}

pub struct Interpreter<'m> {
    module: &'m Module,
    globals: HashMap<String, RtValue>,
    stack: Vec<RtValue>,
    output: String,
    fuel: u64,
    depth: usize,
}

impl<'m> Interpreter<'m> {
    pub fn new(module: &'m Module, fuel: u64) -> Self {
        let globals = module
            .globals
            .iter()
            .map(|g| (g.name.clone(), RtValue::from(&g.initializer)))
            .collect();
        Interpreter {
            module,
            globals,
            stack: Vec::new(),
            output: String::new(),
            fuel,
            depth: 0,
        }
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn call(&mut self, name: &str, args: Vec<RtValue>) -> Result<RtValue, ExecError> {
        let module = self.module;
        let function = module
            .function(name)
            .ok_or_else(|| ExecError::UnknownFunction(name.to_string()))?;

        if function.is_external {
            return self.call_external(name, args);
        }
        if args.len() != function.params.len() {
            return Err(ExecError::Arity {
                function: name.to_string(),
                expected: function.params.len(),
                found: args.len(),
            });
        }
        if self.depth >= MAX_CALL_DEPTH {
            return Err(ExecError::StackOverflow(MAX_CALL_DEPTH));
        }

        trace!(function = name, depth = self.depth, "call");
        self.depth += 1;
        let base = self.stack.len();
        let result = self.execute(function, args);
        self.stack.truncate(base);
        self.depth -= 1;
        result
    }

    fn execute(&mut self, function: &'m Function, args: Vec<RtValue>) -> Result<RtValue, ExecError> {
        let mut frame = Frame {
            registers: HashMap::new(),
            arguments: function
                .params
                .iter()
                .map(|(name, _)| name.clone())
                .zip(args)
                .collect(),
        };

        let mut block = function.blocks.first().ok_or_else(|| ExecError::UnknownLabel {
            function: function.name.clone(),
            label: "entry".to_string(),
        })?;

        loop {
            for instruction in &block.instructions {
                self.tick()?;
                self.step(function, &mut frame, instruction)?;
            }
            self.tick()?;

            let terminator = block
                .terminator
                .as_ref()
                .ok_or_else(|| ExecError::MissingTerminator {
                    function: function.name.clone(),
                    block: block.label.clone(),
                })?;

            let target = match terminator {
                Terminator::Ret { value, .. } => {
                    return match value {
                        Some(value) => self.eval(function, &frame, value),
                        None => Ok(RtValue::Void),
                    };
                }
                Terminator::Br { label, .. } => label,
                Terminator::CondBr {
                    cond,
                    then_label,
                    else_label,
                    ..
                } => match self.eval(function, &frame, cond)? {
                    RtValue::Bool(true) => then_label,
                    RtValue::Bool(false) => else_label,
                    other => return Err(mismatch(function, format!("branch on {:?}", other))),
                },
                Terminator::Unreachable { .. } => {
                    return Err(ExecError::Unreachable {
                        function: function.name.clone(),
                    });
                }
            };

            block = function.block(target).ok_or_else(|| ExecError::UnknownLabel {
                function: function.name.clone(),
                label: target.clone(),
            })?;
        }
    }

    fn tick(&mut self) -> Result<(), ExecError> {
        if self.fuel == 0 {
            return Err(ExecError::OutOfFuel);
        }
        self.fuel -= 1;
        Ok(())
    }

    fn step(&mut self, function: &Function, frame: &mut Frame, instruction: &Instruction) -> Result<(), ExecError> {
        let (dest, value) = match instruction {
            Instruction::Alloca { dest, ty, .. } => {
                self.stack.push(RtValue::from(&ty.zero()));
                (dest, RtValue::Ptr(Pointer::Slot(self.stack.len() - 1)))
            }
            Instruction::Load { dest, ptr, .. } => {
                let ptr = self.eval_pointer(function, frame, ptr)?;
                (dest, self.read(&ptr)?)
            }
            Instruction::Store { value, ptr, .. } => {
                let value = self.eval(function, frame, value)?;
                let ptr = self.eval_pointer(function, frame, ptr)?;
                return self.write(ptr, value);
            }
            Instruction::Add { dest, lhs, rhs, .. } => (dest, self.arith(function, frame, ArithOp::Add, lhs, rhs)?),
            Instruction::Sub { dest, lhs, rhs, .. } => (dest, self.arith(function, frame, ArithOp::Sub, lhs, rhs)?),
            Instruction::Mul { dest, lhs, rhs, .. } => (dest, self.arith(function, frame, ArithOp::Mul, lhs, rhs)?),
            Instruction::Div { dest, lhs, rhs, .. } => (dest, self.arith(function, frame, ArithOp::Div, lhs, rhs)?),
            Instruction::Rem { dest, lhs, rhs, .. } => (dest, self.arith(function, frame, ArithOp::Rem, lhs, rhs)?),
            Instruction::Neg { dest, value, .. } => {
                let result = match self.eval(function, frame, value)? {
                    RtValue::Int(i) => RtValue::Int(i.wrapping_neg()),
                    RtValue::Float(f) => RtValue::Float(-f),
                    other => return Err(mismatch(function, format!("negation of {:?}", other))),
                };
                (dest, result)
            }
            Instruction::Not { dest, value, .. } => match self.eval(function, frame, value)? {
                RtValue::Bool(b) => (dest, RtValue::Bool(!b)),
                other => return Err(mismatch(function, format!("logical not of {:?}", other))),
            },
            Instruction::ICmp {
                dest, cond, lhs, rhs, ..
            } => {
                let lhs = self.eval(function, frame, lhs)?;
                let rhs = self.eval(function, frame, rhs)?;
                let (a, b) = match (lhs, rhs) {
                    (RtValue::Int(a), RtValue::Int(b)) => (a, b),
                    (RtValue::Bool(a), RtValue::Bool(b)) => (a as i32, b as i32),
                    (a, b) => return Err(mismatch(function, format!("icmp of {:?} and {:?}", a, b))),
                };
                let result = match cond {
                    ICmpCond::Eq => a == b,
                    ICmpCond::Ne => a != b,
                    ICmpCond::Slt => a < b,
                    ICmpCond::Sle => a <= b,
                    ICmpCond::Sgt => a > b,
                    ICmpCond::Sge => a >= b,
                };
                (dest, RtValue::Bool(result))
            }
            Instruction::FCmp {
                dest, cond, lhs, rhs, ..
            } => {
                let lhs = self.eval(function, frame, lhs)?;
                let rhs = self.eval(function, frame, rhs)?;
                let (RtValue::Float(a), RtValue::Float(b)) = (&lhs, &rhs) else {
                    return Err(mismatch(function, format!("fcmp of {:?} and {:?}", lhs, rhs)));
                };
                let result = match cond {
                    FCmpCond::Oeq => a == b,
                    FCmpCond::One => a != b && !a.is_nan() && !b.is_nan(),
                    FCmpCond::Ogt => a > b,
                    FCmpCond::Oge => a >= b,
                    FCmpCond::Olt => a < b,
                    FCmpCond::Ole => a <= b,
                };
                (dest, RtValue::Bool(result))
            }
            Instruction::Call {
                dest, func, args, ..
            } => {
                let Value::Global(callee) = func else {
                    return Err(mismatch(function, format!("call through {}", func)));
                };
                let args = args
                    .iter()
                    .map(|arg| self.eval(function, frame, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let result = self.call(callee, args)?;
                match dest {
                    Some(dest) => (dest, result),
                    None => return Ok(()),
                }
            }
            Instruction::SIToFP {
                dest, value, to_ty, ..
            } => match (self.eval(function, frame, value)?, to_ty) {
                (RtValue::Int(i), IRType::F64) => (dest, RtValue::Double(i as f64)),
                (RtValue::Int(i), _) => (dest, RtValue::Float(i as f32)),
                (other, _) => return Err(mismatch(function, format!("sitofp of {:?}", other))),
            },
            Instruction::FPToSI { dest, value, .. } => match self.eval(function, frame, value)? {
                RtValue::Float(f) => (dest, RtValue::Int(f as i32)),
                RtValue::Double(d) => (dest, RtValue::Int(d as i32)),
                other => return Err(mismatch(function, format!("fptosi of {:?}", other))),
            },
            Instruction::FPExt { dest, value, .. } => match self.eval(function, frame, value)? {
                RtValue::Float(f) => (dest, RtValue::Double(f as f64)),
                other => return Err(mismatch(function, format!("fpext of {:?}", other))),
            },
            Instruction::ZExt { dest, value, .. } => match self.eval(function, frame, value)? {
                RtValue::Bool(b) => (dest, RtValue::Int(b as i32)),
                other => return Err(mismatch(function, format!("zext of {:?}", other))),
            },
        };
        frame.registers.insert(dest.clone(), value);
        Ok(())
    }

    fn eval(&self, function: &Function, frame: &Frame, value: &Value) -> Result<RtValue, ExecError> {
        match value {
            Value::Constant(c) => Ok(RtValue::from(c)),
            Value::Register(name) => {
                frame
                    .registers
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExecError::UndefinedRegister {
                        function: function.name.clone(),
                        register: name.clone(),
                    })
            }
            Value::Argument(name) => {
                frame
                    .arguments
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExecError::UndefinedRegister {
                        function: function.name.clone(),
                        register: format!("%{}", name),
                    })
            }
            Value::Global(name) => {
                if self.module.string(name).is_some() {
                    Ok(RtValue::Ptr(Pointer::Str(name.clone())))
                } else if self.globals.contains_key(name) {
                    Ok(RtValue::Ptr(Pointer::Global(name.clone())))
                } else {
                    Err(ExecError::UnknownGlobal(name.clone()))
                }
            }
        }
    }

    fn eval_pointer(&self, function: &Function, frame: &Frame, value: &Value) -> Result<Pointer, ExecError> {
        match self.eval(function, frame, value)? {
            RtValue::Ptr(ptr) => Ok(ptr),
            other => Err(mismatch(function, format!("{:?} used as a pointer", other))),
        }
    }

    fn read(&self, ptr: &Pointer) -> Result<RtValue, ExecError> {
        let value = match ptr {
            Pointer::Slot(slot) => self.stack.get(*slot),
            Pointer::Global(name) => self.globals.get(name),
            Pointer::Null | Pointer::Str(_) => None,
        };
        value.cloned().ok_or_else(|| ExecError::InvalidPointer(ptr.clone()))
    }

    fn write(&mut self, ptr: Pointer, value: RtValue) -> Result<(), ExecError> {
        match &ptr {
            Pointer::Slot(slot) => {
                if let Some(cell) = self.stack.get_mut(*slot) {
                    *cell = value;
                    return Ok(());
                }
            }
            Pointer::Global(name) => {
                if self.module.global(name).is_some_and(|g| g.is_constant) {
                    return Err(ExecError::WriteToConstant(name.clone()));
                }
                if let Some(cell) = self.globals.get_mut(name) {
                    *cell = value;
                    return Ok(());
                }
            }
            Pointer::Null | Pointer::Str(_) => {}
        }
        Err(ExecError::InvalidPointer(ptr))
    }

    fn arith(
        &self,
        function: &Function,
        frame: &Frame,
        op: ArithOp,
        lhs: &Value,
        rhs: &Value,
    ) -> Result<RtValue, ExecError> {
        let lhs = self.eval(function, frame, lhs)?;
        let rhs = self.eval(function, frame, rhs)?;
        match (lhs, rhs) {
            (RtValue::Int(a), RtValue::Int(b)) => {
                if matches!(op, ArithOp::Div | ArithOp::Rem) && b == 0 {
                    return Err(ExecError::DivisionByZero {
                        function: function.name.clone(),
                    });
                }
                Ok(RtValue::Int(match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mul => a.wrapping_mul(b),
                    ArithOp::Div => a.wrapping_div(b),
                    ArithOp::Rem => a.wrapping_rem(b),
                }))
            }
            (RtValue::Float(a), RtValue::Float(b)) => Ok(RtValue::Float(match op {
                ArithOp::Add => a + b,
                ArithOp::Sub => a - b,
                ArithOp::Mul => a * b,
                ArithOp::Div => a / b,
                ArithOp::Rem => a % b,
            })),
            (a, b) => Err(mismatch(function, format!("arithmetic on {:?} and {:?}", a, b))),
        }
    }

    fn call_external(&mut self, name: &str, args: Vec<RtValue>) -> Result<RtValue, ExecError> {
        match name {
            "printf" => {
                let format = match args.first() {
                    Some(RtValue::Ptr(Pointer::Str(s))) => self.module.string(s).unwrap_or_default(),
                    other => {
                        return Err(ExecError::Format(format!(
                            "format must be a string literal, got {:?}",
                            other
                        )));
                    }
                };
                let text = self.format_printf(format, &args[1..])?;
                self.output.push_str(&text);
                Ok(RtValue::Int(text.len() as i32))
            }
            "powf" => match args.as_slice() {
                [RtValue::Float(base), RtValue::Float(exp)] => Ok(RtValue::Float(base.powf(*exp))),
                other => Err(mismatch_external(name, format!("arguments {:?}", other))),
            },
            _ => Err(ExecError::UnknownExternal(name.to_string())),
        }
    }

    /// The subset of C `printf` the language can reach: flags `-+ 0#`,
    /// width, precision and the `d i u x X o c s f F %` conversions.
    fn format_printf(&self, format: &str, args: &[RtValue]) -> Result<String, ExecError> {
        let mut out = String::new();
        let mut args = args.iter();
        let mut chars = format.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }

            let mut spec = Spec::default();
            while let Some(&flag) = chars.peek() {
                match flag {
                    '-' => spec.left = true,
                    '+' => spec.plus = true,
                    ' ' => spec.space = true,
                    '0' => spec.zero = true,
                    '#' => spec.alt = true,
                    _ => break,
                }
                chars.next();
            }
            spec.width = digits(&mut chars)?.unwrap_or(0);
            if chars.peek() == Some(&'.') {
                chars.next();
                spec.precision = Some(digits(&mut chars)?.unwrap_or(0));
            }
            while matches!(chars.peek(), Some('l' | 'h' | 'z')) {
                chars.next();
            }

            let Some(conversion) = chars.next() else {
                return Err(ExecError::Format("format ends inside a conversion".to_string()));
            };
            match conversion {
                '%' => out.push('%'),
                'd' | 'i' => {
                    let n = int_arg(args.next(), conversion)? as i64;
                    let digits = int_digits(n.unsigned_abs().to_string(), &spec);
                    spec.pad_numeric(&mut out, spec.sign(n < 0), &digits);
                }
                'u' | 'x' | 'X' | 'o' => {
                    let n = int_arg(args.next(), conversion)? as u32;
                    let (body, prefix) = match conversion {
                        'x' => (format!("{:x}", n), "0x"),
                        'X' => (format!("{:X}", n), "0X"),
                        'o' => (format!("{:o}", n), "0"),
                        _ => (n.to_string(), ""),
                    };
                    let prefix = if spec.alt && n != 0 { prefix } else { "" };
                    spec.pad_numeric(&mut out, prefix, &int_digits(body, &spec));
                }
                'f' | 'F' => {
                    let x = float_arg(args.next(), conversion)?;
                    let body = if x.is_nan() {
                        "nan".to_string()
                    } else if x.is_infinite() {
                        "inf".to_string()
                    } else {
                        format!("{:.*}", spec.precision.unwrap_or(6), x.abs())
                    };
                    let body = if conversion == 'F' { body.to_uppercase() } else { body };
                    let negative = x.is_sign_negative() && !x.is_nan();
                    spec.pad_numeric(&mut out, spec.sign(negative), &body);
                }
                'c' => {
                    let n = int_arg(args.next(), conversion)?;
                    let c = char::from(n as u8);
                    spec.pad(&mut out, &c.to_string());
                }
                's' => {
                    let s = match args.next() {
                        Some(RtValue::Ptr(Pointer::Str(name))) => self.module.string(name).unwrap_or_default(),
                        Some(RtValue::Ptr(Pointer::Null)) => "(null)",
                        Some(other) => {
                            return Err(ExecError::Format(format!("`%s` expects a string, got {:?}", other)));
                        }
                        None => return Err(missing(conversion)),
                    };
                    let s: String = match spec.precision {
                        Some(p) => s.chars().take(p).collect(),
                        None => s.to_string(),
                    };
                    spec.pad(&mut out, &s);
                }
                other => {
                    return Err(ExecError::Format(format!("unsupported conversion `%{}`", other)));
                }
            }
        }

        Ok(out)
    }
}

#[derive(Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

impl Spec {
    fn sign(&self, negative: bool) -> &'static str {
        if negative {
            "-"
        } else if self.plus {
            "+"
        } else if self.space {
            " "
        } else {
            ""
        }
    }

    fn pad(&self, out: &mut String, body: &str) {
        let fill = self.width.saturating_sub(body.chars().count());
        if self.left {
            out.push_str(body);
            out.extend(std::iter::repeat_n(' ', fill));
        } else {
            out.extend(std::iter::repeat_n(' ', fill));
            out.push_str(body);
        }
    }

    fn pad_numeric(&self, out: &mut String, prefix: &str, digits: &str) {
        let len = prefix.len() + digits.len();
        let fill = self.width.saturating_sub(len);
        if self.left {
            out.push_str(prefix);
            out.push_str(digits);
            out.extend(std::iter::repeat_n(' ', fill));
        } else if self.zero {
            out.push_str(prefix);
            out.extend(std::iter::repeat_n('0', fill));
            out.push_str(digits);
        } else {
            out.extend(std::iter::repeat_n(' ', fill));
            out.push_str(prefix);
            out.push_str(digits);
        }
    }
}

/// Applies an integer precision (minimum digit count).
fn int_digits(digits: String, spec: &Spec) -> String {
    match spec.precision {
        Some(0) if digits == "0" => String::new(),
        Some(p) if p > digits.len() => format!("{}{}", "0".repeat(p - digits.len()), digits),
        _ => digits,
    }
}

/// Reads a width or precision, rejecting anything above `MAX_FIELD`.
fn digits(chars: &mut Peekable<Chars<'_>>) -> Result<Option<usize>, ExecError> {
    let mut value: Option<usize> = None;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        let next = value
            .unwrap_or(0)
            .checked_mul(10)
            .and_then(|v| v.checked_add(d as usize))
            .filter(|v| *v <= MAX_FIELD)
            .ok_or_else(|| ExecError::Format(format!("field width or precision above {}", MAX_FIELD)))?;
        value = Some(next);
        chars.next();
    }
    Ok(value)
}

fn int_arg(arg: Option<&RtValue>, conversion: char) -> Result<i32, ExecError> {
    match arg {
        Some(RtValue::Int(n)) => Ok(*n),
        Some(RtValue::Bool(b)) => Ok(*b as i32),
        Some(other) => Err(ExecError::Format(format!(
            "`%{}` expects an integer, got {:?}",
            conversion, other
        ))),
        None => Err(missing(conversion)),
    }
}

fn float_arg(arg: Option<&RtValue>, conversion: char) -> Result<f64, ExecError> {
    match arg {
        Some(RtValue::Double(d)) => Ok(*d),
        Some(RtValue::Float(f)) => Ok(*f as f64),
        Some(other) => Err(ExecError::Format(format!(
            "`%{}` expects a float, got {:?}",
            conversion, other
        ))),
        None => Err(missing(conversion)),
    }
}

fn missing(conversion: char) -> ExecError {
    ExecError::Format(format!("missing argument for `%{}`", conversion))
}

fn mismatch(function: &Function, message: String) -> ExecError {
    ExecError::TypeMismatch {
        function: function.name.clone(),
        message,
    }
}

fn mismatch_external(name: &str, message: String) -> ExecError {
    ExecError::TypeMismatch {
        function: name.to_string(),
        message,
    }
}
