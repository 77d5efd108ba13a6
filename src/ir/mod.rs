use std::fmt::{self, Display, Formatter};
use std::ops::Range;

pub mod builder;
pub mod interp;
pub mod irvalidator;

#[cfg(test)]
pub mod test;

pub use builder::FunctionBuilder;
pub use irvalidator::{IRValidator, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IRType {
    Void,
    I1,  // bool
    I32, // int
    F32, // float
    F64, // double, only for variadic calls
    Ptr, // string
}

impl IRType {
    pub fn is_float(self) -> bool {
        matches!(self, IRType::F32 | IRType::F64)
    }

    /// The all-zero value of this type, used for global initialisers.
    pub fn zero(self) -> Constant {
        match self {
            IRType::Void => Constant::Void,
            IRType::I1 => Constant::Bool(false),
            IRType::I32 => Constant::Int(0),
            IRType::F32 => Constant::Float(0.0),
            IRType::F64 => Constant::Double(0.0),
            IRType::Ptr => Constant::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Constant(Constant),
    Register(String),
    Global(String),
    Argument(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Void,
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    Null,
}

impl Constant {
    pub fn ty(&self) -> IRType {
        match self {
            Constant::Void => IRType::Void,
            Constant::Bool(_) => IRType::I1,
            Constant::Int(_) => IRType::I32,
            Constant::Float(_) => IRType::F32,
            Constant::Double(_) => IRType::F64,
            Constant::Null => IRType::Ptr,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub terminator: Option<Terminator>,
}

#[derive(Debug, Clone)]
pub enum Instruction {
    // Memory operations
    Alloca {
        dest: String,
        ty: IRType,
        span: Range<usize>,
    },
    Load {
        dest: String,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Store {
        value: Value,
        ptr: Value,
        ty: IRType,
        span: Range<usize>,
    },

    // Arithmetic operations; `ty` selects the integer or float form
    Add {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Sub {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Mul {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Div {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Rem {
        dest: String,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Neg {
        dest: String,
        value: Value,
        ty: IRType,
        span: Range<usize>,
    },
    Not {
        dest: String,
        value: Value,
        span: Range<usize>,
    },

    // Comparison operations
    ICmp {
        dest: String,
        cond: ICmpCond,
        lhs: Value,
        rhs: Value,
        ty: IRType,
        span: Range<usize>,
    },
    FCmp {
        dest: String,
        cond: FCmpCond,
        lhs: Value,
        rhs: Value,
        span: Range<usize>,
    },

    // Function calls
    Call {
        dest: Option<String>,
        func: Value,
        args: Vec<Value>,
        ty: IRType,
        span: Range<usize>,
    },

    // Type conversions
    SIToFP {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    FPToSI {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    FPExt {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
    ZExt {
        dest: String,
        value: Value,
        from_ty: IRType,
        to_ty: IRType,
        span: Range<usize>,
    },
}

impl Instruction {
    /// Register written by this instruction, with its type.
    pub fn dest(&self) -> Option<(&str, IRType)> {
        match self {
            Instruction::Alloca { dest, .. } => Some((dest.as_str(), IRType::Ptr)),
            Instruction::Load { dest, ty, .. }
            | Instruction::Add { dest, ty, .. }
            | Instruction::Sub { dest, ty, .. }
            | Instruction::Mul { dest, ty, .. }
            | Instruction::Div { dest, ty, .. }
            | Instruction::Rem { dest, ty, .. }
            | Instruction::Neg { dest, ty, .. } => Some((dest.as_str(), *ty)),
            Instruction::Not { dest, .. }
            | Instruction::ICmp { dest, .. }
            | Instruction::FCmp { dest, .. } => Some((dest.as_str(), IRType::I1)),
            Instruction::Call { dest, ty, .. } => dest.as_deref().map(|d| (d, *ty)),
            Instruction::SIToFP { dest, to_ty, .. }
            | Instruction::FPToSI { dest, to_ty, .. }
            | Instruction::FPExt { dest, to_ty, .. }
            | Instruction::ZExt { dest, to_ty, .. } => Some((dest.as_str(), *to_ty)),
            Instruction::Store { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Terminator {
    Ret {
        value: Option<Value>,
        span: Range<usize>,
    },
    Br {
        label: String,
        span: Range<usize>,
    },
    CondBr {
        cond: Value,
        then_label: String,
        else_label: String,
        span: Range<usize>,
    },
    Unreachable {
        span: Range<usize>,
    },
}

impl Terminator {
    pub fn successors(&self) -> Vec<&str> {
        match self {
            Terminator::Br { label, .. } => vec![label.as_str()],
            Terminator::CondBr {
                then_label,
                else_label,
                ..
            } => vec![then_label.as_str(), else_label.as_str()],
            Terminator::Ret { .. } | Terminator::Unreachable { .. } => vec![],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ICmpCond {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FCmpCond {
    Oeq,
    One,
    Ogt,
    Oge,
    Olt,
    Ole,
}

#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub params: Vec<(String, IRType)>,
    pub return_type: IRType,
    pub blocks: Vec<BasicBlock>,
    pub is_external: bool,
    pub is_variadic: bool,
}

impl Function {
    pub fn external(name: &str, params: Vec<(&str, IRType)>, return_type: IRType) -> Self {
        Function {
            name: name.to_string(),
            params: params
                .into_iter()
                .map(|(name, ty)| (name.to_string(), ty))
                .collect(),
            return_type,
            blocks: Vec::new(),
            is_external: true,
            is_variadic: false,
        }
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: IRType,
    pub initializer: Constant,
    pub is_constant: bool,
}

#[derive(Debug, Default, Clone)]
pub struct Module {
    pub name: String,
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
    /// Interned string literals, `(global name, contents)`.
    pub global_strings: Vec<(String, String)>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Module {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn global(&self, name: &str) -> Option<&Global> {
        self.globals.iter().find(|g| g.name == name)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.global_strings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s.as_str())
    }

    /// True if `name` is taken by a function, global or string literal.
    pub fn has_symbol(&self, name: &str) -> bool {
        self.function(name).is_some() || self.global(name).is_some() || self.string(name).is_some()
    }
}

// Display implementations

impl Display for IRType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IRType::Void => write!(f, "void"),
            IRType::I1 => write!(f, "i1"),
            IRType::I32 => write!(f, "i32"),
            IRType::F32 => write!(f, "float"),
            IRType::F64 => write!(f, "double"),
            IRType::Ptr => write!(f, "ptr"),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(c) => write!(f, "{}", c),
            Value::Register(name) => write!(f, "{}", name),
            Value::Global(name) => write!(f, "@{}", name),
            Value::Argument(name) => write!(f, "%{}", name),
        }
    }
}

impl Display for Constant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Void => write!(f, "void"),
            Constant::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Constant::Int(i) => write!(f, "{}", i),
            Constant::Float(fl) => write!(f, "{:.6}", fl),
            Constant::Double(fl) => write!(f, "{:.6}", fl),
            Constant::Null => write!(f, "null"),
        }
    }
}

impl Display for ICmpCond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            ICmpCond::Eq => "eq",
            ICmpCond::Ne => "ne",
            ICmpCond::Slt => "slt",
            ICmpCond::Sle => "sle",
            ICmpCond::Sgt => "sgt",
            ICmpCond::Sge => "sge",
        };
        write!(f, "{}", s)
    }
}

impl Display for FCmpCond {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            FCmpCond::Oeq => "oeq",
            FCmpCond::One => "one",
            FCmpCond::Ogt => "ogt",
            FCmpCond::Oge => "oge",
            FCmpCond::Olt => "olt",
            FCmpCond::Ole => "ole",
        };
        write!(f, "{}", s)
    }
}

fn arith(f: &mut Formatter<'_>, op: &str, dest: &str, ty: &IRType, lhs: &Value, rhs: &Value) -> fmt::Result {
    let (int_op, float_op) = match op {
        "add" => ("add", "fadd"),
        "sub" => ("sub", "fsub"),
        "mul" => ("mul", "fmul"),
        "div" => ("sdiv", "fdiv"),
        _ => ("srem", "frem"),
    };
    let op = if ty.is_float() { float_op } else { int_op };
    write!(f, "  {} = {} {} {}, {}", dest, op, ty, lhs, rhs)
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty, .. } => {
                write!(f, "  {} = alloca {}", dest, ty)
            }
            Instruction::Load { dest, ptr, ty, .. } => {
                write!(f, "  {} = load {}, ptr {}", dest, ty, ptr)
            }
            Instruction::Store { value, ptr, ty, .. } => {
                write!(f, "  store {} {}, ptr {}", ty, value, ptr)
            }
            Instruction::Add {
                dest, lhs, rhs, ty, ..
            } => arith(f, "add", dest, ty, lhs, rhs),
            Instruction::Sub {
                dest, lhs, rhs, ty, ..
            } => arith(f, "sub", dest, ty, lhs, rhs),
            Instruction::Mul {
                dest, lhs, rhs, ty, ..
            } => arith(f, "mul", dest, ty, lhs, rhs),
            Instruction::Div {
                dest, lhs, rhs, ty, ..
            } => arith(f, "div", dest, ty, lhs, rhs),
            Instruction::Rem {
                dest, lhs, rhs, ty, ..
            } => arith(f, "rem", dest, ty, lhs, rhs),
            Instruction::Neg {
                dest, value, ty, ..
            } => {
                if ty.is_float() {
                    write!(f, "  {} = fneg {} {}", dest, ty, value)
                } else {
                    write!(f, "  {} = sub {} 0, {}", dest, ty, value)
                }
            }
            Instruction::Not { dest, value, .. } => {
                write!(f, "  {} = xor i1 {}, true", dest, value)
            }
            Instruction::ICmp {
                dest,
                cond,
                lhs,
                rhs,
                ty,
                ..
            } => {
                write!(f, "  {} = icmp {} {} {}, {}", dest, cond, ty, lhs, rhs)
            }
            Instruction::FCmp {
                dest,
                cond,
                lhs,
                rhs,
                ..
            } => {
                write!(f, "  {} = fcmp {} float {}, {}", dest, cond, lhs, rhs)
            }
            Instruction::Call {
                dest,
                func,
                args,
                ty,
                ..
            } => {
                write!(f, "  ")?;
                if let Some(d) = dest {
                    write!(f, "{} = ", d)?;
                }
                write!(f, "call {} {}(", ty, func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Instruction::SIToFP {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                write!(f, "  {} = sitofp {} {} to {}", dest, from_ty, value, to_ty)
            }
            Instruction::FPToSI {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                write!(f, "  {} = fptosi {} {} to {}", dest, from_ty, value, to_ty)
            }
            Instruction::FPExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                write!(f, "  {} = fpext {} {} to {}", dest, from_ty, value, to_ty)
            }
            Instruction::ZExt {
                dest,
                value,
                from_ty,
                to_ty,
                ..
            } => {
                write!(f, "  {} = zext {} {} to {}", dest, from_ty, value, to_ty)
            }
        }
    }
}

impl Display for Terminator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Ret {
                value: Some(val), ..
            } => {
                write!(f, "  ret {}", val)
            }
            Terminator::Ret { value: None, .. } => {
                write!(f, "  ret void")
            }
            Terminator::Br { label, .. } => {
                write!(f, "  br label %{}", label)
            }
            Terminator::CondBr {
                cond,
                then_label,
                else_label,
                ..
            } => {
                write!(
                    f,
                    "  br i1 {}, label %{}, label %{}",
                    cond, then_label, else_label
                )
            }
            Terminator::Unreachable { .. } => {
                write!(f, "  unreachable")
            }
        }
    }
}

impl Display for BasicBlock {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.label)?;
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        if let Some(term) = &self.terminator {
            writeln!(f, "{}", term)?;
        }
        Ok(())
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_external {
            write!(f, "declare {} @{}(", self.return_type, self.name)?;
        } else {
            write!(f, "define {} @{}(", self.return_type, self.name)?;
        }

        for (i, (param_name, param_type)) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} %{}", param_type, param_name)?;
        }
        if self.is_variadic {
            write!(f, ", ...")?;
        }

        if self.is_external {
            writeln!(f, ")")?;
        } else {
            writeln!(f, ") {{")?;
            for block in &self.blocks {
                write!(f, "{}", block)?;
            }
            writeln!(f, "}}")?;
        }
        Ok(())
    }
}

impl Display for Global {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let kind = if self.is_constant { "constant" } else { "global" };
        write!(f, "@{} = {} {} {}", self.name, kind, self.ty, self.initializer)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "; Module: {}", self.name)?;
        writeln!(f)?;

        if !self.global_strings.is_empty() {
            writeln!(f, "; Global strings")?;
            for (name, value) in &self.global_strings {
                writeln!(
                    f,
                    "@{} = private unnamed_addr constant [{} x i8] c\"{}\\00\"",
                    name,
                    value.len() + 1,
                    value.escape_default()
                )?;
            }
            writeln!(f)?;
        }

        if !self.globals.is_empty() {
            writeln!(f, "; Globals")?;
            for global in &self.globals {
                writeln!(f, "{}", global)?;
            }
            writeln!(f)?;
        }

        for function in &self.functions {
            writeln!(f, "{}", function)?;
        }

        Ok(())
    }
}
