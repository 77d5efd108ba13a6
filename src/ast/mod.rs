use serde::Serialize;

use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// Primitive types. `int52`/`float69` are spellings of `Int`/`Float`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Type {
    Int,
    Float,
    Bool,
    Void,
    Str,
}

impl Type {
    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::Void => "void",
            Type::Str => "str",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Program {
    pub statements: Vec<(Stmt, Range<usize>)>,
}

impl Program {
    /// Structural dump used by `--dump-ast`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Block {
    pub statements: Vec<(Stmt, Range<usize>)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VarDecl {
    pub name: String,
    pub ty: (Type, Range<usize>),
    pub value: (Expr, Range<usize>),
}

#[derive(Debug, Clone, Serialize)]
pub struct Assignment {
    pub name: String,
    pub op: AssignOp,
    pub value: (Expr, Range<usize>),
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<(String, Type, Range<usize>)>,
    pub return_type: (Type, Range<usize>),
    pub body: Block,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Stmt {
    Expression {
        expr: (Expr, Range<usize>),
    },
    VarDecl(VarDecl),
    Assignment(Assignment),
    Block(Block),
    Return {
        value: Option<(Expr, Range<usize>)>,
    },
    FunctionDecl(FunctionDecl),
    If {
        condition: (Expr, Range<usize>),
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        condition: (Expr, Range<usize>),
        body: Block,
    },
    For {
        init: Box<(VarDecl, Range<usize>)>,
        condition: (Expr, Range<usize>),
        step: Box<(Assignment, Range<usize>)>,
        body: Block,
    },
    Break,
    Continue,
    Import {
        path: String,
    },
}

impl Stmt {
    pub fn tag(&self) -> &'static str {
        match self {
            Stmt::Expression { .. } => "ExpressionStatement",
            Stmt::VarDecl(_) => "VarDecl",
            Stmt::Assignment(_) => "Assignment",
            Stmt::Block(_) => "Block",
            Stmt::Return { .. } => "Return",
            Stmt::FunctionDecl(_) => "FunctionDecl",
            Stmt::If { .. } => "If",
            Stmt::While { .. } => "While",
            Stmt::For { .. } => "For",
            Stmt::Break => "Break",
            Stmt::Continue => "Continue",
            Stmt::Import { .. } => "Import",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Expr {
    Int {
        value: i32,
    },
    Float {
        value: f32,
    },
    Bool {
        value: bool,
    },
    Str {
        value: String,
    },
    Identifier {
        name: String,
    },
    Infix {
        operator: BinOp,
        left: Box<(Expr, Range<usize>)>,
        right: Box<(Expr, Range<usize>)>,
    },
    Prefix {
        operator: UnOp,
        operand: Box<(Expr, Range<usize>)>,
    },
    Call {
        callee: String,
        args: Vec<(Expr, Range<usize>)>,
    },
}

impl Expr {
    pub fn tag(&self) -> &'static str {
        match self {
            Expr::Int { .. } => "IntLiteral",
            Expr::Float { .. } => "FloatLiteral",
            Expr::Bool { .. } => "BoolLiteral",
            Expr::Str { .. } => "StringLiteral",
            Expr::Identifier { .. } => "Identifier",
            Expr::Infix { .. } => "Infix",
            Expr::Prefix { .. } => "Prefix",
            Expr::Call { .. } => "Call",
        }
    }
}

/// Fully parenthesised rendering, e.g. `(1 + (2 * 3))`.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int { value } => write!(f, "{value}"),
            Expr::Float { value } => write!(f, "{value:?}"),
            Expr::Bool { value } => write!(f, "{value}"),
            Expr::Str { value } => write!(f, "{value:?}"),
            Expr::Identifier { name } => write!(f, "{name}"),
            Expr::Infix {
                operator,
                left,
                right,
            } => write!(f, "({} {} {})", left.0, operator, right.0),
            Expr::Prefix { operator, operand } => write!(f, "({}{})", operator, operand.0),
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                for (i, (arg, _)) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Power,

    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::NotEq | BinOp::Less | BinOp::Greater | BinOp::LessEq | BinOp::GreaterEq
        )
    }
}

impl Display for BinOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Power => "^",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    Minus,
    Not,
}

impl Display for UnOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UnOp::Minus => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// The arithmetic a compound assignment applies, `None` for plain `=`.
    pub fn binop(self) -> Option<BinOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::AddAssign => Some(BinOp::Add),
            AssignOp::SubAssign => Some(BinOp::Sub),
            AssignOp::MulAssign => Some(BinOp::Mul),
            AssignOp::DivAssign => Some(BinOp::Div),
        }
    }
}

impl Display for AssignOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
        };
        write!(f, "{s}")
    }
}
