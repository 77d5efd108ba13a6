use logos::Logos;

use crate::ast::Type;

use std::fmt::{self, Display, Formatter};
use std::ops::Range;

#[cfg(test)]
pub mod test;

#[derive(Logos, Debug, PartialEq)]
#[logos(skip r"[ \n\r\t\f]+")] // Ignore this regex pattern between tokens
#[logos(skip r"#[^\n]*")] // line comments
#[derive(Clone)]
pub enum Token {
    // out-of-range literals surface as `Unknown`; write i32::MIN as
    // `-2147483647 - 1`
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i32>().ok())]
    Int(i32),

    // multi-dot numbers fail to parse and surface as `Unknown`
    #[regex(r"[0-9]+\.[0-9.]*", |lex| lex.slice().parse::<f32>().ok())]
    Float(f32),

    #[regex(r#""([^"\\]*(\\.[^"\\]*)*)""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len() - 1])
    })]
    Str(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[token("int", |_| Type::Int)]
    #[token("int52", |_| Type::Int)]
    #[token("float", |_| Type::Float)]
    #[token("float69", |_| Type::Float)]
    #[token("bool", |_| Type::Bool)]
    #[token("void", |_| Type::Void)]
    #[token("str", |_| Type::Str)]
    Type(Type),

    #[token("+")]
    Plus,

    #[token("-")]
    Minus,

    #[token("*")]
    Mul,

    #[token("/")]
    Div,

    #[token("%")]
    Mod,

    #[token("^")]
    Pow,

    #[token("==")]
    Eq,

    #[token("!=")]
    NotEq,

    #[token("<")]
    Less,

    #[token(">")]
    Greater,

    #[token("<=")]
    LessEq,

    #[token(">=")]
    GreaterEq,

    #[token("!")]
    Bang,

    #[token("=")]
    Assign,

    #[token("+=")]
    AddAssign,

    #[token("-=")]
    SubAssign,

    #[token("*=")]
    MulAssign,

    #[token("/=")]
    DivAssign,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token(",")]
    Comma,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("->")]
    Arrow,

    #[token("var")]
    KeywordVar,

    #[token("def")]
    KeywordDef,

    #[token("return")]
    KeywordReturn,

    #[token("if")]
    KeywordIf,

    #[token("else")]
    KeywordElse,

    #[token("while")]
    KeywordWhile,

    #[token("for")]
    KeywordFor,

    #[token("break")]
    KeywordBreak,

    #[token("continue")]
    KeywordContinue,

    #[token("import")]
    KeywordImport,

    #[token("true")]
    KeywordTrue,

    #[token("false")]
    KeywordFalse,

    /// Anything the scanner could not classify. The parser rejects it.
    Unknown(String),

    Eof,
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let fixed = match self {
            Token::Int(i) => return write!(f, "integer `{i}`"),
            Token::Float(x) => return write!(f, "float `{x}`"),
            Token::Str(s) => return write!(f, "string {:?}", s),
            Token::Ident(name) => return write!(f, "identifier `{name}`"),
            Token::Type(ty) => return write!(f, "type `{ty}`"),
            Token::Unknown(text) => return write!(f, "unknown token `{text}`"),
            Token::Eof => return write!(f, "end of file"),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Mul => "*",
            Token::Div => "/",
            Token::Mod => "%",
            Token::Pow => "^",
            Token::Eq => "==",
            Token::NotEq => "!=",
            Token::Less => "<",
            Token::Greater => ">",
            Token::LessEq => "<=",
            Token::GreaterEq => ">=",
            Token::Bang => "!",
            Token::Assign => "=",
            Token::AddAssign => "+=",
            Token::SubAssign => "-=",
            Token::MulAssign => "*=",
            Token::DivAssign => "/=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Semicolon => ";",
            Token::Arrow => "->",
            Token::KeywordVar => "var",
            Token::KeywordDef => "def",
            Token::KeywordReturn => "return",
            Token::KeywordIf => "if",
            Token::KeywordElse => "else",
            Token::KeywordWhile => "while",
            Token::KeywordFor => "for",
            Token::KeywordBreak => "break",
            Token::KeywordContinue => "continue",
            Token::KeywordImport => "import",
            Token::KeywordTrue => "true",
            Token::KeywordFalse => "false",
        };
        write!(f, "`{fixed}`")
    }
}

/// A classified token together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub span: Range<usize>,
    pub line: usize,
    pub column: usize,
}

pub struct Lexer<'src> {
    inner: logos::Lexer<'src, Token>,
    line_starts: Vec<usize>,
    len: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Lexer {
            inner: Token::lexer(source),
            line_starts,
            len: source.len(),
        }
    }

    /// Returns the next lexeme, or an `Eof` lexeme forever once the input
    /// is exhausted. Never fails: unrecognised input becomes `Token::Unknown`.
    pub fn next_token(&mut self) -> Lexeme {
        let token = match self.inner.next() {
            Some(Ok(token)) => token,
            Some(Err(())) => Token::Unknown(self.inner.slice().to_string()),
            None => return self.lexeme(Token::Eof, self.len..self.len),
        };
        let span = self.inner.span();
        self.lexeme(token, span)
    }

    /// 1-based line and column of a byte offset.
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }

    fn lexeme(&self, token: Token, span: Range<usize>) -> Lexeme {
        let (line, column) = self.position(span.start);
        Lexeme {
            token,
            span,
            line,
            column,
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Lexeme> {
        let lexeme = self.next_token();
        if lexeme.token == Token::Eof {
            None
        } else {
            Some(lexeme)
        }
    }
}
