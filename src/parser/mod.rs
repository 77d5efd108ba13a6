pub mod expression;
pub mod function;
pub mod statement;

#[cfg(test)]
pub mod test;

use crate::ast::{Block, Program, Stmt, Type};
use crate::diagnostics::Diagnostic;
use crate::lexer::{Lexeme, Lexer, Token};

use thiserror::Error;

use std::mem;
use std::ops::Range;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("expected token {expected}, found token {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        span: Range<usize>,
    },

    #[error("expected an expression, found token {found}")]
    NoPrefixRule { found: String, span: Range<usize> },

    #[error("unrecognised input `{text}`")]
    UnknownToken { text: String, span: Range<usize> },

    #[error("only named functions can be called, found `{found}` before `(`")]
    InvalidCallee { found: String, span: Range<usize> },
}

impl ParseError {
    pub fn span(&self) -> Range<usize> {
        match self {
            ParseError::UnexpectedToken { span, .. }
            | ParseError::NoPrefixRule { span, .. }
            | ParseError::UnknownToken { span, .. }
            | ParseError::InvalidCallee { span, .. } => span.clone(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ParseError::UnexpectedToken { .. } => "Syntax Error",
            ParseError::NoPrefixRule { .. } => "Syntax Error",
            ParseError::UnknownToken { .. } => "Lexical Error",
            ParseError::InvalidCallee { .. } => "Syntax Error",
        }
    }

    pub fn into_diagnostic(self, file: &str) -> Diagnostic {
        Diagnostic::error(self.code(), self.to_string(), file, self.span())
    }
}

/// Recursive-descent statement parser with a precedence-climbing expression
/// parser. `current` is always the next token still to be consumed and
/// `peek` the one after it; the parser never backtracks.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    file: String,
    current: Lexeme,
    peek: Lexeme,
    errors: Vec<Diagnostic>,
}

/// Parses a whole source file.
pub fn parse(source: &str, file: &str) -> (Program, Vec<Diagnostic>) {
    let mut parser = Parser::new(source, file);
    let program = parser.parse_program();
    (program, parser.into_errors())
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, file: impl Into<String>) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        let peek = lexer.next_token();
        Parser {
            lexer,
            file: file.into(),
            current,
            peek,
            errors: vec![],
        }
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while !self.at(&Token::Eof) {
            if self.at(&Token::RBrace) {
                // stray closer: report it and keep going
                self.unexpected("statement");
                self.advance();
                continue;
            }
            if let Some(statement) = self.parse_statement() {
                program.statements.push(statement);
            }
        }
        program
    }

    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<Diagnostic> {
        self.errors
    }

    /// `{ statement* }`
    pub(crate) fn parse_block(&mut self) -> Option<(Block, Range<usize>)> {
        let open = self.expect(Token::LBrace)?;
        let mut block = Block::default();
        while !self.at(&Token::RBrace) && !self.at(&Token::Eof) {
            if let Some(statement) = self.parse_statement() {
                block.statements.push(statement);
            }
        }
        let close = self.expect(Token::RBrace)?;
        Some((block, open.start..close.end))
    }

    pub(crate) fn block_statement(&mut self) -> Option<(Stmt, Range<usize>)> {
        let (block, span) = self.parse_block()?;
        Some((Stmt::Block(block), span))
    }

    // ---- token helpers ----

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.current = mem::replace(&mut self.peek, next);
    }

    /// Consumes the current token and returns it.
    fn bump(&mut self) -> Lexeme {
        let next = self.lexer.next_token();
        let next = mem::replace(&mut self.peek, next);
        mem::replace(&mut self.current, next)
    }

    fn at(&self, token: &Token) -> bool {
        mem::discriminant(&self.current.token) == mem::discriminant(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Option<Range<usize>> {
        if self.at(&token) {
            Some(self.bump().span)
        } else {
            self.unexpected(&token.to_string());
            None
        }
    }

    fn expect_ident(&mut self) -> Option<(String, Range<usize>)> {
        if let Token::Ident(name) = &self.current.token {
            let name = name.clone();
            Some((name, self.bump().span))
        } else {
            self.unexpected("identifier");
            None
        }
    }

    fn expect_type(&mut self) -> Option<(Type, Range<usize>)> {
        if let Token::Type(ty) = self.current.token {
            Some((ty, self.bump().span))
        } else {
            self.unexpected("type name");
            None
        }
    }

    fn unexpected(&mut self, expected: &str) {
        let err = ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.token.to_string(),
            span: self.current.span.clone(),
        };
        self.error(err);
    }

    fn error(&mut self, err: ParseError) {
        self.errors.push(err.into_diagnostic(&self.file));
    }

    /// Attaches `note` to every diagnostic raised since `mark`.
    fn annotate_since(&mut self, mark: usize, note: &str) {
        for diagnostic in &mut self.errors[mark..] {
            if diagnostic.note.is_none() {
                diagnostic.note = Some(note.to_string());
            }
        }
    }

    /// Skips to just past the next `;`, or up to (not over) a `}` or the
    /// end of input.
    fn synchronize(&mut self) {
        loop {
            match self.current.token {
                Token::Semicolon => {
                    self.advance();
                    return;
                }
                Token::RBrace | Token::Eof => return,
                _ => self.advance(),
            }
        }
    }
}
