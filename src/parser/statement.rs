use crate::ast::{AssignOp, Assignment, Stmt, VarDecl};
use crate::lexer::Token;
use crate::parser::Parser;
use crate::parser::expression::Precedence;

use std::ops::Range;

fn assign_op(token: &Token) -> Option<AssignOp> {
    Some(match token {
        Token::Assign => AssignOp::Assign,
        Token::AddAssign => AssignOp::AddAssign,
        Token::SubAssign => AssignOp::SubAssign,
        Token::MulAssign => AssignOp::MulAssign,
        Token::DivAssign => AssignOp::DivAssign,
        _ => return None,
    })
}

impl Parser<'_> {
    /// Parses one statement. On failure the diagnostics are recorded, the
    /// parser resynchronises at the next statement boundary and `None` is
    /// returned.
    pub fn parse_statement(&mut self) -> Option<(Stmt, Range<usize>)> {
        let statement = match &self.current.token {
            Token::Ident(_) if assign_op(&self.peek.token).is_some() => self.parse_assignment_statement(),
            Token::KeywordVar => self
                .parse_var_decl()
                .map(|(decl, span)| (Stmt::VarDecl(decl), span)),
            Token::KeywordDef => self.parse_function(),
            Token::KeywordReturn => self.parse_return(),
            Token::KeywordIf => self.parse_if(),
            Token::KeywordWhile => self.parse_while(),
            Token::KeywordFor => self.parse_for(),
            Token::KeywordBreak => self.parse_loop_control(Stmt::Break),
            Token::KeywordContinue => self.parse_loop_control(Stmt::Continue),
            Token::KeywordImport => self.parse_import(),
            Token::LBrace => self.block_statement(),
            _ => self.parse_expression_statement(),
        };
        if statement.is_none() {
            self.synchronize();
        }
        statement
    }

    /// `var NAME : TYPE = EXPR ;`
    pub fn parse_var_decl(&mut self) -> Option<(VarDecl, Range<usize>)> {
        let start = self.bump().span;
        let (name, _) = self.expect_ident()?;
        self.expect(Token::Colon)?;
        let ty = self.expect_type()?;
        self.expect(Token::Assign)?;
        let value = self.parse_expression(Precedence::Lowest)?;
        let end = self.expect(Token::Semicolon)?;
        Some((VarDecl { name, ty, value }, start.start..end.end))
    }

    /// `NAME op EXPR` without the trailing separator.
    pub fn parse_assignment(&mut self) -> Option<(Assignment, Range<usize>)> {
        let (name, name_span) = self.expect_ident()?;
        let Some(op) = assign_op(&self.current.token) else {
            self.unexpected("assignment operator");
            return None;
        };
        self.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        let span = name_span.start..value.1.end;
        Some((Assignment { name, op, value }, span))
    }

    fn parse_assignment_statement(&mut self) -> Option<(Stmt, Range<usize>)> {
        let (assignment, mut span) = self.parse_assignment()?;
        if self.at(&Token::Semicolon) {
            span.end = self.bump().span.end;
        }
        Some((Stmt::Assignment(assignment), span))
    }

    fn parse_expression_statement(&mut self) -> Option<(Stmt, Range<usize>)> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        let mut span = expr.1.clone();
        if self.at(&Token::Semicolon) {
            span.end = self.bump().span.end;
        }
        Some((Stmt::Expression { expr }, span))
    }

    /// `return [EXPR] ;`
    fn parse_return(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let value = if self.at(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression(Precedence::Lowest)?)
        };
        let end = self.expect(Token::Semicolon)?;
        Some((Stmt::Return { value }, start.start..end.end))
    }

    /// `if EXPR { ... } [else { ... }]`
    fn parse_if(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let condition = self.parse_expression(Precedence::Lowest)?;
        let (then_block, mut span) = self.parse_block()?;
        let else_block = if self.eat(&Token::KeywordElse) {
            let (block, else_span) = self.parse_block()?;
            span = else_span;
            Some(block)
        } else {
            None
        };
        Some((
            Stmt::If {
                condition,
                then_block,
                else_block,
            },
            start.start..span.end,
        ))
    }

    /// `while EXPR { ... }`
    fn parse_while(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let condition = self.parse_expression(Precedence::Lowest)?;
        let (body, span) = self.parse_block()?;
        Some((Stmt::While { condition, body }, start.start..span.end))
    }

    /// `for ( var NAME : TYPE = EXPR ; EXPR ; NAME op EXPR ) { ... }`
    fn parse_for(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        self.expect(Token::LParen)?;
        if !self.at(&Token::KeywordVar) {
            self.unexpected(&Token::KeywordVar.to_string());
            return None;
        }
        let init = self.parse_var_decl()?;
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(Token::Semicolon)?;
        let step = self.parse_assignment()?;
        self.expect(Token::RParen)?;
        let (body, span) = self.parse_block()?;
        Some((
            Stmt::For {
                init: Box::new(init),
                condition,
                step: Box::new(step),
                body,
            },
            start.start..span.end,
        ))
    }

    /// `break ;` / `continue ;`
    fn parse_loop_control(&mut self, statement: Stmt) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let end = self.expect(Token::Semicolon)?;
        Some((statement, start.start..end.end))
    }

    /// `import "path" ;`
    fn parse_import(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let path = if let Token::Str(path) = &self.current.token {
            path.clone()
        } else {
            self.unexpected("string literal");
            return None;
        };
        self.advance();
        let end = self.expect(Token::Semicolon)?;
        Some((Stmt::Import { path }, start.start..end.end))
    }
}
