use crate::ast::{BinOp, Expr, UnOp};
use crate::lexer::Token;
use crate::parser::{ParseError, Parser};

use std::ops::Range;

/// Binding strength, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Exponent,
    Prefix,
    Call,
}

/// Precedence of `token` when it appears after an operand.
pub fn infix_precedence(token: &Token) -> Precedence {
    match token {
        Token::Eq | Token::NotEq => Precedence::Equals,
        Token::Less | Token::Greater | Token::LessEq | Token::GreaterEq => Precedence::LessGreater,
        Token::Plus | Token::Minus => Precedence::Sum,
        Token::Mul | Token::Div | Token::Mod => Precedence::Product,
        Token::Pow => Precedence::Exponent,
        Token::LParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

fn binop(token: &Token) -> Option<BinOp> {
    Some(match token {
        Token::Plus => BinOp::Add,
        Token::Minus => BinOp::Sub,
        Token::Mul => BinOp::Mul,
        Token::Div => BinOp::Div,
        Token::Mod => BinOp::Mod,
        Token::Pow => BinOp::Power,
        Token::Eq => BinOp::Eq,
        Token::NotEq => BinOp::NotEq,
        Token::Less => BinOp::Less,
        Token::Greater => BinOp::Greater,
        Token::LessEq => BinOp::LessEq,
        Token::GreaterEq => BinOp::GreaterEq,
        _ => return None,
    })
}

fn has_prefix_rule(token: &Token) -> bool {
    matches!(
        token,
        Token::Int(_)
            | Token::Float(_)
            | Token::Str(_)
            | Token::Ident(_)
            | Token::KeywordTrue
            | Token::KeywordFalse
            | Token::LParen
            | Token::Minus
            | Token::Bang
    )
}

impl Parser<'_> {
    /// Precedence climbing: parse a prefix form, then fold infix operators
    /// binding tighter than `precedence` into it, left to right.
    pub fn parse_expression(&mut self, precedence: Precedence) -> Option<(Expr, Range<usize>)> {
        let mut left = self.parse_prefix()?;
        while precedence < infix_precedence(&self.current.token) {
            left = self.parse_infix(left)?;
        }
        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<(Expr, Range<usize>)> {
        if !has_prefix_rule(&self.current.token) {
            // leave the token in place so recovery can see `;` and `}`
            let err = match &self.current.token {
                Token::Unknown(text) => ParseError::UnknownToken {
                    text: text.clone(),
                    span: self.current.span.clone(),
                },
                other => ParseError::NoPrefixRule {
                    found: other.to_string(),
                    span: self.current.span.clone(),
                },
            };
            self.error(err);
            if matches!(self.current.token, Token::Unknown(_)) {
                self.advance();
            }
            return None;
        }

        let lexeme = self.bump();
        let span = lexeme.span;
        let expr = match lexeme.token {
            Token::Int(value) => Expr::Int { value },
            Token::Float(value) => Expr::Float { value },
            Token::Str(value) => Expr::Str { value },
            Token::KeywordTrue => Expr::Bool { value: true },
            Token::KeywordFalse => Expr::Bool { value: false },
            Token::Ident(name) => Expr::Identifier { name },

            Token::LParen => {
                let (inner, _) = self.parse_expression(Precedence::Lowest)?;
                let close = self.expect(Token::RParen)?;
                return Some((inner, span.start..close.end));
            }

            Token::Minus => return self.parse_unary(UnOp::Minus, span),
            Token::Bang => return self.parse_unary(UnOp::Not, span),

            _ => unreachable!("checked by has_prefix_rule"),
        };
        Some((expr, span))
    }

    fn parse_unary(&mut self, operator: UnOp, span: Range<usize>) -> Option<(Expr, Range<usize>)> {
        let operand = self.parse_expression(Precedence::Prefix)?;
        let full = span.start..operand.1.end;
        Some((
            Expr::Prefix {
                operator,
                operand: Box::new(operand),
            },
            full,
        ))
    }

    fn parse_infix(&mut self, left: (Expr, Range<usize>)) -> Option<(Expr, Range<usize>)> {
        if self.at(&Token::LParen) {
            return self.parse_call(left);
        }

        let precedence = infix_precedence(&self.current.token);
        let operator = binop(&self.current.token)?;
        self.advance();
        let right = self.parse_expression(precedence)?;
        let span = left.1.start..right.1.end;
        Some((
            Expr::Infix {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        ))
    }

    fn parse_call(&mut self, callee: (Expr, Range<usize>)) -> Option<(Expr, Range<usize>)> {
        let (callee, callee_span) = callee;
        let name = match callee {
            Expr::Identifier { name } => name,
            other => {
                self.error(ParseError::InvalidCallee {
                    found: other.to_string(),
                    span: callee_span,
                });
                return None;
            }
        };

        self.advance(); // '('
        let mut args = vec![];
        let close = if self.at(&Token::RParen) {
            self.bump().span
        } else {
            loop {
                args.push(self.parse_expression(Precedence::Lowest)?);
                if !self.eat(&Token::Comma) {
                    break self.expect(Token::RParen)?;
                }
            }
        };

        Some((Expr::Call { callee: name, args }, callee_span.start..close.end))
    }
}
