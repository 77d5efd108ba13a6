use crate::ast::{FunctionDecl, Stmt};
use crate::lexer::Token;
use crate::parser::Parser;

use std::ops::Range;

pub fn function_syntax() -> String {
    "\
The syntax for declaring a function is:
    def function_name(arg1: type1, arg2: type2, ...) -> return_type { ... }"
        .to_string()
}

impl Parser<'_> {
    /// `def NAME ( PARAMS ) -> TYPE { ... }`
    pub fn parse_function(&mut self) -> Option<(Stmt, Range<usize>)> {
        let mark = self.errors.len();
        let parsed = self.parse_function_inner();
        if parsed.is_none() {
            self.annotate_since(mark, &function_syntax());
        }
        parsed
    }

    fn parse_function_inner(&mut self) -> Option<(Stmt, Range<usize>)> {
        let start = self.bump().span;
        let (name, _) = self.expect_ident()?;
        self.expect(Token::LParen)?;

        let mut params = vec![];
        if !self.eat(&Token::RParen) {
            loop {
                let (param, param_span) = self.expect_ident()?;
                self.expect(Token::Colon)?;
                let (ty, ty_span) = self.expect_type()?;
                params.push((param, ty, param_span.start..ty_span.end));
                if !self.eat(&Token::Comma) {
                    self.expect(Token::RParen)?;
                    break;
                }
            }
        }

        self.expect(Token::Arrow)?;
        let return_type = self.expect_type()?;
        let (body, span) = self.parse_block()?;

        Some((
            Stmt::FunctionDecl(FunctionDecl {
                name,
                params,
                return_type,
                body,
            }),
            start.start..span.end,
        ))
    }
}
