//! Control-flow statement parsing: branches, loops, match, try/catch, and
//! the jump statements.

use crate::ast::NodeKind;
use crate::diag::DiagCode;
use crate::token::TokenKind;

use super::{DeclParsing, ExprParsing, Parsed, Parser};

pub trait StmtParsing<'a> {
    fn parse_if(&mut self) -> Parsed<'a>;
    fn parse_while(&mut self) -> Parsed<'a>;
    fn parse_for(&mut self) -> Parsed<'a>;
    fn parse_match(&mut self) -> Parsed<'a>;
    fn parse_try_catch(&mut self) -> Parsed<'a>;
    fn parse_return(&mut self) -> Parsed<'a>;
    fn parse_break(&mut self) -> Parsed<'a>;
    fn parse_continue(&mut self) -> Parsed<'a>;
}

impl<'a, 'src, 'sess> Parser<'a, 'src, 'sess> {
    /// `'(' expr ')'` as used by if/while/elif heads.
    fn parse_condition(&mut self) -> Parsed<'a> {
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }
        let cond = self.parse_expr(0)?;
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }
        Some(cond)
    }
}

impl<'a, 'src, 'sess> StmtParsing<'a> for Parser<'a, 'src, 'sess> {
    fn parse_if(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // if

        let cond = self.parse_condition()?;
        let then_block = self.parse_block_or_statement()?;

        let mut elifs = Vec::new();
        while self.check(TokenKind::Elif) {
            let estart = self.current_span();
            self.advance();
            let econd = self.parse_condition()?;
            let ebody = self.parse_block_or_statement()?;
            let espan = self.span_since(estart);
            elifs.push(self.alloc(
                NodeKind::If { cond: econd, then_block: ebody, elifs: &[], else_block: None },
                espan,
            ));
        }

        let else_block = if self.accept(TokenKind::Else) {
            Some(self.parse_block_or_statement()?)
        } else {
            None
        };

        let span = self.span_since(start);
        let elifs = self.ast().alloc_list(elifs);
        Some(self.alloc(NodeKind::If { cond, then_block, elifs, else_block }, span))
    }

    fn parse_while(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // while
        let cond = self.parse_condition()?;
        let body = self.parse_block_or_statement()?;
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::While { cond, body }, span))
    }

    fn parse_for(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // for
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }

        // All three slots are optional; the semicolons are not.
        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if matches!(self.current_token().kind, TokenKind::Modifier(_)) {
            Some(self.parse_var_decl()?)
        } else {
            Some(self.parse_expr(0)?)
        };
        if !self.expect(TokenKind::Semicolon, DiagCode::ExpectedDelimiter) {
            return None;
        }

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        if !self.expect(TokenKind::Semicolon, DiagCode::ExpectedDelimiter) {
            return None;
        }

        let step = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr(0)?)
        };
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }

        let body = self.parse_block_or_statement()?;
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::For { init, cond, step, body }, span))
    }

    fn parse_match(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // match

        let target = self.parse_expr(2)?;
        if !self.expect(TokenKind::LBrace, DiagCode::ExpectedParen) {
            return None;
        }

        let mut cases = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                self.error(DiagCode::ExpectedParen);
                return None;
            }
            if self.check(TokenKind::Comma) || self.check(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let cstart = self.current_span();
            let cond = self.parse_expr(2)?;
            if !self.expect(TokenKind::Arrow, DiagCode::ExpectedOperator) {
                return None;
            }
            let body = self.parse_block_or_statement()?;
            let cspan = self.span_since(cstart);
            cases.push(self.alloc(NodeKind::Case { cond, body }, cspan));
        }
        self.advance(); // }

        let span = self.span_since(start);
        let cases = self.ast().alloc_list(cases);
        Some(self.alloc(NodeKind::Match { target, cases }, span))
    }

    fn parse_try_catch(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // try

        let try_block = self.parse_block()?;

        if !self.expect(TokenKind::Catch, DiagCode::ExpectedKeyword) {
            return None;
        }
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }
        let catch_name = if self.check(TokenKind::Ident) {
            let name = self.current_token().lexeme;
            self.advance();
            Some(name)
        } else {
            None
        };
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }
        let catch_block = self.parse_block()?;

        let finally_block = if self.accept(TokenKind::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        let span = self.span_since(start);
        Some(self.alloc(
            NodeKind::TryCatch { try_block, catch_name, catch_block, finally_block },
            span,
        ))
    }

    fn parse_return(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // return

        let value = if matches!(
            self.current_token().kind,
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            None
        } else {
            Some(self.parse_expr(2)?)
        };

        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Return { value }, span))
    }

    fn parse_break(&mut self) -> Parsed<'a> {
        let span = self.current_span();
        self.advance();
        Some(self.alloc(NodeKind::Break, span))
    }

    fn parse_continue(&mut self) -> Parsed<'a> {
        let span = self.current_span();
        self.advance();
        Some(self.alloc(NodeKind::Continue, span))
    }
}
