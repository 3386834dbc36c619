//! Pratt expression parsing: precedence climbing over a fixed table, with
//! prefix/postfix unary layers around the primaries.

use crate::ast::{BinOp, LitKind, NodeKind, UnaryOp};
use crate::diag::DiagCode;
use crate::token::{Span, TokenKind};

use super::{Parsed, Parser};

/// Binding power of an infix operator; 0 means "not an operator".
pub fn precedence(kind: TokenKind) -> u8 {
    use TokenKind::*;
    match kind {
        Increment | Decrement => 15,
        Star | Slash | Percent => 13,
        Plus | Minus => 12,
        Lt | Gt | LtEq | GtEq => 10,
        Eq | NotEq => 9,
        AndAnd => 5,
        OrOr => 4,
        Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign => 2,
        Comma => 1,
        _ => 0,
    }
}

pub fn is_right_associative(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Assign | PlusAssign | MinusAssign | StarAssign | SlashAssign | PercentAssign
    )
}

pub trait ExprParsing<'a> {
    /// Parses an expression whose operators all bind at least `min_prec`.
    fn parse_expr(&mut self, min_prec: u8) -> Parsed<'a>;
    fn parse_unary(&mut self) -> Parsed<'a>;
    fn parse_postfix(&mut self) -> Parsed<'a>;
    fn parse_primary(&mut self) -> Parsed<'a>;
    fn parse_call(&mut self) -> Parsed<'a>;
    fn parse_array(&mut self) -> Parsed<'a>;
}

impl<'a, 'src, 'sess> ExprParsing<'a> for Parser<'a, 'src, 'sess> {
    fn parse_expr(&mut self, min_prec: u8) -> Parsed<'a> {
        let mut left = self.parse_unary()?;

        loop {
            let kind = self.current_token().kind;
            let prec = precedence(kind);
            if prec == 0 || prec < min_prec {
                break;
            }
            // Comma is a separator, not an expression operator; postfix
            // increment/decrement are consumed by parse_postfix.
            if matches!(kind, TokenKind::Comma | TokenKind::Increment | TokenKind::Decrement) {
                break;
            }
            let Some(op) = BinOp::from_token(kind) else {
                break;
            };

            self.advance();
            let next_min = if is_right_associative(kind) { prec } else { prec + 1 };
            let right = self.parse_expr(next_min)?;

            let span = Span::new(
                left.span.start,
                right.span.end,
                left.span.line,
                left.span.column,
            );
            // Plain `x = v` gets its own node; compound forms stay binary so
            // the back-end sees the read-modify-write shape.
            left = match (op, &left.kind) {
                (BinOp::Assign, NodeKind::Ref { name }) => {
                    self.alloc(NodeKind::Assign { target: *name, value: right }, span)
                }
                _ => self.ast().binary(op, left, right, span),
            };
        }

        Some(left)
    }

    fn parse_unary(&mut self) -> Parsed<'a> {
        let token = self.current_token();
        if let Some(op) = UnaryOp::from_token(token.kind) {
            self.advance();
            let operand = self.parse_unary()?;
            let span = self.span_since(token.span);
            return Some(self.ast().unary(op, operand, false, span));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Parsed<'a> {
        let mut node = self.parse_primary()?;
        loop {
            let kind = self.current_token().kind;
            let op = match kind {
                TokenKind::Increment => UnaryOp::Increment,
                TokenKind::Decrement => UnaryOp::Decrement,
                _ => break,
            };
            self.advance();
            let span = self.span_since(node.span);
            node = self.ast().unary(op, node, true, span);
        }
        Some(node)
    }

    fn parse_primary(&mut self) -> Parsed<'a> {
        let token = self.current_token();
        match token.kind {
            TokenKind::Ident if self.check_next(TokenKind::LParen) => self.parse_call(),
            TokenKind::Ident => {
                self.advance();
                Some(self.ast().reference(token.lexeme, token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
                    return None;
                }
                Some(inner)
            }
            TokenKind::LBracket => self.parse_array(),
            kind => match LitKind::from_token(kind) {
                Some(lit) => {
                    self.advance();
                    Some(self.ast().literal(lit, token.lexeme, token.span))
                }
                None => {
                    self.error(DiagCode::ExpectedExpression);
                    None
                }
            },
        }
    }

    fn parse_call(&mut self) -> Parsed<'a> {
        let name_token = self.current_token();
        self.advance(); // callee
        self.advance(); // (

        let mut args = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr(2)?);
                if !self.accept(TokenKind::Comma) {
                    break;
                }
            }
        }
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }

        let span = self.span_since(name_token.span);
        let args = self.ast().alloc_list(args);
        Some(self.alloc(NodeKind::Call { callee: name_token.lexeme, args }, span))
    }

    fn parse_array(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // [

        let mut elems = Vec::new();
        while !self.check(TokenKind::RBracket) {
            if self.check(TokenKind::Eof) {
                self.error(DiagCode::ExpectedParen);
                return None;
            }
            elems.push(self.parse_expr(2)?);
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RBracket, DiagCode::ExpectedParen) {
            return None;
        }

        let span = self.span_since(start);
        let elems = self.ast().alloc_list(elems);
        Some(self.alloc(NodeKind::Array { elems }, span))
    }
}
