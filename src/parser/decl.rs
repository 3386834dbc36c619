//! Declaration parsing: variables, functions, compound types, traits,
//! impls, imports, modules, and type aliases.

use crate::ast::NodeKind;
use crate::diag::DiagCode;
use crate::intern::Symbol;
use crate::token::{DataType, TokenKind};

use super::{ExprParsing, Parsed, Parser};

pub trait DeclParsing<'a> {
    fn parse_var_decl(&mut self) -> Parsed<'a>;
    fn parse_func(&mut self) -> Parsed<'a>;
    fn parse_struct(&mut self) -> Parsed<'a>;
    fn parse_union(&mut self) -> Parsed<'a>;
    fn parse_enum(&mut self) -> Parsed<'a>;
    fn parse_trait(&mut self) -> Parsed<'a>;
    fn parse_impl(&mut self) -> Parsed<'a>;
    fn parse_import(&mut self) -> Parsed<'a>;
    fn parse_module(&mut self) -> Parsed<'a>;
    fn parse_type_alias(&mut self) -> Parsed<'a>;
    fn parse_nameof(&mut self) -> Parsed<'a>;
    fn parse_typeof(&mut self) -> Parsed<'a>;
}

impl<'a, 'src, 'sess> Parser<'a, 'src, 'sess> {
    /// `IDENT` or report `code`.
    fn expect_ident(&mut self, code: DiagCode) -> Option<Symbol> {
        let token = self.current_token();
        if token.kind == TokenKind::Ident {
            self.advance();
            Some(token.lexeme)
        } else {
            self.error(code);
            None
        }
    }

    fn parse_datatype(&mut self) -> Option<DataType> {
        if let TokenKind::DataType(dt) = self.current_token().kind {
            self.advance();
            Some(dt)
        } else {
            self.error(DiagCode::ExpectedType);
            None
        }
    }

    /// `modifier? IDENT (':' datatype)? ('=' expr)?`. Whether at least one
    /// of annotation/initializer is present is the semantic pass's call.
    fn parse_var_like(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        let modifier = match self.current_token().kind {
            TokenKind::Modifier(m) => {
                self.advance();
                Some(m)
            }
            _ => None,
        };

        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;

        let declared = if self.accept(TokenKind::Colon) {
            Some(self.parse_datatype()?)
        } else {
            None
        };

        let init = if self.accept(TokenKind::Assign) {
            Some(self.parse_expr(2)?)
        } else {
            None
        };

        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Var { modifier, name, declared, init }, span))
    }

    /// `IDENT ':' datatype` inside a parameter list.
    fn parse_param(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        let token = self.current_token();
        if token.kind != TokenKind::Ident {
            self.error(DiagCode::ExpectedParam);
            return None;
        }
        self.advance();

        if !self.expect(TokenKind::Colon, DiagCode::ExpectedParam) {
            return None;
        }
        let declared = self.parse_datatype()?;

        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Param { name: token.lexeme, declared }, span))
    }

    /// Comma-separated members for struct/union bodies.
    fn parse_member_list(&mut self) -> Option<Vec<&'a crate::ast::Node<'a>>> {
        if !self.expect(TokenKind::LBrace, DiagCode::ExpectedParen) {
            return None;
        }
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                self.error(DiagCode::ExpectedParen);
                return None;
            }
            members.push(self.parse_var_like()?);
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RBrace, DiagCode::ExpectedParen) {
            return None;
        }
        Some(members)
    }
}

impl<'a, 'src, 'sess> DeclParsing<'a> for Parser<'a, 'src, 'sess> {
    fn parse_var_decl(&mut self) -> Parsed<'a> {
        self.parse_var_like()
    }

    fn parse_func(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // func

        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }

        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) {
            if self.check(TokenKind::Eof) {
                self.error(DiagCode::ExpectedParen);
                return None;
            }
            params.push(self.parse_param()?);
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }

        let ret = if self.accept(TokenKind::Colon) {
            Some(self.parse_datatype()?)
        } else {
            None
        };

        let body = self.parse_block()?;

        let span = self.span_since(start);
        let params = self.ast().alloc_list(params);
        Some(self.alloc(NodeKind::Func { name, params, ret, body }, span))
    }

    fn parse_struct(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // struct
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let members = self.parse_member_list()?;
        let span = self.span_since(start);
        let members = self.ast().alloc_list(members);
        Some(self.alloc(NodeKind::Struct { name, members }, span))
    }

    fn parse_union(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // union
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let members = self.parse_member_list()?;
        let span = self.span_since(start);
        let members = self.ast().alloc_list(members);
        Some(self.alloc(NodeKind::Union { name, members }, span))
    }

    fn parse_enum(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // enum
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;

        if !self.expect(TokenKind::LBrace, DiagCode::ExpectedParen) {
            return None;
        }
        let mut variants = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                self.error(DiagCode::ExpectedParen);
                return None;
            }
            let vstart = self.current_span();
            let vname = self.expect_ident(DiagCode::ExpectedIdentifier)?;
            let value = if self.accept(TokenKind::Assign) {
                Some(self.parse_expr(2)?)
            } else {
                None
            };
            let vspan = self.span_since(vstart);
            variants.push(self.alloc(NodeKind::EnumVariant { name: vname, value }, vspan));
            if !self.accept(TokenKind::Comma) {
                break;
            }
        }
        if !self.expect(TokenKind::RBrace, DiagCode::ExpectedParen) {
            return None;
        }

        let span = self.span_since(start);
        let variants = self.ast().alloc_list(variants);
        Some(self.alloc(NodeKind::Enum { name, variants }, span))
    }

    fn parse_trait(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // trait
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let body = self.parse_block()?;
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Trait { name, body }, span))
    }

    fn parse_impl(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // impl
        let trait_name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let target = if self.accept(TokenKind::For) {
            Some(self.expect_ident(DiagCode::ExpectedIdentifier)?)
        } else {
            None
        };
        let body = self.parse_block()?;
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Impl { trait_name, target, body }, span))
    }

    fn parse_import(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // import

        let mut path = vec![self.expect_ident(DiagCode::ExpectedIdentifier)?];
        while self.accept(TokenKind::Dot) {
            path.push(self.expect_ident(DiagCode::ExpectedIdentifier)?);
        }

        let span = self.span_since(start);
        let path = self.ast().alloc_syms(path);
        Some(self.alloc(NodeKind::Import { path }, span))
    }

    fn parse_module(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // module
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::Module { name, body }, span))
    }

    fn parse_type_alias(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // type
        let name = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::TypeAlias { name, body }, span))
    }

    fn parse_nameof(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // nameof
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }
        let content = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::NameOf { content }, span))
    }

    fn parse_typeof(&mut self) -> Parsed<'a> {
        let start = self.current_span();
        self.advance(); // typeof
        if !self.expect(TokenKind::LParen, DiagCode::ExpectedParen) {
            return None;
        }
        let content = self.expect_ident(DiagCode::ExpectedIdentifier)?;
        if !self.expect(TokenKind::RParen, DiagCode::ExpectedParen) {
            return None;
        }
        let span = self.span_since(start);
        Some(self.alloc(NodeKind::TypeOf { content }, span))
    }
}
