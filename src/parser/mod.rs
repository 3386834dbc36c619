//! Recursive-descent parser with Pratt expression climbing. Statement-level
//! grammar lives in [`decl`] and [`stmt`]; expressions in [`expr`]. Failures
//! report into the shared diagnostics table and return `None`; the caller
//! keeps parsing so one bad statement never hides the rest of the file.

mod decl;
mod expr;
mod stmt;


pub use decl::DeclParsing;
pub use expr::ExprParsing;
pub use stmt::StmtParsing;

use crate::ast::{AstContext, Node, NodeKind};
use crate::diag::{DiagCode, Diagnostics};
use crate::intern::Interner;
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};

/// `None` means the error is already in the diagnostics table.
pub type Parsed<'a> = Option<&'a Node<'a>>;

pub struct Parser<'a, 'src, 'sess> {
    lexer: Lexer<'src>,
    current: Token,
    next: Token,
    prev_span: Span,
    ctx: AstContext<'a>,
    interner: &'sess mut Interner,
    diags: &'sess mut Diagnostics,
}

impl<'a, 'src, 'sess> Parser<'a, 'src, 'sess> {
    pub fn new(
        source: &'src str,
        ctx: AstContext<'a>,
        interner: &'sess mut Interner,
        diags: &'sess mut Diagnostics,
    ) -> Self {
        let mut lexer = Lexer::from_str(source);
        let current = lexer.next_token(interner, diags);
        let next = lexer.next_token(interner, diags);
        Parser {
            lexer,
            current,
            next,
            prev_span: Span::default(),
            ctx,
            interner,
            diags,
        }
    }

    /// Parses statements until EOF into the root block.
    pub fn parse_program(&mut self) -> &'a Node<'a> {
        let start = self.current.span;
        let mut stmts = Vec::new();

        while !self.check(TokenKind::Eof) {
            if self.check(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let before = self.current.span.start;
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    // A failed statement that consumed nothing would loop
                    // forever; skip one token to guarantee progress.
                    if self.current.span.start == before && !self.check(TokenKind::Eof) {
                        self.advance();
                    }
                }
            }
        }

        self.ctx.block(stmts, self.span_since(start))
    }

    pub fn parse_statement(&mut self) -> Parsed<'a> {
        match self.current.kind {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Func => self.parse_func(),
            TokenKind::Struct => self.parse_struct(),
            TokenKind::Enum => self.parse_enum(),
            TokenKind::Union => self.parse_union(),
            TokenKind::Match => self.parse_match(),
            TokenKind::Trait => self.parse_trait(),
            TokenKind::Impl => self.parse_impl(),
            TokenKind::Try => self.parse_try_catch(),
            TokenKind::Import => self.parse_import(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Module => self.parse_module(),
            TokenKind::Type => self.parse_type_alias(),
            TokenKind::NameOf => self.parse_nameof(),
            TokenKind::TypeOf => self.parse_typeof(),
            TokenKind::Modifier(_) => self.parse_var_decl(),
            TokenKind::LBrace => self.parse_block(),
            kind if kind.category() == crate::token::TokenCategory::Keyword => {
                // Reserved keywords with no statement form yet (fork, solve,
                // simulate, ...). Report and let recovery skip them.
                self.diags.error(DiagCode::UnexpectedToken, self.current.span);
                None
            }
            _ => self.parse_expr(0),
        }
    }

    /// `{ stmt* }`. Statements that fail are skipped; a missing `}` at EOF
    /// reports and abandons the block.
    pub fn parse_block(&mut self) -> Parsed<'a> {
        let start = self.current.span;
        if !self.expect(TokenKind::LBrace, DiagCode::ExpectedParen) {
            return None;
        }

        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) {
            if self.check(TokenKind::Eof) {
                self.diags.error(DiagCode::ExpectedParen, self.current.span);
                return None;
            }
            if self.check(TokenKind::Semicolon) {
                self.advance();
                continue;
            }
            let before = self.current.span.start;
            match self.parse_statement() {
                Some(stmt) => stmts.push(stmt),
                None => {
                    if self.current.span.start == before && !self.check(TokenKind::Eof) {
                        self.advance();
                    }
                }
            }
        }
        self.advance(); // }

        Some(self.ctx.block(stmts, self.span_since(start)))
    }

    /// Either a braced block or a single statement (loop/branch bodies).
    pub(super) fn parse_block_or_statement(&mut self) -> Parsed<'a> {
        if self.check(TokenKind::LBrace) {
            self.parse_block()
        } else {
            self.parse_statement()
        }
    }

    // ------------------------------------------------------------------
    // Token plumbing
    // ------------------------------------------------------------------

    pub(super) fn advance(&mut self) {
        if self.current.kind.is_eof() {
            return;
        }
        self.prev_span = self.current.span;
        let incoming = self.lexer.next_token(&mut *self.interner, &mut *self.diags);
        self.current = std::mem::replace(&mut self.next, incoming);
    }

    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    pub(super) fn check_next(&self, kind: TokenKind) -> bool {
        self.next.kind == kind
    }

    /// Consumes the token if it matches.
    pub(super) fn accept(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the token or reports `code` at the current span.
    pub(super) fn expect(&mut self, kind: TokenKind, code: DiagCode) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            self.diags.error(code, self.current.span);
            false
        }
    }

    pub(super) fn current_token(&self) -> Token {
        self.current
    }

    pub(super) fn current_span(&self) -> Span {
        self.current.span
    }

    pub(super) fn ast(&self) -> AstContext<'a> {
        self.ctx
    }

    pub(super) fn error(&mut self, code: DiagCode) {
        self.diags.error(code, self.current.span);
    }

    /// Span from a statement's first token through the last consumed one.
    pub(super) fn span_since(&self, start: Span) -> Span {
        Span::new(
            start.start,
            self.prev_span.end.max(start.end),
            start.line,
            start.column,
        )
    }

    pub(super) fn alloc(&self, kind: NodeKind<'a>, span: Span) -> &'a Node<'a> {
        self.ctx.alloc(kind, span)
    }
}
