//! Byte-level scanner for Breadcrumb source. One token per call, full
//! line/column tracking, and recovery on every error path: the lexer always
//! emits its best-guess token and keeps going.

use crate::diag::{DiagCode, Diagnostics};
use crate::intern::Interner;
use crate::token::{paren_kind, single_char_operator, Span, Token, TokenKind, TokenTable};

const OPERATOR_BYTES: &[u8] = b"+-*/%=!<>&|.,:;?";

pub struct Lexer<'src> {
    input: &'src [u8],
    pos: usize,
    ch: u8,
    line: usize,
    column: usize,
    paren_balance: usize,
    table: &'static TokenTable,
    eof_emitted: bool,
}

/// Start-of-token bookmark used to build spans.
#[derive(Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src [u8]) -> Self {
        Lexer {
            input,
            pos: 0,
            ch: input.first().copied().unwrap_or(0),
            line: 1,
            column: 1,
            paren_balance: 0,
            table: TokenTable::global(),
            eof_emitted: false,
        }
    }

    pub fn from_str(input: &'src str) -> Self {
        Self::new(input.as_bytes())
    }

    /// Drains the input, returning every token up to and including `Eof`.
    pub fn tokenize(&mut self, interner: &mut Interner, diags: &mut Diagnostics) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(interner, diags);
            let done = token.kind.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    pub fn next_token(&mut self, interner: &mut Interner, diags: &mut Diagnostics) -> Token {
        loop {
            self.skip_whitespace();
            if self.ch == b'#' {
                self.skip_comment();
                continue;
            }
            break;
        }

        let mark = self.mark();
        match self.ch {
            0 => self.emit_eof(diags, mark),
            b'"' | b'\'' => self.lex_string(interner, diags, mark),
            ch if OPERATOR_BYTES.contains(&ch) => self.lex_operator(interner, mark),
            b'(' | b')' | b'{' | b'}' | b'[' | b']' => self.lex_paren(interner, diags, mark),
            ch if ch.is_ascii_digit() => self.lex_number(interner, diags, mark),
            ch if ch.is_ascii_alphabetic() || ch == b'_' => self.lex_word(interner, mark),
            _ => self.lex_illegal_run(interner, diags, mark),
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
        if self.pos >= self.input.len() {
            self.pos = self.input.len();
            self.ch = 0;
        } else {
            self.ch = self.input[self.pos];
            self.column += 1;
        }
    }

    fn peek(&self) -> u8 {
        self.input.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn mark(&self) -> Mark {
        Mark { pos: self.pos, line: self.line, column: self.column }
    }

    fn span_from(&self, mark: Mark) -> Span {
        Span::new(mark.pos, self.pos, mark.line, mark.column)
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.ch {
                b' ' | b'\t' | b'\r' => self.advance(),
                b'\n' => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                _ => return,
            }
        }
    }

    fn skip_comment(&mut self) {
        while self.ch != b'\n' && self.ch != 0 {
            self.advance();
        }
    }

    fn emit_eof(&mut self, diags: &mut Diagnostics, mark: Mark) -> Token {
        if self.paren_balance != 0 && !self.eof_emitted {
            diags.error(
                DiagCode::UnmatchedParen,
                Span::new(self.pos, self.pos + 1, self.line, self.column),
            );
        }
        self.eof_emitted = true;
        Token::eof(self.span_from(mark))
    }

    fn lex_operator(&mut self, interner: &mut Interner, mark: Mark) -> Token {
        let current = self.ch;
        let next = self.peek();

        if next != 0 {
            let pair = [current, next];
            // The two-byte operator set is pure ASCII, so this is infallible.
            if let Ok(text) = std::str::from_utf8(&pair) {
                if let Some(kind) = self.table.lookup_operator(text) {
                    self.advance();
                    self.advance();
                    let lexeme = interner.intern(text);
                    return Token::new(kind, lexeme, self.span_from(mark));
                }
            }
        }

        self.advance();
        let lexeme = interner.intern(std::str::from_utf8(&[current]).unwrap_or(""));
        match single_char_operator(current) {
            Some(kind) => Token::new(kind, lexeme, self.span_from(mark)),
            // Lone `&` or `|`: no single-char meaning in the language.
            None => Token::new(TokenKind::Illegal, lexeme, self.span_from(mark)),
        }
    }

    fn lex_paren(&mut self, interner: &mut Interner, diags: &mut Diagnostics, mark: Mark) -> Token {
        let byte = self.ch;
        match byte {
            b'(' | b'{' | b'[' => self.paren_balance += 1,
            _ => {
                if self.paren_balance == 0 {
                    diags.error(
                        DiagCode::UnmatchedParen,
                        Span::new(self.pos, self.pos + 1, self.line, self.column),
                    );
                } else {
                    self.paren_balance -= 1;
                }
            }
        }

        let kind = paren_kind(byte).unwrap_or(TokenKind::Illegal);
        self.advance();
        let lexeme = interner.intern(std::str::from_utf8(&[byte]).unwrap_or(""));
        Token::new(kind, lexeme, self.span_from(mark))
    }

    fn lex_word(&mut self, interner: &mut Interner, mark: Mark) -> Token {
        while self.ch.is_ascii_alphanumeric() || self.ch == b'_' {
            self.advance();
        }
        let text = self.slice(mark.pos, self.pos);
        let kind = self.table.lookup_word(&text).unwrap_or(TokenKind::Ident);
        let lexeme = interner.intern(&text);
        Token::new(kind, lexeme, self.span_from(mark))
    }

    fn lex_number(&mut self, interner: &mut Interner, diags: &mut Diagnostics, mark: Mark) -> Token {
        let mut is_hex = false;
        let mut is_bin = false;
        let mut is_float = false;

        if self.ch == b'0' {
            match self.peek() {
                b'x' => {
                    self.advance();
                    self.advance();
                    is_hex = true;
                }
                b'b' => {
                    self.advance();
                    self.advance();
                    is_bin = true;
                }
                _ => {}
            }
        }

        loop {
            let ch = self.ch;
            let accept = if is_hex {
                ch.is_ascii_hexdigit()
            } else if is_bin {
                ch == b'0' || ch == b'1'
            } else if ch == b'.' && !is_float {
                is_float = true;
                true
            } else {
                ch.is_ascii_digit()
            };
            if !accept {
                break;
            }
            self.advance();
        }

        // `42abc` is one bad literal, not a number followed by a name.
        if !is_hex && !is_bin && (self.ch.is_ascii_alphabetic() || self.ch == b'_') {
            while self.ch.is_ascii_alphanumeric() || self.ch == b'_' {
                self.advance();
            }
            let span = self.span_from(mark);
            diags.error(DiagCode::InvalidLiteral, span);
            let lexeme = interner.intern(&self.slice(mark.pos, self.pos));
            return Token::new(TokenKind::Illegal, lexeme, span);
        }

        let text = self.slice(mark.pos, self.pos);
        let kind = if is_hex {
            TokenKind::Hex
        } else if is_bin {
            TokenKind::Bin
        } else if is_float {
            TokenKind::Float
        } else {
            TokenKind::Number
        };
        let lexeme = interner.intern(&text);
        Token::new(kind, lexeme, self.span_from(mark))
    }

    fn lex_string(&mut self, interner: &mut Interner, diags: &mut Diagnostics, mark: Mark) -> Token {
        let quote = self.ch;
        self.advance();

        let mut value: Vec<u8> = Vec::new();
        while self.ch != quote && self.ch != 0 {
            if self.ch == b'\\' {
                self.advance();
                value.push(self.read_escape(diags));
            } else {
                value.push(self.ch);
                self.advance();
            }
        }

        if self.ch != quote {
            diags.error(
                DiagCode::UnclosedString,
                Span::new(self.pos, self.pos + 1, self.line, self.column + 1),
            );
            let lexeme = interner.intern(&String::from_utf8_lossy(&value));
            return Token::new(TokenKind::Illegal, lexeme, self.span_from(mark));
        }

        self.advance();
        let kind = if quote == b'"' { TokenKind::Str } else { TokenKind::CharLit };
        let lexeme = interner.intern(&String::from_utf8_lossy(&value));
        Token::new(kind, lexeme, self.span_from(mark))
    }

    fn read_escape(&mut self, diags: &mut Diagnostics) -> u8 {
        let byte = match self.ch {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'"' => b'"',
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'0' => 0,
            other => {
                diags.warning(
                    DiagCode::InvalidEscapeSequence,
                    Span::new(self.pos, self.pos + 1, self.line, self.column),
                );
                other
            }
        };
        self.advance();
        byte
    }

    fn lex_illegal_run(&mut self, interner: &mut Interner, diags: &mut Diagnostics, mark: Mark) -> Token {
        while self.ch != 0 && !self.ch.is_ascii_alphanumeric() && !self.ch.is_ascii_whitespace() {
            self.advance();
        }
        let span = self.span_from(mark);
        diags.error(DiagCode::IllegalCharacter, span);
        let lexeme = interner.intern(&self.slice(mark.pos, self.pos));
        Token::new(TokenKind::Illegal, lexeme, span)
    }

    fn slice(&self, start: usize, end: usize) -> String {
        String::from_utf8_lossy(&self.input[start..end]).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Severity;
    use crate::token::{TokenCategory, TWO_CHAR_OPERATORS, WORD_LEXEMES};

    fn lex(source: &str) -> (Vec<Token>, Diagnostics, Interner) {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let mut lexer = Lexer::from_str(source);
        let tokens = lexer.tokenize(&mut interner, &mut diags);
        (tokens, diags, interner)
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn empty_input_yields_only_eof() {
        let (tokens, diags, _) = lex("");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
        assert!(diags.is_empty());
    }

    #[test]
    fn every_word_lexeme_round_trips_through_the_lexer() {
        for (lexeme, kind) in WORD_LEXEMES {
            let (tokens, diags, interner) = lex(lexeme);
            assert_eq!(tokens.len(), 2, "{}", lexeme);
            assert_eq!(tokens[0].kind, *kind, "{}", lexeme);
            assert_eq!(interner.resolve(tokens[0].lexeme), *lexeme);
            assert!(diags.is_empty(), "{}", lexeme);
        }
    }

    #[test]
    fn every_two_char_operator_round_trips_through_the_lexer() {
        for (lexeme, kind) in TWO_CHAR_OPERATORS {
            let (tokens, diags, interner) = lex(lexeme);
            assert_eq!(tokens[0].kind, *kind, "{}", lexeme);
            assert_eq!(interner.resolve(tokens[0].lexeme), *lexeme);
            assert!(diags.is_empty(), "{}", lexeme);
        }
    }

    #[test]
    fn identifiers_intern_their_text() {
        let (tokens, _, interner) = lex("bread crumbs bread");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]
        );
        assert_eq!(tokens[0].lexeme, tokens[2].lexeme);
        assert_eq!(interner.resolve(tokens[1].lexeme), "crumbs");
    }

    #[test]
    fn underscore_starts_an_identifier() {
        let (tokens, _, interner) = lex("_hidden");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(interner.resolve(tokens[0].lexeme), "_hidden");
    }

    #[test]
    fn number_forms_classify_by_prefix_and_dot() {
        let (tokens, diags, _) = lex("42 3.14 0xff 0b1010");
        assert_eq!(
            kinds(&tokens),
            vec![
                TokenKind::Number,
                TokenKind::Float,
                TokenKind::Hex,
                TokenKind::Bin,
                TokenKind::Eof
            ]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn trailing_letters_on_a_number_are_one_invalid_literal() {
        let (tokens, diags, interner) = lex("42abc");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(interner.resolve(tokens[0].lexeme), "42abc");
        assert_eq!(diags.reports()[0].code, DiagCode::InvalidLiteral);
    }

    #[test]
    fn second_dot_ends_a_float() {
        let (tokens, _, interner) = lex("1.5.2");
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(interner.resolve(tokens[0].lexeme), "1.5");
    }

    #[test]
    fn string_literal_contents_exclude_quotes() {
        let (tokens, diags, interner) = lex("\"hello world\"");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(interner.resolve(tokens[0].lexeme), "hello world");
        assert!(diags.is_empty());
    }

    #[test]
    fn single_quotes_make_char_literals() {
        let (tokens, _, interner) = lex("'a'");
        assert_eq!(tokens[0].kind, TokenKind::CharLit);
        assert_eq!(interner.resolve(tokens[0].lexeme), "a");
    }

    #[test]
    fn standard_escapes_are_processed() {
        let (tokens, diags, interner) = lex(r#""line\none\ttab\\""#);
        assert_eq!(interner.resolve(tokens[0].lexeme), "line\none\ttab\\");
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_escape_warns_but_keeps_the_character() {
        let (tokens, diags, interner) = lex(r#""\q""#);
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(interner.resolve(tokens[0].lexeme), "q");
        assert_eq!(diags.reports()[0].code, DiagCode::InvalidEscapeSequence);
        assert_eq!(diags.reports()[0].severity, Severity::Warning);
    }

    #[test]
    fn unclosed_string_reports_past_the_last_column() {
        let (tokens, diags, _) = lex("var s = \"bread");
        assert_eq!(tokens[3].kind, TokenKind::Illegal);
        let report = diags.reports()[0];
        assert_eq!(report.code, DiagCode::UnclosedString);
        assert_eq!(report.span.column, 15);
    }

    #[test]
    fn non_ascii_bytes_in_strings_pass_through() {
        let (tokens, diags, interner) = lex("\"crème\"");
        assert_eq!(interner.resolve(tokens[0].lexeme), "crème");
        assert!(diags.is_empty());
    }

    #[test]
    fn comments_vanish_before_the_parser_sees_them() {
        let (tokens, diags, _) = lex("1 # the answer\n2");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn comment_at_eof_without_newline_terminates() {
        let (tokens, _, _) = lex("# only a comment");
        assert_eq!(kinds(&tokens), vec![TokenKind::Eof]);
    }

    #[test]
    fn line_and_column_track_across_newlines() {
        let (tokens, _, _) = lex("a\n  b\nc");
        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (2, 3));
        assert_eq!((tokens[2].span.line, tokens[2].span.column), (3, 1));
    }

    #[test]
    fn spans_cover_the_lexeme_bytes() {
        let (tokens, _, _) = lex("hello + 12");
        assert_eq!((tokens[0].span.start, tokens[0].span.end), (0, 5));
        assert_eq!((tokens[1].span.start, tokens[1].span.end), (6, 7));
        assert_eq!((tokens[2].span.start, tokens[2].span.end), (8, 10));
    }

    #[test]
    fn longest_match_wins_for_operators() {
        let (tokens, _, _) = lex("a<=b");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Ident, TokenKind::LtEq, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn adjacent_plus_signs_prefer_increment() {
        let (tokens, _, _) = lex("++ + +");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Increment, TokenKind::Plus, TokenKind::Plus, TokenKind::Eof]
        );
    }

    #[test]
    fn arrow_and_range_lex_as_units() {
        let (tokens, _, _) = lex("-> ..");
        assert_eq!(kinds(&tokens), vec![TokenKind::Arrow, TokenKind::Range, TokenKind::Eof]);
    }

    #[test]
    fn balanced_parens_report_nothing() {
        let (_, diags, _) = lex("func f() { [1, 2] }");
        assert!(diags.is_empty());
    }

    #[test]
    fn stray_closer_reports_unmatched_paren() {
        let (tokens, diags, _) = lex(")");
        assert_eq!(tokens[0].kind, TokenKind::RParen);
        assert_eq!(diags.reports()[0].code, DiagCode::UnmatchedParen);
    }

    #[test]
    fn unclosed_opener_reports_at_eof() {
        let (_, diags, _) = lex("( 1 + 2");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.reports()[0].code, DiagCode::UnmatchedParen);
    }

    #[test]
    fn closers_inside_strings_do_not_count() {
        let (_, diags, _) = lex("\")\"");
        assert!(diags.is_empty());
    }

    #[test]
    fn mixed_bracket_kinds_share_one_balance() {
        // The balance is a single counter, so mixed pairs still cancel.
        let (_, diags, _) = lex("( ]");
        assert!(diags.is_empty());
    }

    #[test]
    fn illegal_run_is_one_token_with_text_preserved() {
        let (tokens, diags, interner) = lex("@$");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(interner.resolve(tokens[0].lexeme), "@$");
        assert_eq!(diags.reports()[0].code, DiagCode::IllegalCharacter);
    }

    #[test]
    fn lone_ampersand_is_illegal_without_a_report() {
        let (tokens, diags, _) = lex("a & b");
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert!(diags.is_empty());
    }

    #[test]
    fn eof_repeats_without_duplicate_reports() {
        let mut interner = Interner::new();
        let mut diags = Diagnostics::new();
        let mut lexer = Lexer::from_str("(");
        let _ = lexer.next_token(&mut interner, &mut diags);
        let first_eof = lexer.next_token(&mut interner, &mut diags);
        let second_eof = lexer.next_token(&mut interner, &mut diags);
        assert!(first_eof.kind.is_eof());
        assert!(second_eof.kind.is_eof());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn modifiers_and_datatypes_keep_their_categories() {
        let (tokens, _, _) = lex("const x : int");
        assert_eq!(tokens[0].kind.category(), TokenCategory::Modifier);
        assert_eq!(tokens[2].kind.category(), TokenCategory::Operator);
        assert_eq!(tokens[3].kind.category(), TokenCategory::DataType);
    }
}
