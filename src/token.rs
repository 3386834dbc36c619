use std::collections::HashMap;
use std::sync::OnceLock;

use crate::intern::Symbol;

/// Byte range of a lexeme plus the 1-based line/column where it starts.
/// Every token and AST node carries one; diagnostics render against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Span { start, end, line, column }
    }

    /// Width of the underline a diagnostic draws for this span.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Span {
    fn default() -> Self {
        Span { start: 0, end: 0, line: 1, column: 1 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenCategory {
    Service,
    Literal,
    Operator,
    Keyword,
    Paren,
    Delimiter,
    DataType,
    Modifier,
}

/// Primitive type annotations as they appear in source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int,
    Uint,
    Short,
    Ushort,
    Long,
    Ulong,
    Float,
    Decimal,
    Str,
    Char,
    Bool,
    Void,
    Any,
}

impl DataType {
    pub fn name(self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Uint => "uint",
            DataType::Short => "short",
            DataType::Ushort => "ushort",
            DataType::Long => "long",
            DataType::Ulong => "ulong",
            DataType::Float => "float",
            DataType::Decimal => "decimal",
            DataType::Str => "str",
            DataType::Char => "char",
            DataType::Bool => "bool",
            DataType::Void => "void",
            DataType::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Var,
    Const,
    Final,
    Static,
}

impl Modifier {
    pub fn name(self) -> &'static str {
        match self {
            Modifier::Var => "var",
            Modifier::Const => "const",
            Modifier::Final => "final",
            Modifier::Static => "static",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Service
    Illegal,
    Eof,

    // Literals (the raw text is the token's lexeme)
    Ident,
    Number,
    Float,
    Hex,
    Bin,
    Str,
    CharLit,
    True,
    False,
    Null,
    Infinity,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    Eq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Not,
    Increment,
    Decrement,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    Range,
    Arrow,

    // Parens
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    // Keywords
    If,
    Elif,
    Else,
    For,
    Do,
    While,
    Func,
    Struct,
    Enum,
    Union,
    Match,
    Case,
    Default,
    Return,
    Break,
    Continue,
    Trait,
    Impl,
    SelfKw,
    Import,
    Module,
    Type,
    Try,
    Catch,
    Finally,
    Async,
    Await,
    Yield,
    Test,
    Assert,
    Verify,
    Where,
    Solve,
    Snapshot,
    Rollback,
    Commit,
    Fork,
    Branch,
    Merge,
    Revert,
    Push,
    Pull,
    Clone,
    Simulate,
    Scenarios,
    Choose,
    NameOf,
    TypeOf,

    // Typed categories
    DataType(DataType),
    Modifier(Modifier),
}

impl TokenKind {
    pub fn category(self) -> TokenCategory {
        use TokenKind::*;
        match self {
            Illegal | Eof => TokenCategory::Service,

            Ident | Number | Float | Hex | Bin | Str | CharLit | True | False | Null
            | Infinity => TokenCategory::Literal,

            Plus | Minus | Star | Slash | Percent | Assign | PlusAssign | MinusAssign
            | StarAssign | SlashAssign | PercentAssign | Eq | NotEq | Lt | Gt | LtEq
            | GtEq | AndAnd | OrOr | Not | Increment | Decrement | Dot | Comma | Colon
            | Semicolon | Question | Range | Arrow => TokenCategory::Operator,

            LParen | RParen | LBrace | RBrace | LBracket | RBracket => TokenCategory::Paren,

            DataType(_) => TokenCategory::DataType,
            Modifier(_) => TokenCategory::Modifier,

            _ => TokenCategory::Keyword,
        }
    }

    pub fn is_eof(self) -> bool {
        self == TokenKind::Eof
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: Symbol,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Symbol, span: Span) -> Self {
        Token { kind, lexeme, span }
    }

    pub fn eof(span: Span) -> Self {
        Token { kind: TokenKind::Eof, lexeme: Symbol::EMPTY, span }
    }
}

/// Word-shaped lexemes: keywords, data types, modifiers, and the literal
/// keywords. The lexer consults this after reading an identifier run.
pub const WORD_LEXEMES: &[(&str, TokenKind)] = &[
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("for", TokenKind::For),
    ("do", TokenKind::Do),
    ("while", TokenKind::While),
    ("func", TokenKind::Func),
    ("struct", TokenKind::Struct),
    ("enum", TokenKind::Enum),
    ("union", TokenKind::Union),
    ("match", TokenKind::Match),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("return", TokenKind::Return),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("trait", TokenKind::Trait),
    ("impl", TokenKind::Impl),
    ("self", TokenKind::SelfKw),
    ("import", TokenKind::Import),
    ("module", TokenKind::Module),
    ("type", TokenKind::Type),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("finally", TokenKind::Finally),
    ("async", TokenKind::Async),
    ("await", TokenKind::Await),
    ("yield", TokenKind::Yield),
    ("test", TokenKind::Test),
    ("assert", TokenKind::Assert),
    ("verify", TokenKind::Verify),
    ("where", TokenKind::Where),
    ("solve", TokenKind::Solve),
    ("snapshot", TokenKind::Snapshot),
    ("rollback", TokenKind::Rollback),
    ("commit", TokenKind::Commit),
    ("fork", TokenKind::Fork),
    ("branch", TokenKind::Branch),
    ("merge", TokenKind::Merge),
    ("revert", TokenKind::Revert),
    ("push", TokenKind::Push),
    ("pull", TokenKind::Pull),
    ("clone", TokenKind::Clone),
    ("simulate", TokenKind::Simulate),
    ("scenarios", TokenKind::Scenarios),
    ("choose", TokenKind::Choose),
    ("nameof", TokenKind::NameOf),
    ("typeof", TokenKind::TypeOf),
    ("int", TokenKind::DataType(DataType::Int)),
    ("uint", TokenKind::DataType(DataType::Uint)),
    ("short", TokenKind::DataType(DataType::Short)),
    ("ushort", TokenKind::DataType(DataType::Ushort)),
    ("long", TokenKind::DataType(DataType::Long)),
    ("ulong", TokenKind::DataType(DataType::Ulong)),
    ("float", TokenKind::DataType(DataType::Float)),
    ("decimal", TokenKind::DataType(DataType::Decimal)),
    ("str", TokenKind::DataType(DataType::Str)),
    ("char", TokenKind::DataType(DataType::Char)),
    ("bool", TokenKind::DataType(DataType::Bool)),
    ("void", TokenKind::DataType(DataType::Void)),
    ("any", TokenKind::DataType(DataType::Any)),
    ("var", TokenKind::Modifier(Modifier::Var)),
    ("const", TokenKind::Modifier(Modifier::Const)),
    ("final", TokenKind::Modifier(Modifier::Final)),
    ("static", TokenKind::Modifier(Modifier::Static)),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("infinity", TokenKind::Infinity),
];

/// Two-character operators, tried before the single-character fallback.
pub const TWO_CHAR_OPERATORS: &[(&str, TokenKind)] = &[
    ("++", TokenKind::Increment),
    ("--", TokenKind::Decrement),
    ("==", TokenKind::Eq),
    ("!=", TokenKind::NotEq),
    ("+=", TokenKind::PlusAssign),
    ("-=", TokenKind::MinusAssign),
    ("*=", TokenKind::StarAssign),
    ("/=", TokenKind::SlashAssign),
    ("%=", TokenKind::PercentAssign),
    ("&&", TokenKind::AndAnd),
    ("||", TokenKind::OrOr),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
    ("..", TokenKind::Range),
    ("->", TokenKind::Arrow),
];

pub fn single_char_operator(byte: u8) -> Option<TokenKind> {
    let kind = match byte {
        b'+' => TokenKind::Plus,
        b'-' => TokenKind::Minus,
        b'*' => TokenKind::Star,
        b'/' => TokenKind::Slash,
        b'%' => TokenKind::Percent,
        b'=' => TokenKind::Assign,
        b'!' => TokenKind::Not,
        b'<' => TokenKind::Lt,
        b'>' => TokenKind::Gt,
        b'.' => TokenKind::Dot,
        b',' => TokenKind::Comma,
        b':' => TokenKind::Colon,
        b';' => TokenKind::Semicolon,
        b'?' => TokenKind::Question,
        _ => return None,
    };
    Some(kind)
}

pub fn paren_kind(byte: u8) -> Option<TokenKind> {
    let kind = match byte {
        b'(' => TokenKind::LParen,
        b')' => TokenKind::RParen,
        b'{' => TokenKind::LBrace,
        b'}' => TokenKind::RBrace,
        b'[' => TokenKind::LBracket,
        b']' => TokenKind::RBracket,
        _ => return None,
    };
    Some(kind)
}

/// Recognizer for multi-character lexemes. Built once per process and
/// immutable afterwards; the lexer only reads it.
pub struct TokenTable {
    words: HashMap<&'static str, TokenKind>,
    operators: HashMap<&'static str, TokenKind>,
}

impl TokenTable {
    fn build() -> Self {
        TokenTable {
            words: WORD_LEXEMES.iter().copied().collect(),
            operators: TWO_CHAR_OPERATORS.iter().copied().collect(),
        }
    }

    pub fn global() -> &'static TokenTable {
        static TABLE: OnceLock<TokenTable> = OnceLock::new();
        TABLE.get_or_init(TokenTable::build)
    }

    pub fn lookup_word(&self, word: &str) -> Option<TokenKind> {
        self.words.get(word).copied()
    }

    pub fn lookup_operator(&self, op: &str) -> Option<TokenKind> {
        self.operators.get(op).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_len_matches_byte_range() {
        let span = Span::new(4, 10, 2, 3);
        assert_eq!(span.len(), 6);
        assert!(!span.is_empty());
    }

    #[test]
    fn default_span_starts_at_line_one() {
        let span = Span::default();
        assert_eq!(span.line, 1);
        assert_eq!(span.column, 1);
        assert!(span.is_empty());
    }

    #[test]
    fn keyword_lexemes_are_keyword_category() {
        assert_eq!(TokenKind::If.category(), TokenCategory::Keyword);
        assert_eq!(TokenKind::Match.category(), TokenCategory::Keyword);
        assert_eq!(TokenKind::NameOf.category(), TokenCategory::Keyword);
    }

    #[test]
    fn categories_partition_the_kind_space() {
        assert_eq!(TokenKind::Eof.category(), TokenCategory::Service);
        assert_eq!(TokenKind::Number.category(), TokenCategory::Literal);
        assert_eq!(TokenKind::PlusAssign.category(), TokenCategory::Operator);
        assert_eq!(TokenKind::LBrace.category(), TokenCategory::Paren);
        assert_eq!(
            TokenKind::DataType(DataType::Int).category(),
            TokenCategory::DataType
        );
        assert_eq!(
            TokenKind::Modifier(Modifier::Const).category(),
            TokenCategory::Modifier
        );
    }

    #[test]
    fn word_table_has_no_duplicate_lexemes() {
        let mut seen = std::collections::HashSet::new();
        for (lexeme, _) in WORD_LEXEMES {
            assert!(seen.insert(*lexeme), "duplicate word lexeme {:?}", lexeme);
        }
    }

    #[test]
    fn operator_table_entries_are_two_bytes() {
        for (lexeme, kind) in TWO_CHAR_OPERATORS {
            assert_eq!(lexeme.len(), 2, "{:?}", lexeme);
            assert_eq!(kind.category(), TokenCategory::Operator);
        }
    }

    #[test]
    fn global_table_resolves_all_static_entries() {
        let table = TokenTable::global();
        for (lexeme, kind) in WORD_LEXEMES {
            assert_eq!(table.lookup_word(lexeme), Some(*kind));
        }
        for (lexeme, kind) in TWO_CHAR_OPERATORS {
            assert_eq!(table.lookup_operator(lexeme), Some(*kind));
        }
    }

    #[test]
    fn global_table_rejects_unknown_words() {
        let table = TokenTable::global();
        assert_eq!(table.lookup_word("banana"), None);
        assert_eq!(table.lookup_operator("**"), None);
    }

    #[test]
    fn literal_keywords_classify_as_literals() {
        let table = TokenTable::global();
        assert_eq!(table.lookup_word("true"), Some(TokenKind::True));
        assert_eq!(TokenKind::True.category(), TokenCategory::Literal);
        assert_eq!(TokenKind::Null.category(), TokenCategory::Literal);
    }

    #[test]
    fn single_char_operator_covers_punctuation() {
        assert_eq!(single_char_operator(b'+'), Some(TokenKind::Plus));
        assert_eq!(single_char_operator(b';'), Some(TokenKind::Semicolon));
        assert_eq!(single_char_operator(b'@'), None);
    }

    #[test]
    fn paren_kind_maps_all_six() {
        assert_eq!(paren_kind(b'('), Some(TokenKind::LParen));
        assert_eq!(paren_kind(b']'), Some(TokenKind::RBracket));
        assert_eq!(paren_kind(b'x'), None);
    }
}
