use crate::style::Style;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "NOTE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

/// Which stage of the pipeline produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Lexer,
    Parser,
    Semantic,
}

/// Every diagnostic the compiler can emit. Flat on purpose: codes are part
/// of the tool's output contract and get matched on by tests and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagCode {
    // Lexer
    IllegalCharacter,
    UnexpectedEof,
    InvalidLiteral,
    InvalidNumber,
    InvalidIdentifier,
    InvalidString,
    UnclosedString,
    UnmatchedParen,
    InvalidEscapeSequence,

    // Parser
    UnexpectedToken,
    InvalidExpression,
    InvalidUnaryOp,
    ExpectedExpression,
    ExpectedOperator,
    ExpectedIdentifier,
    ExpectedType,
    ExpectedParen,
    ExpectedKeyword,
    ExpectedDelimiter,
    ExpectedParam,

    // Semantic
    TypeMismatch,
    UndeclaredVariable,
    UndeclaredFunction,
    VariableAlreadyDeclared,
    FunctionAlreadyDeclared,
    FailedToDeclareVariable,
    FailedToDeclareFunction,
    InvalidOperation,
    InvalidFunctionCall,
    InvalidArgumentCount,
    InvalidArgumentType,
    InvalidReturnType,
    NotAFunction,
    ReturnOutsideFunction,
    BreakOutsideLoop,
    ContinueOutsideLoop,
    UnimplementedNode,
    VariableNoTypeOrInitializer,
}

impl DiagCode {
    pub fn message(self) -> &'static str {
        use DiagCode::*;
        match self {
            IllegalCharacter => "illegal character",
            UnexpectedEof => "unexpected end of file",
            InvalidLiteral => "invalid literal",
            InvalidNumber => "invalid number",
            InvalidIdentifier => "invalid identifier",
            InvalidString => "invalid string",
            UnclosedString => "unclosed string",
            UnmatchedParen => "unmatched parenthesis",
            InvalidEscapeSequence => "invalid escape sequence",

            UnexpectedToken => "unexpected token",
            InvalidExpression => "invalid expression",
            InvalidUnaryOp => "invalid unary operator",
            ExpectedExpression => "expected an expression",
            ExpectedOperator => "expected an operator",
            ExpectedIdentifier => "expected an identifier",
            ExpectedType => "expected a type",
            ExpectedParen => "expected a parenthesis",
            ExpectedKeyword => "expected a keyword",
            ExpectedDelimiter => "expected a delimiter",
            ExpectedParam => "expected a parameter",

            TypeMismatch => "type mismatch",
            UndeclaredVariable => "undeclared variable",
            UndeclaredFunction => "undeclared function",
            VariableAlreadyDeclared => "variable already declared",
            FunctionAlreadyDeclared => "function already declared",
            FailedToDeclareVariable => "failed to declare variable",
            FailedToDeclareFunction => "failed to declare function",
            InvalidOperation => "invalid operation",
            InvalidFunctionCall => "invalid function call",
            InvalidArgumentCount => "invalid argument count",
            InvalidArgumentType => "invalid argument type",
            InvalidReturnType => "invalid return type",
            NotAFunction => "not a function",
            ReturnOutsideFunction => "return outside function",
            BreakOutsideLoop => "break outside loop",
            ContinueOutsideLoop => "continue outside loop",
            UnimplementedNode => "unimplemented language construct",
            VariableNoTypeOrInitializer => "variable has no type or initializer",
        }
    }

    pub fn phase(self) -> Phase {
        use DiagCode::*;
        match self {
            IllegalCharacter | UnexpectedEof | InvalidLiteral | InvalidNumber
            | InvalidIdentifier | InvalidString | UnclosedString | UnmatchedParen
            | InvalidEscapeSequence => Phase::Lexer,

            UnexpectedToken | InvalidExpression | InvalidUnaryOp | ExpectedExpression
            | ExpectedOperator | ExpectedIdentifier | ExpectedType | ExpectedParen
            | ExpectedKeyword | ExpectedDelimiter | ExpectedParam => Phase::Parser,

            _ => Phase::Semantic,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Report {
    pub severity: Severity,
    pub code: DiagCode,
    pub span: Span,
}

impl Report {
    /// Renders one report against the source it was produced from:
    ///
    /// ```text
    ///    3 | var x : int = "hello"
    ///      | ~~~~~~~~~~~~~~~~~~~~~
    /// type mismatch
    /// [ERROR] demo.brc at 3:1
    /// ```
    pub fn display_with_source(&self, source: &str, path: &str) -> String {
        let line_text = source.lines().nth(self.span.line.saturating_sub(1)).unwrap_or("");
        let col = self.span.column.saturating_sub(1).min(line_text.len());
        let width = self.span.len();
        let underline = if width <= 1 {
            "^".to_string()
        } else {
            "~".repeat(width.min(line_text.len().saturating_sub(col).max(1)))
        };

        let gutter = Style::blue(&format!("{:4}", self.span.line));
        let pipe = Style::blue("|");
        let marker = Style::severity(self.severity, &underline);
        let label = Style::severity(self.severity, &format!("[{}]", self.severity.label()));

        format!(
            "{} {} {}\n     {} {}{}\n{}\n{} {} at {}:{}",
            gutter,
            pipe,
            line_text,
            pipe,
            " ".repeat(col),
            marker,
            self.code.message(),
            label,
            path,
            self.span.line,
            self.span.column,
        )
    }
}

/// Append-only report table shared by every pipeline stage. Reports are
/// rendered after the run, in insertion order; nothing is ever dropped.
#[derive(Default)]
pub struct Diagnostics {
    reports: Vec<Report>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, severity: Severity, code: DiagCode, span: Span) {
        self.reports.push(Report { severity, code, span });
    }

    pub fn error(&mut self, code: DiagCode, span: Span) {
        self.report(Severity::Error, code, span);
    }

    pub fn warning(&mut self, code: DiagCode, span: Span) {
        self.report(Severity::Warning, code, span);
    }

    pub fn note(&mut self, code: DiagCode, span: Span) {
        self.report(Severity::Note, code, span);
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.reports.iter().filter(|r| r.severity == Severity::Error).count()
    }

    /// All reports rendered in insertion order, blank-line separated.
    pub fn render(&self, source: &str, path: &str) -> String {
        self.reports
            .iter()
            .map(|r| r.display_with_source(source, path))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span_at(line: usize, column: usize, len: usize) -> Span {
        Span::new(0, len, line, column)
    }

    #[test]
    fn reports_accumulate_in_insertion_order() {
        let mut diags = Diagnostics::new();
        diags.error(DiagCode::TypeMismatch, span_at(1, 1, 3));
        diags.warning(DiagCode::InvalidEscapeSequence, span_at(2, 5, 1));
        assert_eq!(diags.len(), 2);
        assert_eq!(diags.reports()[0].code, DiagCode::TypeMismatch);
        assert_eq!(diags.reports()[1].code, DiagCode::InvalidEscapeSequence);
    }

    #[test]
    fn has_errors_ignores_warnings_and_notes() {
        let mut diags = Diagnostics::new();
        diags.warning(DiagCode::InvalidEscapeSequence, span_at(1, 1, 1));
        diags.note(DiagCode::UnimplementedNode, span_at(1, 1, 1));
        assert!(!diags.has_errors());
        diags.error(DiagCode::UndeclaredVariable, span_at(1, 1, 1));
        assert!(diags.has_errors());
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn every_code_has_a_message_and_phase() {
        use DiagCode::*;
        let all = [
            IllegalCharacter, UnexpectedEof, InvalidLiteral, InvalidNumber,
            InvalidIdentifier, InvalidString, UnclosedString, UnmatchedParen,
            InvalidEscapeSequence, UnexpectedToken, InvalidExpression, InvalidUnaryOp,
            ExpectedExpression, ExpectedOperator, ExpectedIdentifier, ExpectedType,
            ExpectedParen, ExpectedKeyword, ExpectedDelimiter, ExpectedParam,
            TypeMismatch, UndeclaredVariable, UndeclaredFunction,
            VariableAlreadyDeclared, FunctionAlreadyDeclared, FailedToDeclareVariable,
            FailedToDeclareFunction, InvalidOperation, InvalidFunctionCall,
            InvalidArgumentCount, InvalidArgumentType, InvalidReturnType, NotAFunction,
            ReturnOutsideFunction, BreakOutsideLoop, ContinueOutsideLoop,
            UnimplementedNode, VariableNoTypeOrInitializer,
        ];
        for code in all {
            assert!(!code.message().is_empty());
            let _ = code.phase();
        }
    }

    #[test]
    fn phases_follow_the_code_families() {
        assert_eq!(DiagCode::UnclosedString.phase(), Phase::Lexer);
        assert_eq!(DiagCode::ExpectedParen.phase(), Phase::Parser);
        assert_eq!(DiagCode::BreakOutsideLoop.phase(), Phase::Semantic);
    }

    #[test]
    fn single_column_span_renders_a_caret() {
        let report = Report {
            severity: Severity::Error,
            code: DiagCode::IllegalCharacter,
            span: Span::new(4, 5, 1, 5),
        };
        let out = report.display_with_source("var @ = 1", "bad.brc");
        assert!(out.contains('^'), "expected caret: {}", out);
        assert!(!out.contains('~'));
    }

    #[test]
    fn wide_span_renders_tildes_under_the_lexeme() {
        let report = Report {
            severity: Severity::Error,
            code: DiagCode::TypeMismatch,
            span: Span::new(14, 21, 1, 15),
        };
        let out = report.display_with_source("var x : int = \"hello\"", "bad.brc");
        assert!(out.contains("~~~~~~~"), "expected tildes: {}", out);
        assert!(out.contains("type mismatch"));
    }

    #[test]
    fn footer_names_file_line_and_column() {
        let report = Report {
            severity: Severity::Warning,
            code: DiagCode::InvalidEscapeSequence,
            span: Span::new(9, 10, 3, 2),
        };
        let out = report.display_with_source("a\nb\n \"\\q\"", "esc.brc");
        assert!(out.contains("[WARNING]"));
        assert!(out.contains("esc.brc at 3:2"));
    }

    #[test]
    fn render_joins_reports_with_blank_lines() {
        let mut diags = Diagnostics::new();
        diags.error(DiagCode::UndeclaredVariable, span_at(1, 1, 1));
        diags.error(DiagCode::UndeclaredVariable, span_at(1, 3, 1));
        let out = diags.render("x + y", "two.brc");
        assert_eq!(out.matches("undeclared variable").count(), 2);
        assert!(out.contains("\n\n"));
    }

    #[test]
    fn out_of_range_line_renders_without_panicking() {
        let report = Report {
            severity: Severity::Error,
            code: DiagCode::UnexpectedEof,
            span: Span::new(10, 10, 99, 1),
        };
        let out = report.display_with_source("short", "eof.brc");
        assert!(out.contains("unexpected end of file"));
    }
}
