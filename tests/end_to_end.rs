//! Whole-pipeline tests over the public API: source text in, diagnostics
//! and executed behavior out.

use crumb::compile::{compile_source, run_source};
use crumb::diag::{DiagCode, Severity};

fn run_value(source: &str) -> i64 {
    let outcome = run_source(source);
    assert!(
        !outcome.compile.diags.has_errors(),
        "unexpected errors for {:?}: {}",
        source,
        outcome.compile.render_diagnostics(source, "<test>")
    );
    outcome
        .result
        .expect("vm should not fault")
        .expect("program should leave a value")
}

#[test]
fn minimal_valid_program_is_clean() {
    let out = compile_source("func main() : int { return 0 }");
    assert!(out.ok);
    assert!(out.diags.is_empty());
}

#[test]
fn inferred_variable_is_clean() {
    let out = compile_source("var x = 42");
    assert!(out.ok);
    assert!(out.diags.is_empty());
}

#[test]
fn type_mismatch_reports_at_the_declaration() {
    let out = compile_source("var x : int = \"hello\"");
    assert!(!out.ok);
    let mismatches: Vec<_> = out
        .diags
        .reports()
        .iter()
        .filter(|r| r.code == DiagCode::TypeMismatch)
        .collect();
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].span.line, 1);
    assert_eq!(mismatches[0].span.column, 1);
    assert_eq!(mismatches[0].severity, Severity::Error);
}

#[test]
fn unclosed_string_points_past_the_input() {
    let out = compile_source("var s = \"bread");
    let report = out
        .diags
        .reports()
        .iter()
        .find(|r| r.code == DiagCode::UnclosedString)
        .expect("an unclosed string report");
    assert_eq!(report.span.line, 1);
    assert_eq!(report.span.column, 15);
}

#[test]
fn precedence_makes_multiplication_bind_tighter() {
    assert_eq!(run_value("1 + 2 * 3"), 7);
    assert_eq!(run_value("(1 + 2) * 3"), 9);
}

#[test]
fn break_outside_loop_is_one_diagnostic() {
    let out = compile_source("func f() { break }");
    assert_eq!(out.diags.len(), 1);
    assert_eq!(out.diags.reports()[0].code, DiagCode::BreakOutsideLoop);
}

#[test]
fn countdown_loop_terminates_with_the_right_total() {
    let source = "\
var total = 0
var n = 10
while (n > 0) {
    total += n
    n -= 1
}
total";
    assert_eq!(run_value(source), 55);
}

#[test]
fn for_loop_and_functions_compose() {
    let source = "\
func square(n : int) : int { return n * n }
var total = 0
for (var i = 1; i <= 4; i++) {
    total += square(i)
}
total";
    assert_eq!(run_value(source), 30);
}

#[test]
fn recursive_fibonacci_runs() {
    let source = "\
func fib(n : int) : int {
    if (n < 2) { return n }
    return fib(n - 1) + fib(n - 2)
}
fib(10)";
    assert_eq!(run_value(source), 55);
}

#[test]
fn mutual_recursion_resolves_forward() {
    let source = "\
func is_even(n : int) : int {
    if (n == 0) { return 1 }
    return is_odd(n - 1)
}
func is_odd(n : int) : int {
    if (n == 0) { return 0 }
    return is_even(n - 1)
}
is_even(10)";
    assert_eq!(run_value(source), 1);
}

#[test]
fn elif_ladder_selects_the_matching_branch() {
    let source = "\
func classify(n : int) : int {
    if (n < 0) { return 0 - 1 }
    elif (n == 0) { return 0 }
    elif (n < 10) { return 1 }
    else { return 2 }
}
classify(5) * 100 + classify(50)";
    assert_eq!(run_value(source), 102);
}

#[test]
fn comments_and_blank_lines_are_invisible() {
    let source = "\
# breadcrumb demo
var x = 40   # forty

# the answer needs two more
x + 2";
    assert_eq!(run_value(source), 42);
}

#[test]
fn hex_bin_and_char_literals_evaluate() {
    assert_eq!(run_value("0x10 + 0b110"), 22);
    assert_eq!(run_value("'A'"), 65);
}

#[test]
fn logical_operators_produce_bits() {
    assert_eq!(run_value("1 < 2 && 3 > 2"), 1);
    assert_eq!(run_value("1 > 2 || 0"), 0);
    assert_eq!(run_value("!(1 == 2)"), 1);
}

#[test]
fn modulo_works_in_expressions() {
    assert_eq!(run_value("var n = 17\nn % 5"), 2);
}

#[test]
fn declarations_without_lowering_warn_but_run() {
    let source = "\
struct Point { var x : int, var y : int }
enum Color { Red, Green, Blue }
1 + 1";
    let outcome = run_source(source);
    assert!(!outcome.compile.diags.has_errors());
    assert!(outcome
        .compile
        .diags
        .reports()
        .iter()
        .any(|r| r.code == DiagCode::UnimplementedNode && r.severity == Severity::Warning));
    assert_eq!(outcome.result, Ok(Some(2)));
}

#[test]
fn unbalanced_parens_report_once_at_eof() {
    let out = compile_source("var x = (1 + 2");
    assert!(out
        .diags
        .reports()
        .iter()
        .any(|r| r.code == DiagCode::UnmatchedParen));
}

#[test]
fn balanced_nested_parens_are_silent() {
    let out = compile_source("var x = ((1 + 2) * (3 - 1))");
    assert!(out.diags.is_empty());
}

#[test]
fn multiple_errors_all_surface_in_order() {
    let source = "ghost1\nvar x : int = \"s\"\nbreak";
    let out = compile_source(source);
    let codes: Vec<DiagCode> = out.diags.reports().iter().map(|r| r.code).collect();
    let undeclared = codes
        .iter()
        .position(|c| *c == DiagCode::UndeclaredVariable)
        .expect("undeclared variable reported");
    let mismatch = codes
        .iter()
        .position(|c| *c == DiagCode::TypeMismatch)
        .expect("type mismatch reported");
    let jump = codes
        .iter()
        .position(|c| *c == DiagCode::BreakOutsideLoop)
        .expect("break outside loop reported");
    assert!(undeclared < mismatch, "lexical order preserved: {:?}", codes);
    assert!(mismatch < jump, "lexical order preserved: {:?}", codes);
}

#[test]
fn execution_is_skipped_when_errors_exist() {
    let outcome = run_source("ghost + 1");
    assert!(outcome.compile.diags.has_errors());
    assert_eq!(outcome.result, Ok(None));
}

#[test]
fn bytecode_listing_names_global_variables() {
    let out = compile_source("var counter = 1\ncounter + 1");
    let listing = out.listing();
    assert!(listing.contains("STORE_GLOB counter"), "listing:\n{}", listing);
    assert!(listing.contains("LOAD_GLOB counter"), "listing:\n{}", listing);
    assert!(listing.contains("RETURN"));
}

#[test]
fn bytecode_listing_shows_calls_after_main_code() {
    let out = compile_source("func one() : int { return 1 }\none()");
    let listing = out.listing();
    let call_at = listing.find("CALL").expect("call emitted");
    let ret_at = listing.find("RETURN").expect("halt emitted");
    assert!(call_at < ret_at, "top-level code precedes function bodies");
}

#[test]
fn deep_expression_nesting_parses_and_runs() {
    let source = "((((((1 + 2) * 3) - 4) * 5) + 6) % 7)";
    // ((3 * 3 - 4) * 5 + 6) % 7 = 31 % 7
    assert_eq!(run_value(source), 3);
}

#[test]
fn global_state_threads_through_functions() {
    let source = "\
var counter = 0
func bump() { counter += 1 }
bump()
bump()
bump()
counter";
    assert_eq!(run_value(source), 3);
}
