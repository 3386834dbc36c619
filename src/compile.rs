//! End-to-end pipeline driver: source text in, diagnostics + bytecode out.
//! The arenas live here, scoped to one compilation; every stage shares the
//! interner and the diagnostics table.

use crate::arena::Arena;
use crate::ast::{AstContext, Node};
use crate::codegen::compile_program;
use crate::diag::Diagnostics;
use crate::intern::{Interner, Symbol};
use crate::ir::Chunk;
use crate::parser::Parser;
use crate::semantic::Analyzer;
use crate::types::{Type, TypeStore};
use crate::vm::{Vm, VmError};

pub struct CompileOutput {
    pub interner: Interner,
    pub diags: Diagnostics,
    pub chunk: Chunk,
    /// True when every semantic check passed and no error was reported.
    pub ok: bool,
}

impl CompileOutput {
    pub fn render_diagnostics(&self, source: &str, path: &str) -> String {
        self.diags.render(source, path)
    }

    pub fn listing(&self) -> String {
        self.chunk.disassemble(&self.interner)
    }
}

pub struct RunOutcome {
    pub compile: CompileOutput,
    /// `Ok(top-of-stack)` after a clean run; `None` when errors stopped
    /// execution from being attempted.
    pub result: Result<Option<i64>, VmError>,
}

/// Lex → parse → analyze → lower. Never aborts on a bad program: every
/// stage runs and the diagnostics table collects whatever they find.
pub fn compile_source(source: &str) -> CompileOutput {
    let mut interner = Interner::new();
    let mut diags = Diagnostics::new();

    let nodes: Arena<Node> = Arena::new();
    let lists: Arena<&Node> = Arena::new();
    let syms: Arena<Symbol> = Arena::new();
    let type_arena: Arena<Type> = Arena::new();
    let type_lists: Arena<&Type> = Arena::new();

    let ctx = AstContext::new(&nodes, &lists, &syms);
    let mut parser = Parser::new(source, ctx, &mut interner, &mut diags);
    let root = parser.parse_program();
    drop(parser);

    let types = TypeStore::new(&type_arena, &type_lists);
    let mut analyzer = Analyzer::new(types, &interner, &mut diags);
    let sem_ok = analyzer.analyze(root);
    drop(analyzer);

    let chunk = compile_program(root, &interner, &mut diags);

    let ok = sem_ok && !diags.has_errors();
    CompileOutput { interner, diags, chunk, ok }
}

/// Compiles and, when clean, executes. Compilation errors skip the VM but
/// still hand back everything the stages reported.
pub fn run_source(source: &str) -> RunOutcome {
    let compile = compile_source(source);
    if compile.diags.has_errors() {
        return RunOutcome { compile, result: Ok(None) };
    }

    let mut vm = Vm::new(compile.chunk.code.clone());
    let result = vm.run().map(|_| vm.top());
    RunOutcome { compile, result }
}
