//! Lowers the checked AST to stack-machine bytecode. Top-level code is
//! emitted first and ends with an outermost `RETURN`; function bodies
//! follow, with call sites patched once every address is known. Top-level
//! variables live in the global store by interned name; everything else
//! gets a frame slot.
//!
//! The VM is an int64 machine, so float and string literals (and the
//! constructs with no lowering yet) report instead of emitting garbage.

use std::collections::HashMap;

use crate::ast::{decode_int, BinOp, LitKind, Node, NodeKind, UnaryOp};
use crate::diag::{DiagCode, Diagnostics};
use crate::intern::{Interner, Symbol};
use crate::ir::{Chunk, Opcode};
use crate::token::Span;

struct LoopCtx {
    /// Known for `while` (loop head); `for` patches continues to its step.
    continue_target: Option<usize>,
    break_fixups: Vec<usize>,
    continue_fixups: Vec<usize>,
}

pub struct CodeGen<'a, 'sess> {
    chunk: Chunk,
    interner: &'sess Interner,
    diags: &'sess mut Diagnostics,
    /// Lexical slot maps for the function being compiled; index 0 is the
    /// frame's outermost scope.
    locals: Vec<HashMap<Symbol, u32>>,
    next_slot: u32,
    in_function: bool,
    functions: HashMap<Symbol, usize>,
    call_fixups: Vec<(usize, Symbol, Span)>,
    pending: Vec<&'a Node<'a>>,
    loops: Vec<LoopCtx>,
}

/// Compiles a program (the parser's root block) into executable bytecode.
pub fn compile_program<'a>(
    root: &'a Node<'a>,
    interner: &Interner,
    diags: &mut Diagnostics,
) -> Chunk {
    let mut gen = CodeGen {
        chunk: Chunk::new(),
        interner,
        diags,
        locals: vec![HashMap::new()],
        next_slot: 0,
        in_function: false,
        functions: HashMap::new(),
        call_fixups: Vec::new(),
        pending: Vec::new(),
        loops: Vec::new(),
    };

    match root.kind {
        NodeKind::Block { stmts } => {
            // The value of the final top-level expression is the program's
            // result: it stays on the stack across the halting RETURN.
            let last_expr = stmts
                .iter()
                .rposition(|s| !matches!(s.kind, NodeKind::Func { .. }));
            for (i, stmt) in stmts.iter().enumerate() {
                if let NodeKind::Func { .. } = stmt.kind {
                    gen.pending.push(stmt);
                } else if Some(i) == last_expr && gen.is_expression(stmt) {
                    gen.compile_expr(stmt);
                } else {
                    gen.compile_stmt(stmt);
                }
            }
        }
        _ => gen.compile_stmt(root),
    }
    gen.chunk.emit(Opcode::Return);

    let mut cursor = 0;
    while cursor < gen.pending.len() {
        let func = gen.pending[cursor];
        gen.compile_function(func);
        cursor += 1;
    }

    gen.patch_calls();
    gen.chunk
}

impl<'a, 'sess> CodeGen<'a, 'sess> {
    fn is_expression(&self, node: &'a Node<'a>) -> bool {
        matches!(
            node.kind,
            NodeKind::Literal { .. }
                | NodeKind::Ref { .. }
                | NodeKind::BinOp { .. }
                | NodeKind::UnaryOp { .. }
                | NodeKind::Assign { .. }
                | NodeKind::Call { .. }
        )
    }

    fn compile_function(&mut self, node: &'a Node<'a>) {
        let NodeKind::Func { name, params, body, .. } = node.kind else {
            return;
        };

        self.functions.insert(name, self.chunk.len());

        let saved_locals = std::mem::replace(&mut self.locals, vec![HashMap::new()]);
        let saved_slot = std::mem::replace(&mut self.next_slot, 0);
        self.in_function = true;

        // The caller pushed arguments left to right, so the top of the
        // stack is the last parameter.
        let mut slots = Vec::new();
        for param in params {
            if let NodeKind::Param { name: pname, .. } = param.kind {
                slots.push(self.define_local(pname));
            }
        }
        for &slot in slots.iter().rev() {
            self.chunk.emit_with(Opcode::Store, slot as i64);
        }

        self.compile_stmt(body);

        // Falling off the end returns 0.
        self.chunk.emit_with(Opcode::Push, 0);
        self.chunk.emit(Opcode::Return);

        self.locals = saved_locals;
        self.next_slot = saved_slot;
        self.in_function = false;
    }

    fn compile_stmt(&mut self, node: &'a Node<'a>) {
        match node.kind {
            NodeKind::Var { name, init, .. } => {
                match init {
                    Some(init) => self.compile_expr(init),
                    None => {
                        self.chunk.emit_with(Opcode::Push, 0);
                    }
                }
                self.define_and_store(name);
            }
            NodeKind::Block { stmts } => {
                self.locals.push(HashMap::new());
                for stmt in stmts {
                    self.compile_stmt(stmt);
                }
                self.locals.pop();
            }
            NodeKind::If { .. } => self.compile_if(node),
            NodeKind::While { .. } => self.compile_while(node),
            NodeKind::For { .. } => self.compile_for(node),
            NodeKind::Return { value } => {
                match value {
                    Some(value) => self.compile_expr(value),
                    None => {
                        self.chunk.emit_with(Opcode::Push, 0);
                    }
                }
                self.chunk.emit(Opcode::Return);
            }
            NodeKind::Break => {
                if !self.loops.is_empty() {
                    let fixup = self.chunk.emit_with(Opcode::Jump, 0);
                    if let Some(ctx) = self.loops.last_mut() {
                        ctx.break_fixups.push(fixup);
                    }
                }
            }
            NodeKind::Continue => {
                let target = self.loops.last().and_then(|c| c.continue_target);
                if self.loops.is_empty() {
                    return;
                }
                match target {
                    Some(t) => {
                        self.chunk.emit_with(Opcode::Jump, t as i64);
                    }
                    None => {
                        let fixup = self.chunk.emit_with(Opcode::Jump, 0);
                        if let Some(ctx) = self.loops.last_mut() {
                            ctx.continue_fixups.push(fixup);
                        }
                    }
                }
            }
            NodeKind::Func { .. } => self.pending.push(node),
            NodeKind::Literal { .. }
            | NodeKind::Ref { .. }
            | NodeKind::BinOp { .. }
            | NodeKind::UnaryOp { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Call { .. } => {
                self.compile_expr(node);
                self.chunk.emit(Opcode::Pop);
            }
            _ => {
                // Declarations and constructs with no bytecode lowering.
                self.diags.warning(DiagCode::UnimplementedNode, node.span);
            }
        }
    }

    fn compile_if(&mut self, node: &'a Node<'a>) {
        let NodeKind::If { cond, then_block, elifs, else_block } = node.kind else {
            return;
        };

        let mut end_fixups = Vec::new();

        self.compile_expr(cond);
        let mut next_fixup = self.chunk.emit_with(Opcode::JumpIfNot, 0);
        self.compile_stmt(then_block);
        end_fixups.push(self.chunk.emit_with(Opcode::Jump, 0));

        for elif in elifs {
            let NodeKind::If { cond: econd, then_block: ebody, .. } = elif.kind else {
                continue;
            };
            self.chunk.patch(next_fixup, self.chunk.len() as i64);
            self.compile_expr(econd);
            next_fixup = self.chunk.emit_with(Opcode::JumpIfNot, 0);
            self.compile_stmt(ebody);
            end_fixups.push(self.chunk.emit_with(Opcode::Jump, 0));
        }

        self.chunk.patch(next_fixup, self.chunk.len() as i64);
        if let Some(else_block) = else_block {
            self.compile_stmt(else_block);
        }

        let end = self.chunk.len() as i64;
        for fixup in end_fixups {
            self.chunk.patch(fixup, end);
        }
    }

    fn compile_while(&mut self, node: &'a Node<'a>) {
        let NodeKind::While { cond, body } = node.kind else {
            return;
        };

        let start = self.chunk.len();
        self.compile_expr(cond);
        let exit_fixup = self.chunk.emit_with(Opcode::JumpIfNot, 0);

        self.loops.push(LoopCtx {
            continue_target: Some(start),
            break_fixups: Vec::new(),
            continue_fixups: Vec::new(),
        });
        self.compile_stmt(body);
        self.chunk.emit_with(Opcode::Jump, start as i64);

        let end = self.chunk.len() as i64;
        self.chunk.patch(exit_fixup, end);
        if let Some(ctx) = self.loops.pop() {
            for fixup in ctx.break_fixups {
                self.chunk.patch(fixup, end);
            }
        }
    }

    fn compile_for(&mut self, node: &'a Node<'a>) {
        let NodeKind::For { init, cond, step, body } = node.kind else {
            return;
        };

        // The init slot's declaration lives only as long as the loop.
        self.locals.push(HashMap::new());
        if let Some(init) = init {
            self.compile_stmt(init);
        }

        let cond_at = self.chunk.len();
        match cond {
            Some(cond) => self.compile_expr(cond),
            None => {
                self.chunk.emit_with(Opcode::Push, 1);
            }
        }
        let exit_fixup = self.chunk.emit_with(Opcode::JumpIfNot, 0);

        self.loops.push(LoopCtx {
            continue_target: None,
            break_fixups: Vec::new(),
            continue_fixups: Vec::new(),
        });
        self.compile_stmt(body);

        let step_at = self.chunk.len();
        if let Some(step) = step {
            self.compile_expr(step);
            self.chunk.emit(Opcode::Pop);
        }
        self.chunk.emit_with(Opcode::Jump, cond_at as i64);

        let end = self.chunk.len() as i64;
        self.chunk.patch(exit_fixup, end);
        if let Some(ctx) = self.loops.pop() {
            for fixup in ctx.break_fixups {
                self.chunk.patch(fixup, end);
            }
            for fixup in ctx.continue_fixups {
                self.chunk.patch(fixup, step_at as i64);
            }
        }
        self.locals.pop();
    }

    fn compile_expr(&mut self, node: &'a Node<'a>) {
        match node.kind {
            NodeKind::Literal { lit, value } => match lit {
                LitKind::Float | LitKind::Str | LitKind::Infinity => {
                    self.diags.error(DiagCode::InvalidOperation, node.span);
                    self.chunk.emit_with(Opcode::Push, 0);
                }
                _ => {
                    let text = self.interner.resolve(value);
                    let v = decode_int(lit, text).unwrap_or(0);
                    self.chunk.emit_with(Opcode::Push, v);
                }
            },
            NodeKind::Ref { name } => self.emit_load(name),
            NodeKind::Assign { target, value } => {
                self.compile_expr(value);
                self.chunk.emit(Opcode::Dup);
                self.emit_store(target);
            }
            NodeKind::BinOp { op, left, right } => self.compile_binop(op, left, right, node.span),
            NodeKind::UnaryOp { op, operand, .. } => self.compile_unary(op, operand, node.span),
            NodeKind::Call { callee, args } => {
                for arg in args {
                    self.compile_expr(arg);
                }
                let fixup = self.chunk.emit_with(Opcode::Call, 0);
                self.call_fixups.push((fixup, callee, node.span));
            }
            _ => {
                self.diags.warning(DiagCode::UnimplementedNode, node.span);
                self.chunk.emit_with(Opcode::Push, 0);
            }
        }
    }

    fn compile_binop(&mut self, op: BinOp, left: &'a Node<'a>, right: &'a Node<'a>, span: Span) {
        if op.is_assignment() && op != BinOp::Assign {
            // Compound assignment: read target, apply, write back.
            let NodeKind::Ref { name } = left.kind else {
                self.diags.error(DiagCode::InvalidOperation, span);
                self.chunk.emit_with(Opcode::Push, 0);
                return;
            };
            self.emit_load(name);
            self.compile_expr(right);
            match op {
                BinOp::AddAssign => {
                    self.chunk.emit(Opcode::Add);
                }
                BinOp::SubAssign => {
                    self.chunk.emit(Opcode::Sub);
                }
                BinOp::MulAssign => {
                    self.chunk.emit(Opcode::Mul);
                }
                BinOp::DivAssign => {
                    self.chunk.emit(Opcode::Div);
                }
                _ => self.emit_mod(),
            }
            self.chunk.emit(Opcode::Dup);
            self.emit_store(name);
            return;
        }

        if op == BinOp::Assign {
            // The parser folds `ref = value` into an Assign node; anything
            // still here has a non-assignable left side.
            self.diags.error(DiagCode::InvalidOperation, span);
            self.chunk.emit_with(Opcode::Push, 0);
            return;
        }

        self.compile_expr(left);
        self.compile_expr(right);
        match op {
            BinOp::Add => {
                self.chunk.emit(Opcode::Add);
            }
            BinOp::Sub => {
                self.chunk.emit(Opcode::Sub);
            }
            BinOp::Mul => {
                self.chunk.emit(Opcode::Mul);
            }
            BinOp::Div => {
                self.chunk.emit(Opcode::Div);
            }
            BinOp::Mod => self.emit_mod(),
            BinOp::Eq => {
                self.chunk.emit(Opcode::Eq);
            }
            BinOp::NotEq => {
                self.chunk.emit(Opcode::Neq);
            }
            BinOp::Lt => {
                self.chunk.emit(Opcode::Lt);
            }
            BinOp::Gt => {
                self.chunk.emit(Opcode::Gt);
            }
            BinOp::LtEq => {
                self.chunk.emit(Opcode::Gt);
                self.chunk.emit(Opcode::Not);
            }
            BinOp::GtEq => {
                self.chunk.emit(Opcode::Lt);
                self.chunk.emit(Opcode::Not);
            }
            BinOp::And => {
                self.chunk.emit(Opcode::And);
            }
            BinOp::Or => {
                self.chunk.emit(Opcode::Or);
            }
            _ => {}
        }
    }

    fn compile_unary(&mut self, op: UnaryOp, operand: &'a Node<'a>, span: Span) {
        match op {
            UnaryOp::Plus => self.compile_expr(operand),
            UnaryOp::Neg => {
                self.chunk.emit_with(Opcode::Push, 0);
                self.compile_expr(operand);
                self.chunk.emit(Opcode::Sub);
            }
            UnaryOp::Not => {
                self.compile_expr(operand);
                self.chunk.emit(Opcode::Not);
            }
            UnaryOp::Increment | UnaryOp::Decrement => {
                let NodeKind::Ref { name } = operand.kind else {
                    self.diags.error(DiagCode::InvalidOperation, span);
                    self.chunk.emit_with(Opcode::Push, 0);
                    return;
                };
                self.emit_load(name);
                self.chunk.emit_with(Opcode::Push, 1);
                if op == UnaryOp::Increment {
                    self.chunk.emit(Opcode::Add);
                } else {
                    self.chunk.emit(Opcode::Sub);
                }
                self.chunk.emit(Opcode::Dup);
                self.emit_store(name);
            }
        }
    }

    /// Lowers `a % b` from stack `[a, b]` via two scratch slots:
    /// `a - (a / b) * b`.
    fn emit_mod(&mut self) {
        let tb = self.alloc_scratch();
        let ta = self.alloc_scratch();
        self.chunk.emit_with(Opcode::Store, tb as i64);
        self.chunk.emit_with(Opcode::Store, ta as i64);
        self.chunk.emit_with(Opcode::Load, ta as i64);
        self.chunk.emit_with(Opcode::Load, ta as i64);
        self.chunk.emit_with(Opcode::Load, tb as i64);
        self.chunk.emit(Opcode::Div);
        self.chunk.emit_with(Opcode::Load, tb as i64);
        self.chunk.emit(Opcode::Mul);
        self.chunk.emit(Opcode::Sub);
    }

    // ------------------------------------------------------------------
    // Variable plumbing
    // ------------------------------------------------------------------

    fn define_local(&mut self, name: Symbol) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name, slot);
        }
        slot
    }

    fn alloc_scratch(&mut self) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        slot
    }

    fn resolve_local(&self, name: Symbol) -> Option<u32> {
        for scope in self.locals.iter().rev() {
            if let Some(&slot) = scope.get(&name) {
                return Some(slot);
            }
        }
        None
    }

    /// Direct top-level declarations become globals; everything in a frame
    /// or nested block gets a slot.
    fn define_and_store(&mut self, name: Symbol) {
        if !self.in_function && self.locals.len() == 1 {
            self.chunk.emit_with(Opcode::StoreGlob, name.index() as i64);
        } else {
            let slot = self.define_local(name);
            self.chunk.emit_with(Opcode::Store, slot as i64);
        }
    }

    fn emit_load(&mut self, name: Symbol) {
        match self.resolve_local(name) {
            Some(slot) => {
                self.chunk.emit_with(Opcode::Load, slot as i64);
            }
            None => {
                self.chunk.emit_with(Opcode::LoadGlob, name.index() as i64);
            }
        }
    }

    fn emit_store(&mut self, name: Symbol) {
        match self.resolve_local(name) {
            Some(slot) => {
                self.chunk.emit_with(Opcode::Store, slot as i64);
            }
            None => {
                self.chunk.emit_with(Opcode::StoreGlob, name.index() as i64);
            }
        }
    }

    fn patch_calls(&mut self) {
        let fixups = std::mem::take(&mut self.call_fixups);
        for (fixup, name, span) in fixups {
            match self.functions.get(&name) {
                Some(&addr) => self.chunk.patch(fixup, addr as i64),
                None => self.diags.error(DiagCode::InvalidFunctionCall, span),
            }
        }
    }
}
