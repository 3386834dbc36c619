//! Two-phase semantic analysis. The declare pass pre-registers top-level
//! functions and compound types so later code can reference earlier-used
//! names; the check pass then walks every node, resolving references,
//! inferring types, and reporting into the shared diagnostics table.
//! Failures never stop the walk.

use crate::ast::{decode_int, BinOp, LitKind, Node, NodeKind, UnaryOp};
use crate::diag::{DiagCode, Diagnostics};
use crate::intern::Interner;
use crate::symbol::{ScopeKind, SymFlags, SymbolId, SymbolKind, SymbolTable};
use crate::token::Modifier;
use crate::types::{types_compatible, Type, TypeData, TypeKind, TypeStore};

pub struct Analyzer<'a, 'sess> {
    types: TypeStore<'a>,
    pub table: SymbolTable<'a>,
    interner: &'sess Interner,
    diags: &'sess mut Diagnostics,
    current_function: Option<SymbolId>,
    loop_depth: u32,
}

impl<'a, 'sess> Analyzer<'a, 'sess> {
    pub fn new(
        types: TypeStore<'a>,
        interner: &'sess Interner,
        diags: &'sess mut Diagnostics,
    ) -> Self {
        Analyzer {
            types,
            table: SymbolTable::new(),
            interner,
            diags,
            current_function: None,
            loop_depth: 0,
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &*self.diags
    }

    pub fn interner(&self) -> &Interner {
        self.interner
    }

    /// Runs both phases over the root block. Returns whether every check
    /// passed; diagnostics carry the details either way.
    pub fn analyze(&mut self, root: &'a Node<'a>) -> bool {
        // Phase 1: declare. Top-level functions and compound types become
        // visible before any body is checked, enabling forward references.
        if let NodeKind::Block { stmts } = root.kind {
            for stmt in stmts {
                match stmt.kind {
                    NodeKind::Func { .. } => {
                        self.declare_function(stmt);
                    }
                    NodeKind::Struct { name, .. } => {
                        self.declare_compound(stmt, name, SymbolKind::Struct);
                    }
                    NodeKind::Enum { name, .. } => {
                        self.declare_compound(stmt, name, SymbolKind::Enum);
                    }
                    NodeKind::Union { name, .. } => {
                        self.declare_compound(stmt, name, SymbolKind::Union);
                    }
                    _ => {}
                }
            }
        }

        // Phase 2: check.
        match root.kind {
            NodeKind::Block { stmts } => {
                let mut ok = true;
                for stmt in stmts {
                    ok = self.check_node(stmt) && ok;
                }
                ok
            }
            _ => self.check_node(root),
        }
    }

    // ------------------------------------------------------------------
    // Declare phase
    // ------------------------------------------------------------------

    fn declare_function(&mut self, node: &'a Node<'a>) -> Option<SymbolId> {
        let NodeKind::Func { name, params, ret, .. } = node.kind else {
            return None;
        };

        let param_types: Vec<&'a Type<'a>> = params
            .iter()
            .map(|p| match p.kind {
                NodeKind::Param { declared, .. } => self.types.from_datatype(declared),
                _ => self.types.unknown,
            })
            .collect();
        let ret_type = ret.map(|dt| self.types.from_datatype(dt)).unwrap_or(self.types.void);
        let fn_type = self.types.function(ret_type, param_types);

        match self.table.define(name, SymbolKind::Func, fn_type, Some(node), node.span) {
            Ok(id) => Some(id),
            Err(_) => {
                self.diags.error(DiagCode::FunctionAlreadyDeclared, node.span);
                None
            }
        }
    }

    fn declare_compound(
        &mut self,
        node: &'a Node<'a>,
        name: crate::intern::Symbol,
        kind: SymbolKind,
    ) -> Option<SymbolId> {
        match self.table.define(name, kind, self.types.unknown, Some(node), node.span) {
            Ok(id) => Some(id),
            Err(_) => {
                self.diags.error(DiagCode::VariableAlreadyDeclared, node.span);
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Check phase
    // ------------------------------------------------------------------

    pub fn check_node(&mut self, node: &'a Node<'a>) -> bool {
        match node.kind {
            NodeKind::Var { .. } => self.check_variable(node),
            NodeKind::Ref { .. } => self.check_var_ref(node),
            NodeKind::Literal { .. } => true,
            NodeKind::BinOp { .. } => self.check_binop(node),
            NodeKind::UnaryOp { .. } => self.check_unary(node),
            NodeKind::Assign { .. } => self.check_assign(node),
            NodeKind::Call { .. } => self.check_call(node),
            NodeKind::Block { .. } => self.check_block(node, ScopeKind::Block),
            NodeKind::If { .. } => self.check_if(node),
            NodeKind::While { .. } => self.check_while(node),
            NodeKind::For { .. } => self.check_for(node),
            NodeKind::Return { .. } => self.check_return(node),
            NodeKind::Break => self.check_jump(node, DiagCode::BreakOutsideLoop),
            NodeKind::Continue => self.check_jump(node, DiagCode::ContinueOutsideLoop),
            NodeKind::Func { .. } => self.check_function(node),
            NodeKind::Array { elems } => {
                let mut ok = true;
                for elem in elems {
                    ok = self.check_node(elem) && ok;
                }
                ok
            }
            NodeKind::Struct { .. } => self.check_compound(node, ScopeKind::Struct),
            NodeKind::Union { .. } => self.check_compound(node, ScopeKind::Union),
            NodeKind::Enum { .. } => self.check_enum(node),
            NodeKind::Match { .. } => self.check_match(node),
            NodeKind::Case { cond, body } => {
                let ok = self.check_node(cond);
                self.check_node(body) && ok
            }
            NodeKind::Trait { body, .. } => self.check_node(body),
            NodeKind::Impl { body, .. } => self.check_node(body),
            NodeKind::TryCatch { .. } => self.check_try_catch(node),
            NodeKind::Module { name, body } => {
                let _ = self.table.define(name, SymbolKind::Module, self.types.unknown, Some(node), node.span);
                body.map(|b| self.check_node(b)).unwrap_or(true)
            }
            NodeKind::Import { .. } | NodeKind::NameOf { .. } | NodeKind::TypeOf { .. } => true,
            NodeKind::TypeAlias { name, body } => {
                let _ = self.table.define(name, SymbolKind::Type, self.types.unknown, Some(node), node.span);
                body.map(|b| self.check_node(b)).unwrap_or(true)
            }
            NodeKind::EnumVariant { .. } | NodeKind::Param { .. } => {
                // Registered by their parents; reaching one here is a walk bug.
                self.diags.warning(DiagCode::UnimplementedNode, node.span);
                true
            }
        }
    }

    fn check_variable(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Var { modifier, name, declared, init } = node.kind else {
            return false;
        };

        let annotation = declared.map(|dt| self.types.from_datatype(dt));

        let mut ok = true;
        let mut inferred = self.types.unknown;
        if let Some(init) = init {
            ok = self.check_node(init);
            inferred = self.infer_type(init);
        }

        match (annotation, init) {
            (Some(ann), Some(_)) => {
                if !types_compatible(ann, inferred) {
                    self.diags.error(DiagCode::TypeMismatch, node.span);
                    ok = false;
                }
            }
            (None, None) => {
                self.diags.error(DiagCode::VariableNoTypeOrInitializer, node.span);
                ok = false;
            }
            _ => {}
        }

        let kind = match modifier {
            Some(Modifier::Const) | Some(Modifier::Final) => SymbolKind::Const,
            _ => SymbolKind::Var,
        };

        let ty = annotation.unwrap_or(inferred);
        match self.table.define(name, kind, ty, Some(node), node.span) {
            Ok(id) => {
                let sym = self.table.symbol_mut(id);
                sym.declared = annotation;
                sym.init = init;
                if init.is_some() {
                    sym.flags |= SymFlags::ASSIGNED;
                }
                if kind == SymbolKind::Var {
                    sym.flags |= SymFlags::MUTABLE;
                }
                if modifier == Some(Modifier::Static) {
                    sym.flags |= SymFlags::STATIC;
                }
                ok
            }
            Err(_) => {
                self.diags.error(DiagCode::VariableAlreadyDeclared, node.span);
                false
            }
        }
    }

    fn check_var_ref(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Ref { name } = node.kind else {
            return false;
        };
        match self.table.lookup(name) {
            Some(id) => {
                self.table.symbol_mut(id).flags |= SymFlags::USED;
                true
            }
            None => {
                self.diags.error(DiagCode::UndeclaredVariable, node.span);
                false
            }
        }
    }

    fn check_binop(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::BinOp { op, left, right } = node.kind else {
            return false;
        };

        let mut ok = self.check_node(left);
        ok = self.check_node(right) && ok;

        if op.is_assignment() {
            // Compound assignment re-reads the target, so it must be a
            // resolvable, mutable reference.
            if let NodeKind::Ref { name } = left.kind {
                if let Some(id) = self.table.lookup(name) {
                    if self.table.symbol(id).kind == SymbolKind::Const {
                        self.diags.error(DiagCode::InvalidOperation, node.span);
                        ok = false;
                    } else {
                        self.table.symbol_mut(id).flags |= SymFlags::ASSIGNED;
                    }
                }
            }
        }

        let lt = self.infer_type(left);
        let rt = self.infer_type(right);
        if !types_compatible(lt, rt) {
            self.diags.error(DiagCode::TypeMismatch, node.span);
            return false;
        }
        ok
    }

    fn check_unary(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::UnaryOp { op, operand, .. } = node.kind else {
            return false;
        };
        let ok = self.check_node(operand);

        // Increment/decrement write back, so the operand must be a mutable
        // reference.
        if matches!(op, UnaryOp::Increment | UnaryOp::Decrement) {
            match operand.kind {
                NodeKind::Ref { name } => {
                    if let Some(id) = self.table.lookup(name) {
                        if self.table.symbol(id).kind == SymbolKind::Const {
                            self.diags.error(DiagCode::InvalidOperation, node.span);
                            return false;
                        }
                        self.table.symbol_mut(id).flags |= SymFlags::ASSIGNED;
                    }
                }
                _ => {
                    self.diags.error(DiagCode::InvalidUnaryOp, node.span);
                    return false;
                }
            }
        }
        ok
    }

    fn check_assign(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Assign { target, value } = node.kind else {
            return false;
        };

        let mut ok = self.check_node(value);

        let Some(id) = self.table.lookup(target) else {
            self.diags.error(DiagCode::UndeclaredVariable, node.span);
            return false;
        };
        if self.table.symbol(id).kind == SymbolKind::Const {
            self.diags.error(DiagCode::InvalidOperation, node.span);
            return false;
        }
        self.table.symbol_mut(id).flags |= SymFlags::ASSIGNED;

        let target_ty = self.table.symbol(id).ty;
        let value_ty = self.infer_type(value);
        if !types_compatible(target_ty, value_ty) {
            self.diags.error(DiagCode::TypeMismatch, node.span);
            ok = false;
        }
        ok
    }

    fn check_call(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Call { callee, args } = node.kind else {
            return false;
        };

        let mut ok = true;
        for arg in args {
            ok = self.check_node(arg) && ok;
        }

        let Some(id) = self.table.lookup(callee) else {
            self.diags.error(DiagCode::UndeclaredFunction, node.span);
            return false;
        };
        if self.table.symbol(id).kind != SymbolKind::Func {
            self.diags.error(DiagCode::NotAFunction, node.span);
            return false;
        }
        self.table.symbol_mut(id).flags |= SymFlags::USED;

        let fn_ty = self.table.symbol(id).ty;
        if let TypeData::Function { params, .. } = &fn_ty.data {
            if params.len() != args.len() {
                self.diags.error(DiagCode::InvalidArgumentCount, node.span);
                return false;
            }
            for (param_ty, arg) in params.iter().zip(args.iter()) {
                let arg_ty = self.infer_type(arg);
                if !types_compatible(param_ty, arg_ty) {
                    self.diags.error(DiagCode::InvalidArgumentType, arg.span);
                    ok = false;
                }
            }
        }
        ok
    }

    fn check_block(&mut self, node: &'a Node<'a>, kind: ScopeKind) -> bool {
        let NodeKind::Block { stmts } = node.kind else {
            return false;
        };
        self.table.push_scope(kind, Some(node));
        let mut ok = true;
        for stmt in stmts {
            ok = self.check_node(stmt) && ok;
        }
        self.table.pop_scope();
        ok
    }

    fn check_if(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::If { cond, then_block, elifs, else_block } = node.kind else {
            return false;
        };
        let mut ok = self.check_node(cond);
        ok = self.check_node(then_block) && ok;
        for elif in elifs {
            ok = self.check_node(elif) && ok;
        }
        if let Some(else_block) = else_block {
            ok = self.check_node(else_block) && ok;
        }
        ok
    }

    fn check_while(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::While { cond, body } = node.kind else {
            return false;
        };
        let mut ok = self.check_node(cond);
        self.loop_depth += 1;
        ok = self.check_node(body) && ok;
        self.loop_depth -= 1;
        ok
    }

    fn check_for(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::For { init, cond, step, body } = node.kind else {
            return false;
        };

        // The init slot may declare a variable; give it its own scope so
        // the name dies with the loop.
        self.table.push_scope(ScopeKind::Loop, Some(node));
        let mut ok = true;
        if let Some(init) = init {
            ok = self.check_node(init) && ok;
        }
        if let Some(cond) = cond {
            ok = self.check_node(cond) && ok;
        }
        if let Some(step) = step {
            ok = self.check_node(step) && ok;
        }
        self.loop_depth += 1;
        ok = self.check_node(body) && ok;
        self.loop_depth -= 1;
        self.table.pop_scope();
        ok
    }

    fn check_return(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Return { value } = node.kind else {
            return false;
        };

        let Some(func_id) = self.current_function else {
            self.diags.error(DiagCode::ReturnOutsideFunction, node.span);
            return false;
        };

        let mut ok = true;
        if let Some(value) = value {
            ok = self.check_node(value);
            let value_ty = self.infer_type(value);
            let fn_ty = self.table.symbol(func_id).ty;
            if let TypeData::Function { ret, .. } = &fn_ty.data {
                if !types_compatible(ret, value_ty) {
                    self.diags.error(DiagCode::InvalidReturnType, node.span);
                    ok = false;
                }
            }
        }
        ok
    }

    fn check_jump(&mut self, node: &'a Node<'a>, code: DiagCode) -> bool {
        if self.loop_depth == 0 {
            self.diags.error(code, node.span);
            return false;
        }
        true
    }

    fn check_function(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Func { name, params, body, .. } = node.kind else {
            return false;
        };

        // Top-level functions were declared in phase 1; nested ones get
        // registered on first sight here.
        let id = if self.table.exists_in_current(name) {
            self.table.lookup(name)
        } else {
            self.declare_function(node)
        };
        let Some(id) = id else {
            return false;
        };

        let previous = self.current_function.replace(id);
        let previous_depth = std::mem::replace(&mut self.loop_depth, 0);
        self.table.push_scope(ScopeKind::Function, Some(node));

        let mut ok = true;
        for param in params {
            let NodeKind::Param { name: pname, declared } = param.kind else {
                continue;
            };
            let pty = self.types.from_datatype(declared);
            match self.table.define(pname, SymbolKind::Param, pty, Some(param), param.span) {
                Ok(pid) => {
                    let sym = self.table.symbol_mut(pid);
                    sym.declared = Some(pty);
                    sym.flags |= SymFlags::ASSIGNED;
                }
                Err(_) => {
                    self.diags.error(DiagCode::VariableAlreadyDeclared, param.span);
                    ok = false;
                }
            }
        }

        ok = self.check_node(body) && ok;

        self.table.pop_scope();
        self.loop_depth = previous_depth;
        self.current_function = previous;
        ok
    }

    fn check_compound(&mut self, node: &'a Node<'a>, scope_kind: ScopeKind) -> bool {
        let (name, members, sym_kind, type_kind) = match node.kind {
            NodeKind::Struct { name, members } => {
                (name, members, SymbolKind::Struct, TypeKind::Struct)
            }
            NodeKind::Union { name, members } => {
                (name, members, SymbolKind::Union, TypeKind::Union)
            }
            _ => return false,
        };

        let id = if self.table.exists_in_current(name) {
            self.table.lookup(name)
        } else {
            self.declare_compound(node, name, sym_kind)
        };
        let Some(id) = id else {
            return false;
        };

        let scope = self.table.push_scope(scope_kind, Some(node));
        let mut ok = true;
        for member in members {
            ok = self.check_variable(member) && ok;
        }
        self.table.pop_scope();

        let ty = self.types.compound(type_kind, scope, members.len());
        self.table.symbol_mut(id).ty = ty;
        ok
    }

    fn check_enum(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Enum { name, variants } = node.kind else {
            return false;
        };

        let id = if self.table.exists_in_current(name) {
            self.table.lookup(name)
        } else {
            self.declare_compound(node, name, SymbolKind::Enum)
        };
        let Some(id) = id else {
            return false;
        };

        let scope = self.table.push_scope(ScopeKind::Enum, Some(node));
        let mut ok = true;
        let mut next_value: i64 = 0;
        for variant in variants {
            let NodeKind::EnumVariant { name: vname, value } = variant.kind else {
                continue;
            };
            if let Some(value) = value {
                if let NodeKind::Literal { lit, value: text } = value.kind {
                    if let Some(v) = decode_int(lit, self.interner.resolve(text)) {
                        next_value = v;
                    } else {
                        self.diags.error(DiagCode::InvalidLiteral, value.span);
                        ok = false;
                    }
                } else {
                    self.diags.error(DiagCode::InvalidExpression, value.span);
                    ok = false;
                }
            }
            match self.table.define(
                vname,
                SymbolKind::EnumVariant,
                self.types.int,
                Some(variant),
                variant.span,
            ) {
                Ok(vid) => {
                    self.table.symbol_mut(vid).const_value = Some(next_value);
                    next_value += 1;
                }
                Err(_) => {
                    self.diags.error(DiagCode::VariableAlreadyDeclared, variant.span);
                    ok = false;
                }
            }
        }
        self.table.pop_scope();

        let ty = self.types.compound(TypeKind::Enum, scope, variants.len());
        self.table.symbol_mut(id).ty = ty;
        ok
    }

    fn check_match(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::Match { target, cases } = node.kind else {
            return false;
        };
        let mut ok = self.check_node(target);
        self.table.push_scope(ScopeKind::Switch, Some(node));
        for case in cases {
            ok = self.check_node(case) && ok;
        }
        self.table.pop_scope();
        ok
    }

    fn check_try_catch(&mut self, node: &'a Node<'a>) -> bool {
        let NodeKind::TryCatch { try_block, catch_name, catch_block, finally_block } = node.kind
        else {
            return false;
        };

        let mut ok = self.check_node(try_block);

        self.table.push_scope(ScopeKind::Block, Some(node));
        if let Some(catch_name) = catch_name {
            let _ = self.table.define(
                catch_name,
                SymbolKind::Var,
                self.types.any,
                Some(node),
                node.span,
            );
        }
        ok = self.check_node(catch_block) && ok;
        self.table.pop_scope();

        if let Some(finally_block) = finally_block {
            ok = self.check_node(finally_block) && ok;
        }
        ok
    }

    // ------------------------------------------------------------------
    // Inference
    // ------------------------------------------------------------------

    pub fn infer_type(&self, node: &'a Node<'a>) -> &'a Type<'a> {
        match node.kind {
            NodeKind::Literal { lit, .. } => match lit {
                LitKind::Number | LitKind::Hex | LitKind::Bin => self.types.int,
                LitKind::Float | LitKind::Infinity => self.types.float,
                LitKind::Str => self.types.str_,
                LitKind::Char => self.types.char_,
                LitKind::True | LitKind::False => self.types.bool_,
                LitKind::Null => self.types.void,
            },
            NodeKind::Ref { name } => match self.table.lookup(name) {
                Some(id) => self.table.symbol(id).ty,
                None => self.types.unknown,
            },
            NodeKind::Call { callee, .. } => match self.table.lookup(callee) {
                Some(id) => match &self.table.symbol(id).ty.data {
                    TypeData::Function { ret, .. } => ret,
                    _ => self.types.unknown,
                },
                None => self.types.unknown,
            },
            NodeKind::BinOp { op, left, .. } => {
                if op.is_comparison() || matches!(op, BinOp::And | BinOp::Or) {
                    self.types.bool_
                } else if op.is_assignment() {
                    self.infer_type(left)
                } else {
                    self.types.unknown
                }
            }
            NodeKind::UnaryOp { operand, .. } => self.infer_type(operand),
            NodeKind::Assign { value, .. } => self.infer_type(value),
            NodeKind::Array { elems } => {
                let elem = elems
                    .first()
                    .map(|e| self.infer_type(e))
                    .unwrap_or(self.types.unknown);
                self.types.array(elem, elems.len())
            }
            _ => self.types.unknown,
        }
    }
}
