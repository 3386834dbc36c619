//! Scope tree and symbol records. Scopes are index-addressed and never
//! deleted: popping only moves the cursor back to the parent, so a popped
//! scope stays reachable for later reporting.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::ast::Node;
use crate::intern::Symbol;
use crate::token::Span;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

impl SymbolId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Const,
    Func,
    Param,
    Struct,
    Enum,
    Union,
    Type,
    BuiltinType,
    Module,
    Generic,
    EnumVariant,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymFlags: u8 {
        const USED     = 1 << 0;
        const ASSIGNED = 1 << 1;
        const GLOBAL   = 1 << 2;
        const EXTERN   = 1 << 3;
        const STATIC   = 1 << 4;
        const MUTABLE  = 1 << 5;
        const PRIVATE  = 1 << 6;
        const PUBLIC   = 1 << 7;
    }
}

#[derive(Debug)]
pub struct SymbolData<'a> {
    pub name: Symbol,
    pub kind: SymbolKind,
    pub flags: SymFlags,
    /// Resolved type; `unknown` until inference fills it in.
    pub ty: &'a Type<'a>,
    /// The source annotation, when one was written.
    pub declared: Option<&'a Type<'a>>,
    pub decl: Option<&'a Node<'a>>,
    pub init: Option<&'a Node<'a>>,
    pub span: Span,
    pub scope: ScopeId,
    /// Symbol this declaration hides in an enclosing scope, if any.
    pub shadowed: Option<SymbolId>,
    /// Next function overload with the same name.
    pub overload_next: Option<SymbolId>,
    /// Computed value for enum variants.
    pub const_value: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Struct,
    Enum,
    Union,
    Module,
    Switch,
    Loop,
}

#[derive(Debug)]
pub struct Scope<'a> {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub depth: u32,
    pub owner: Option<&'a Node<'a>>,
    map: HashMap<Symbol, SymbolId>,
    order: Vec<SymbolId>,
}

impl<'a> Scope<'a> {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, depth: u32, owner: Option<&'a Node<'a>>) -> Self {
        Scope {
            kind,
            parent,
            children: Vec::new(),
            depth,
            owner,
            map: HashMap::new(),
            order: Vec::new(),
        }
    }

    pub fn get(&self, name: Symbol) -> Option<SymbolId> {
        self.map.get(&name).copied()
    }

    /// Symbols in declaration order, for deterministic diagnostics.
    pub fn symbols(&self) -> &[SymbolId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct SymbolTable<'a> {
    scopes: Vec<Scope<'a>>,
    symbols: Vec<SymbolData<'a>>,
    current: ScopeId,
}

impl<'a> SymbolTable<'a> {
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeKind::Global, None, 0, None)],
            symbols: Vec::new(),
            current: ScopeId::GLOBAL,
        }
    }

    pub fn current_scope(&self) -> ScopeId {
        self.current
    }

    pub fn scope(&self, id: ScopeId) -> &Scope<'a> {
        &self.scopes[id.index()]
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolData<'a> {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut SymbolData<'a> {
        &mut self.symbols[id.index()]
    }

    pub fn depth(&self) -> u32 {
        self.scope(self.current).depth
    }

    /// Creates a child of the current scope and makes it current.
    pub fn push_scope(&mut self, kind: ScopeKind, owner: Option<&'a Node<'a>>) -> ScopeId {
        let parent = self.current;
        let depth = self.scope(parent).depth + 1;
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, Some(parent), depth, owner));
        self.scopes[parent.index()].children.push(id);
        self.current = id;
        id
    }

    /// Returns to the parent scope. The popped scope stays in the tree.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.scope(self.current).parent {
            self.current = parent;
        }
    }

    /// Inserts into the current scope. `Err` carries the symbol already
    /// holding the name in this scope (no shadowing within a scope).
    pub fn define(
        &mut self,
        name: Symbol,
        kind: SymbolKind,
        ty: &'a Type<'a>,
        decl: Option<&'a Node<'a>>,
        span: Span,
    ) -> Result<SymbolId, SymbolId> {
        if let Some(existing) = self.scope(self.current).get(name) {
            return Err(existing);
        }

        let shadowed = self.lookup_enclosing(name);
        let mut flags = SymFlags::empty();
        if self.current == ScopeId::GLOBAL {
            flags |= SymFlags::GLOBAL;
        }

        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            name,
            kind,
            flags,
            ty,
            declared: None,
            decl,
            init: None,
            span,
            scope: self.current,
            shadowed,
            overload_next: None,
            const_value: None,
        });

        let scope = &mut self.scopes[self.current.index()];
        scope.map.insert(name, id);
        scope.order.push(id);
        Ok(id)
    }

    /// Walks from the current scope to the root; innermost hit wins.
    pub fn lookup(&self, name: Symbol) -> Option<SymbolId> {
        self.lookup_from(self.current, name)
    }

    pub fn lookup_from(&self, scope: ScopeId, name: Symbol) -> Option<SymbolId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            let scope = self.scope(id);
            if let Some(sym) = scope.get(name) {
                return Some(sym);
            }
            cursor = scope.parent;
        }
        None
    }

    pub fn exists_in_current(&self, name: Symbol) -> bool {
        self.scope(self.current).get(name).is_some()
    }

    /// Chains `next` onto `head`'s overload list (same-name functions).
    pub fn link_overload(&mut self, head: SymbolId, next: SymbolId) {
        let mut cursor = head;
        while let Some(n) = self.symbols[cursor.index()].overload_next {
            cursor = n;
        }
        self.symbols[cursor.index()].overload_next = Some(next);
    }

    fn lookup_enclosing(&self, name: Symbol) -> Option<SymbolId> {
        let parent = self.scope(self.current).parent?;
        self.lookup_from(parent, name)
    }
}

impl<'a> Default for SymbolTable<'a> {
    fn default() -> Self {
        Self::new()
    }
}
