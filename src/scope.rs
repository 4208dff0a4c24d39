//! Scope stack (C3).
//!
//! Scopes form a tree via parent links, but the *stack* of currently-open
//! scopes is always a single root-to-leaf path through that tree. Following
//! §9's design note ("use arena allocation with indices to avoid cycles"),
//! every scope ever pushed lives in one arena (`Vec<Scope>`) and is
//! addressed by index; the active path is a `Vec<usize>` of arena indices,
//! never raw references, so nothing here can form a reference cycle or
//! outlive the arena.

use indexmap::IndexMap;
use serde::Serialize;

use crate::symbol::{ClassTable, Symbol, SymbolKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Class,
    Block,
}

impl ScopeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ScopeKind::Global => "GLOBAL",
            ScopeKind::Function => "FUNCTION",
            ScopeKind::Class => "CLASS",
            ScopeKind::Block => "BLOCK",
        }
    }
}

/// One lexical scope. Lives in [`ScopeStack`]'s arena; never referenced
/// directly by callers outside this module.
#[derive(Debug, Clone)]
struct Scope {
    kind: ScopeKind,
    owner: Option<String>,
    parent: Option<usize>,
    level: usize,
    symbols: IndexMap<String, Symbol>,
}

/// One entry in a [`ScopeStack::dump`] result, matching §6's
/// `{name, kind, type}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: String,
}

/// One scope in a [`ScopeStack::dump`] result, matching §6's
/// `{scope: "<KIND> <name>", entries: [...]}` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeDump {
    pub scope: String,
    pub entries: Vec<SymbolEntry>,
}

/// The scope stack. Exactly one `GLOBAL` scope sits at the bottom for the
/// entire lifetime of the stack (§3).
#[derive(Debug, Clone)]
pub struct ScopeStack {
    arena: Vec<Scope>,
    /// Arena indices of currently-open scopes, root (global) first.
    active: Vec<usize>,
    /// Declared classes, shared across the whole compilation so that
    /// inheritance walks (§4.2) can resolve a parent by name regardless of
    /// which scope is currently open.
    pub classes: ClassTable,
}

impl ScopeStack {
    /// A fresh stack with only the `GLOBAL` scope open.
    pub fn new() -> Self {
        let global = Scope {
            kind: ScopeKind::Global,
            owner: None,
            parent: None,
            level: 0,
            symbols: IndexMap::new(),
        };
        ScopeStack {
            arena: vec![global],
            active: vec![0],
            classes: ClassTable::new(),
        }
    }

    fn current_index(&self) -> usize {
        *self
            .active
            .last()
            .expect("ScopeStack always has at least the GLOBAL scope open")
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.arena[self.current_index()].kind
    }

    pub fn current_level(&self) -> usize {
        self.arena[self.current_index()].level
    }

    /// Push a new scope as a child of whichever scope is currently open.
    pub fn push(&mut self, kind: ScopeKind, owner: Option<String>) {
        let parent = self.current_index();
        let level = self.arena[parent].level + 1;
        let new_index = self.arena.len();
        self.arena.push(Scope {
            kind,
            owner,
            parent: Some(parent),
            level,
            symbols: IndexMap::new(),
        });
        self.active.push(new_index);
    }

    /// Pop the current scope. Returns `Err(())` if asked to pop the `GLOBAL`
    /// scope, which must remain open for the lifetime of the stack (§4.2).
    pub fn pop(&mut self) -> Result<(), ()> {
        if self.active.len() <= 1 {
            return Err(());
        }
        self.active.pop();
        Ok(())
    }

    /// Define a symbol in the current scope. Returns `false` (E001 per §4.2)
    /// if a symbol with the same name already exists in *this* scope —
    /// shadowing an outer scope's symbol is always permitted.
    pub fn define(&mut self, symbol: Symbol) -> bool {
        let idx = self.current_index();
        let scope = &mut self.arena[idx];
        if scope.symbols.contains_key(symbol.name()) {
            false
        } else {
            scope.symbols.insert(symbol.name().to_string(), symbol);
            true
        }
    }

    /// Resolve `name` by walking from the current scope up through parents.
    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        let mut idx = Some(self.current_index());
        while let Some(i) = idx {
            if let Some(sym) = self.arena[i].symbols.get(name) {
                return Some(sym);
            }
            idx = self.arena[i].parent;
        }
        None
    }

    /// Resolve `name`, but only within the current scope (no parent walk).
    /// Used to check for shadowing-vs-redeclaration distinctly from
    /// `resolve`.
    pub fn resolve_local(&self, name: &str) -> Option<&Symbol> {
        self.arena[self.current_index()].symbols.get(name)
    }

    /// Mutable access to a symbol already defined in the current scope, for
    /// passes that need to update it in place (e.g. recording a function's
    /// frame size after its body is visited).
    pub fn resolve_local_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        let idx = self.current_index();
        self.arena[idx].symbols.get_mut(name)
    }

    /// Resolve `name` in the GLOBAL scope directly, regardless of current
    /// nesting — used by the IR generator to find top-level function
    /// symbols from anywhere in a call expression.
    pub fn resolve_global(&self, name: &str) -> Option<&Symbol> {
        self.arena[0].symbols.get(name)
    }

    /// Every variable declared directly in the GLOBAL scope, in declaration
    /// order — consulted by the MIPS emitter to seed `.data` with one
    /// labeled word per global and to resolve a `LOAD`/`STORE` through
    /// `GP` back to the name that offset belongs to.
    pub fn global_variables(&self) -> impl Iterator<Item = &crate::symbol::VariableSymbol> {
        self.arena[0].symbols.values().filter_map(Symbol::as_variable)
    }

    pub fn resolve_global_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.arena[0].symbols.get_mut(name)
    }

    pub fn define_global(&mut self, symbol: Symbol) -> bool {
        let scope = &mut self.arena[0];
        if scope.symbols.contains_key(symbol.name()) {
            false
        } else {
            scope.symbols.insert(symbol.name().to_string(), symbol);
            true
        }
    }

    /// Ordered dump of every scope ever pushed, in first-push (arena) order,
    /// matching §6's symbol-table dump contract.
    pub fn dump(&self) -> Vec<ScopeDump> {
        self.arena
            .iter()
            .map(|scope| {
                let label = match &scope.owner {
                    Some(owner) => format!("{} {}", scope.kind.as_str(), owner),
                    None => scope.kind.as_str().to_string(),
                };
                let entries = scope
                    .symbols
                    .values()
                    .map(|sym| SymbolEntry {
                        name: sym.name().to_string(),
                        kind: sym.kind(),
                        ty: sym.ty().to_string(),
                    })
                    .collect();
                ScopeDump {
                    scope: label,
                    entries,
                }
            })
            .collect()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{StorageClass, VariableSymbol};
    use crate::types::Type;

    fn var(name: &str) -> Symbol {
        Symbol::Variable(VariableSymbol {
            name: name.to_string(),
            ty: Type::Integer,
            is_const: false,
            storage: StorageClass::Local,
            offset: 0,
            nesting_level: 0,
        })
    }

    #[test]
    fn global_scope_cannot_be_popped() {
        let mut stack = ScopeStack::new();
        assert_eq!(stack.pop(), Err(()));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut stack = ScopeStack::new();
        assert!(stack.define(var("x")));
        assert!(!stack.define(var("x")));
    }

    #[test]
    fn shadowing_across_scopes_is_allowed() {
        let mut stack = ScopeStack::new();
        assert!(stack.define(var("x")));
        stack.push(ScopeKind::Block, None);
        assert!(stack.define(var("x")));
        assert!(stack.resolve("x").is_some());
        stack.pop().unwrap();
        assert!(stack.resolve("x").is_some());
    }

    #[test]
    fn resolve_walks_parent_chain() {
        let mut stack = ScopeStack::new();
        stack.define(var("outer"));
        stack.push(ScopeKind::Block, None);
        stack.push(ScopeKind::Block, None);
        assert!(stack.resolve("outer").is_some());
        assert!(stack.resolve_local("outer").is_none());
    }

    #[test]
    fn dump_preserves_first_push_order() {
        let mut stack = ScopeStack::new();
        stack.push(ScopeKind::Function, Some("main".into()));
        stack.push(ScopeKind::Block, None);
        let dump = stack.dump();
        assert_eq!(dump.len(), 3);
        assert_eq!(dump[0].scope, "GLOBAL");
        assert_eq!(dump[1].scope, "FUNCTION main");
        assert_eq!(dump[2].scope, "BLOCK");
    }
}
