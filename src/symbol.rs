//! Symbol model (C2).
//!
//! Four symbol variants behind one tagged union, as the design notes in §9
//! prescribe ("model every symbol as a tagged union over Variable/
//! Parameter/Function/Class") rather than as a trait object hierarchy: the
//! analyzer and IR generator both need to match exhaustively on symbol kind,
//! which a closed enum makes a compiler-checked `match` instead of a
//! runtime downcast.

use indexmap::IndexMap;
use serde::Serialize;

use crate::types::Type;

/// Where a variable's storage lives, which determines how the IR generator
/// addresses it (`LOAD FP off` vs. `LOAD GP off`, per §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Global,
    Local,
    Param,
}

/// Tag carried by every symbol for IDE/diagnostic display, independent of
/// which `Symbol` variant it labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Class,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Variable => "variable",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableSymbol {
    pub name: String,
    pub ty: Type,
    pub is_const: bool,
    pub storage: StorageClass,
    pub offset: i32,
    pub nesting_level: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSymbol {
    pub name: String,
    pub ty: Type,
    pub index: usize,
    /// Offset relative to the frame pointer. Parameters start at offset 8
    /// per §3 (0: saved $ra, 4: saved $fp).
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSymbol {
    pub name: String,
    pub return_type: Type,
    pub params: Vec<ParameterSymbol>,
    pub start_label: Option<String>,
    pub end_label: Option<String>,
    /// Total bytes occupied by parameters in the callee's frame.
    pub param_frame_size: usize,
    /// Total bytes occupied by locals, known only after the body is visited.
    pub local_frame_size: usize,
    /// Total bytes reserved for spilled temporaries, known only after
    /// register allocation runs over the function's quadruples.
    pub temp_frame_size: usize,
}

impl FunctionSymbol {
    pub fn new(name: impl Into<String>, return_type: Type, params: Vec<ParameterSymbol>) -> Self {
        let param_frame_size = params.iter().map(|p| p.ty.size_of()).sum();
        FunctionSymbol {
            name: name.into(),
            return_type,
            params,
            start_label: None,
            end_label: None,
            param_frame_size,
            local_frame_size: 0,
            temp_frame_size: 0,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Total activation-record size: saved $ra + saved $fp + params +
    /// locals + spilled temporaries, per §3's activation-record layout.
    pub fn frame_size(&self) -> usize {
        8 + self.param_frame_size + self.local_frame_size + self.temp_frame_size
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassSymbol {
    pub name: String,
    pub fields: IndexMap<String, VariableSymbol>,
    pub methods: IndexMap<String, FunctionSymbol>,
    pub parent: Option<String>,
    /// `parent instance size + sum of own field sizes`, computed once the
    /// full field list (including the inherited prefix) is known.
    pub instance_size: usize,
}

impl ClassSymbol {
    pub fn new(name: impl Into<String>, parent: Option<String>) -> Self {
        ClassSymbol {
            name: name.into(),
            fields: IndexMap::new(),
            methods: IndexMap::new(),
            parent,
            instance_size: 0,
        }
    }

    /// Offset of a field declared directly on this class symbol (not
    /// walking inheritance — callers needing the inherited chain use
    /// [`ClassTable::field_offset`]).
    pub fn own_field_offset(&self, name: &str) -> Option<i32> {
        self.fields.get(name).map(|f| f.offset)
    }
}

/// One symbol, tagged by which variant it is.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Variable(VariableSymbol),
    Parameter(ParameterSymbol),
    Function(FunctionSymbol),
    Class(ClassSymbol),
}

impl Symbol {
    pub fn name(&self) -> &str {
        match self {
            Symbol::Variable(v) => &v.name,
            Symbol::Parameter(p) => &p.name,
            Symbol::Function(f) => &f.name,
            Symbol::Class(c) => &c.name,
        }
    }

    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Variable(_) => SymbolKind::Variable,
            Symbol::Parameter(_) => SymbolKind::Parameter,
            Symbol::Function(_) => SymbolKind::Function,
            Symbol::Class(_) => SymbolKind::Class,
        }
    }

    /// The type this symbol denotes when used as a value: a variable's or
    /// parameter's declared type, a function's return type (for call
    /// results — callers check arity/params separately), or the class type
    /// it names.
    pub fn ty(&self) -> Type {
        match self {
            Symbol::Variable(v) => v.ty.clone(),
            Symbol::Parameter(p) => p.ty.clone(),
            Symbol::Function(f) => f.return_type.clone(),
            Symbol::Class(c) => Type::Class(c.name.clone()),
        }
    }

    pub fn as_variable(&self) -> Option<&VariableSymbol> {
        match self {
            Symbol::Variable(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionSymbol> {
        match self {
            Symbol::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassSymbol> {
        match self {
            Symbol::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_class_mut(&mut self) -> Option<&mut ClassSymbol> {
        match self {
            Symbol::Class(c) => Some(c),
            _ => None,
        }
    }
}

/// Registry of every class declared in the translation unit, keyed by name.
///
/// Field and method lookup through inheritance (§4.2's `field_offset` and
/// `lookup_method`) needs to resolve a class's parent by name, which a
/// single `ClassSymbol` cannot do on its own — so this table, not the
/// symbol itself, is where the recursive walk lives. The [`crate::scope`]
/// module's global scope owns one `ClassTable` for the whole compilation.
#[derive(Debug, Clone, Default)]
pub struct ClassTable {
    classes: IndexMap<String, ClassSymbol>,
}

impl ClassTable {
    pub fn new() -> Self {
        ClassTable {
            classes: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, class: ClassSymbol) {
        self.classes.insert(class.name.clone(), class);
    }

    pub fn get(&self, name: &str) -> Option<&ClassSymbol> {
        self.classes.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ClassSymbol> {
        self.classes.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Offset of `field`, walking `class`'s inheritance chain (most-derived
    /// first) before giving up.
    pub fn field_offset(&self, class: &str, field: &str) -> Option<i32> {
        let mut current = self.classes.get(class);
        while let Some(c) = current {
            if let Some(off) = c.own_field_offset(field) {
                return Some(off);
            }
            current = c.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        None
    }

    /// Field's declared type, walking inheritance the same way.
    pub fn field_type(&self, class: &str, field: &str) -> Option<Type> {
        let mut current = self.classes.get(class);
        while let Some(c) = current {
            if let Some(f) = c.fields.get(field) {
                return Some(f.ty.clone());
            }
            current = c.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        None
    }

    /// Method lookup, walking `class`'s parent chain recursively before
    /// returning `None` — `lookup_method` in §4.2.
    pub fn lookup_method(&self, class: &str, method: &str) -> Option<&FunctionSymbol> {
        let mut current = self.classes.get(class);
        while let Some(c) = current {
            if let Some(m) = c.methods.get(method) {
                return Some(m);
            }
            current = c.parent.as_deref().and_then(|p| self.classes.get(p));
        }
        None
    }

    /// True if `descendant` is `ancestor` or inherits from it, transitively.
    pub fn is_subclass_of(&self, descendant: &str, ancestor: &str) -> bool {
        let mut current = Some(descendant);
        while let Some(name) = current {
            if name == ancestor {
                return true;
            }
            current = self.classes.get(name).and_then(|c| c.parent.as_deref());
        }
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassSymbol> {
        self.classes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, ty: Type, offset: i32) -> VariableSymbol {
        VariableSymbol {
            name: name.to_string(),
            ty,
            is_const: false,
            storage: StorageClass::Local,
            offset,
            nesting_level: 0,
        }
    }

    #[test]
    fn instance_size_is_parent_plus_own_fields() {
        let mut a = ClassSymbol::new("A", None);
        a.fields.insert("x".into(), var("x", Type::Integer, 0));
        a.instance_size = 4;

        let mut b = ClassSymbol::new("B", Some("A".into()));
        b.fields.insert("y".into(), var("y", Type::Integer, 4));
        b.instance_size = a.instance_size + 4;

        assert_eq!(b.instance_size, 8);
    }

    #[test]
    fn field_offset_and_lookup_method_walk_inheritance() {
        let mut table = ClassTable::new();

        let mut a = ClassSymbol::new("A", None);
        a.fields.insert("x".into(), var("x", Type::Integer, 0));
        a.methods.insert(
            "greet".into(),
            FunctionSymbol::new("A.greet", Type::Void, vec![]),
        );
        table.insert(a);

        let mut b = ClassSymbol::new("B", Some("A".into()));
        b.fields.insert("y".into(), var("y", Type::Integer, 4));
        table.insert(b);

        assert_eq!(table.field_offset("B", "y"), Some(4));
        assert_eq!(table.field_offset("B", "x"), Some(0));
        assert_eq!(table.field_offset("B", "z"), None);
        assert!(table.lookup_method("B", "greet").is_some());
        assert!(table.lookup_method("B", "missing").is_none());
    }

    #[test]
    fn is_subclass_of_is_transitive() {
        let mut table = ClassTable::new();
        table.insert(ClassSymbol::new("A", None));
        table.insert(ClassSymbol::new("B", Some("A".into())));
        table.insert(ClassSymbol::new("C", Some("B".into())));

        assert!(table.is_subclass_of("C", "A"));
        assert!(table.is_subclass_of("C", "C"));
        assert!(!table.is_subclass_of("A", "C"));
    }
}
