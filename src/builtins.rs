//! Built-in function signatures.
//!
//! §8's end-to-end scenarios call `print(x)` without ever declaring it, so
//! the front end treats a small closed set of names as callable even though
//! no `FunctionSymbol` exists for them. Grounded on the teacher's
//! `builtin_signature`/`builtin_signatures` map-lookup pattern, trimmed to
//! the two names Compiscript actually needs.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::Type;

/// One of the names the analyzer resolves without a user declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    Read,
}

impl Builtin {
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Read => "read",
        }
    }

    /// Accepted parameter types, by position. `print` accepts any single
    /// argument (its IR lowering picks `PRINT` for either operand kind), so
    /// this returns `None` for "don't type-check the argument list".
    pub fn params(self) -> Option<&'static [Type]> {
        match self {
            Builtin::Print => None,
            Builtin::Read => Some(&[]),
        }
    }

    pub fn return_type(self) -> Type {
        match self {
            Builtin::Print => Type::Void,
            Builtin::Read => Type::String,
        }
    }
}

fn table() -> &'static HashMap<&'static str, Builtin> {
    static TABLE: OnceLock<HashMap<&'static str, Builtin>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert("print", Builtin::Print);
        map.insert("read", Builtin::Read);
        map
    })
}

/// Resolve a bare identifier to a builtin, consulted only after scope
/// resolution fails — a user declaration of the same name always wins.
pub fn lookup(name: &str) -> Option<Builtin> {
    table().get(name).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_names() {
        assert_eq!(lookup("print"), Some(Builtin::Print));
        assert_eq!(lookup("read"), Some(Builtin::Read));
        assert_eq!(lookup("printf"), None);
    }

    #[test]
    fn print_accepts_any_single_argument() {
        assert!(Builtin::Print.params().is_none());
    }
}
