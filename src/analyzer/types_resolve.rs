//! `TypeExpr` → `Type` resolution: the one place a parsed type annotation is
//! checked against the class table and turned into the semantic `Type` the
//! rest of the analyzer works with.

use crate::ast::{SourceLocation, TypeExpr};
use crate::diagnostics::{Code, Phase};
use crate::types::Type;

use super::Analyzer;

impl Analyzer {
    /// Resolve a parsed type annotation. `Named("Foo")` only resolves if
    /// `Foo` is a declared class; otherwise this records `E002` (undefined
    /// name) and returns `Type::Integer` as the graceful-degradation
    /// placeholder so the caller can keep checking the rest of the program
    /// (§7).
    pub(super) fn resolve_type_expr(&mut self, te: &TypeExpr, loc: SourceLocation) -> Type {
        match te {
            TypeExpr::Integer => Type::Integer,
            TypeExpr::Float => Type::Float,
            TypeExpr::Boolean => Type::Boolean,
            TypeExpr::String => Type::String,
            TypeExpr::Void => Type::Void,
            TypeExpr::Array(elem) => Type::array_of(self.resolve_type_expr(elem, loc)),
            TypeExpr::Named(name) => {
                if self.scopes.classes.contains(name) {
                    Type::Class(name.clone())
                } else {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E002,
                        format!("undefined type '{name}'"),
                        loc.line,
                        loc.column,
                    );
                    Type::Integer
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ClassSymbol;

    #[test]
    fn named_type_resolves_to_declared_class() {
        let mut analyzer = Analyzer::new();
        analyzer.scopes.classes.insert(ClassSymbol::new("Point", None));
        let ty = analyzer.resolve_type_expr(
            &TypeExpr::Named("Point".into()),
            SourceLocation::new(1, 1),
        );
        assert_eq!(ty, Type::Class("Point".into()));
        assert!(analyzer.sink.is_empty());
    }

    #[test]
    fn undefined_named_type_emits_e002() {
        let mut analyzer = Analyzer::new();
        let ty = analyzer.resolve_type_expr(
            &TypeExpr::Named("Ghost".into()),
            SourceLocation::new(2, 3),
        );
        assert_eq!(ty, Type::Integer);
        assert_eq!(analyzer.sink.len(), 1);
    }

    #[test]
    fn array_type_resolves_element_recursively() {
        let mut analyzer = Analyzer::new();
        let ty = analyzer.resolve_type_expr(
            &TypeExpr::Array(Box::new(TypeExpr::Integer)),
            SourceLocation::new(1, 1),
        );
        assert_eq!(ty, Type::array_of(Type::Integer));
    }
}
