//! Pass 1: register every top-level function and class signature before any
//! body is visited, so a function calling one declared later in the file
//! resolves the same as calling one declared earlier — by the time any body
//! is visited in pass 2, every top-level signature is already registered
//! (§4.2's "declarations are visible throughout their enclosing scope").
//! Class members are registered in file order within this same pass, so a
//! field or parent naming a class declared later is still undefined (§4.4).

use indexmap::IndexMap;

use crate::ast::{ClassDecl, FunctionDecl, Program, Stmt};
use crate::diagnostics::{Code, Phase};
use crate::symbol::{ClassSymbol, FunctionSymbol, ParameterSymbol, Symbol};
use crate::types::Type;

use super::Analyzer;

impl Analyzer {
    pub(super) fn pass1(&mut self, program: &Program) {
        for stmt in &program.statements {
            match stmt {
                Stmt::Function(f) => self.declare_function(f),
                Stmt::Class(c) => self.declare_class(c),
                _ => {}
            }
        }
    }

    fn declare_function(&mut self, f: &FunctionDecl) {
        let params = self.resolve_params(&f.params);
        let return_type = match &f.return_type {
            Some(te) => self.resolve_type_expr(te, f.loc),
            None => Type::Void,
        };
        let symbol = FunctionSymbol::new(f.name.clone(), return_type, params);
        if !self.scopes.define_global(Symbol::Function(symbol)) {
            self.sink.error(
                Phase::Semantic,
                Code::E001,
                format!("'{}' is already declared", f.name),
                f.loc.line,
                f.loc.column,
            );
        }
    }

    fn resolve_params(&mut self, params: &[crate::ast::Param]) -> Vec<ParameterSymbol> {
        let mut offset = 8i32;
        let mut out = Vec::with_capacity(params.len());
        for (index, p) in params.iter().enumerate() {
            let ty = self.resolve_type_expr(&p.type_annotation, p.loc);
            let size = ty.size_of() as i32;
            out.push(ParameterSymbol {
                name: p.name.clone(),
                ty,
                index,
                offset,
            });
            offset += size;
        }
        out
    }

    /// Registers `c`'s name, fields, and methods in one pass, in the same
    /// top-to-bottom order pass 1 walks the program: a parent or field type
    /// naming a class declared earlier in the file resolves; one declared
    /// later does not (no separate names-first sub-pass).
    fn declare_class(&mut self, c: &ClassDecl) {
        if self.scopes.classes.contains(&c.name) {
            self.sink.error(
                Phase::Semantic,
                Code::E001,
                format!("'{}' is already declared", c.name),
                c.loc.line,
                c.loc.column,
            );
            return;
        }
        if let Some(parent) = &c.parent {
            if !self.scopes.classes.contains(parent) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E002,
                    format!("undefined base class '{parent}'"),
                    c.loc.line,
                    c.loc.column,
                );
            }
        }

        let parent_size = c
            .parent
            .as_ref()
            .and_then(|p| self.scopes.classes.get(p))
            .map(|p| p.instance_size)
            .unwrap_or(0);

        let mut class = ClassSymbol::new(c.name.clone(), c.parent.clone());
        let mut offset = parent_size as i32;
        let mut fields = IndexMap::new();
        for field in &c.fields {
            // §4.4: a field's type comes from its annotation, else its
            // initializer's type, else `integer` — with E104 suppressed at
            // this level since pass 1 never diagnoses a missing annotation
            // on a class member the way pass 2 does for a local.
            let ty = match (&field.type_annotation, &field.init) {
                (Some(te), _) => self.resolve_type_expr(te, field.loc),
                (None, Some(init)) => self.check_expr(init),
                (None, None) => Type::Integer,
            };
            if fields.contains_key(&field.name) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E001,
                    format!("field '{}' is already declared on '{}'", field.name, c.name),
                    field.loc.line,
                    field.loc.column,
                );
                continue;
            }
            let size = ty.size_of() as i32;
            fields.insert(
                field.name.clone(),
                crate::symbol::VariableSymbol {
                    name: field.name.clone(),
                    ty,
                    is_const: false,
                    storage: crate::symbol::StorageClass::Local,
                    offset,
                    nesting_level: 0,
                },
            );
            offset += size;
        }
        class.fields = fields;
        class.instance_size = offset as usize;

        let mut methods = IndexMap::new();
        for method in &c.methods {
            if methods.contains_key(&method.name) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E001,
                    format!("method '{}' is already declared on '{}'", method.name, c.name),
                    method.loc.line,
                    method.loc.column,
                );
                continue;
            }
            let params = self.resolve_params(&method.params);
            let return_type = match &method.return_type {
                Some(te) => self.resolve_type_expr(te, method.loc),
                None => Type::Void,
            };
            methods.insert(
                method.name.clone(),
                FunctionSymbol::new(format!("{}.{}", c.name, method.name), return_type, params),
            );
        }
        class.methods = methods;

        self.scopes.classes.insert(class.clone());
        self.scopes.define_global(Symbol::Class(class));
    }
}
