//! Pass 2: visit every statement, threading [`Reachability`] so that any
//! statement following an unconditional `return`/`break`/`continue` (or a
//! block whose every path already cut) is flagged `E500` without stopping
//! the walk (§4.4, §9).

use crate::ast::{ClassDecl, FunctionDecl, Program, SourceLocation, Stmt};
use crate::diagnostics::{Code, Phase};
use crate::scope::ScopeKind;
use crate::symbol::{StorageClass, Symbol, VariableSymbol};
use crate::types::{self, Type};

use super::{Analyzer, FunctionContext, Reachability};

impl Analyzer {
    pub(super) fn pass2(&mut self, program: &Program) {
        for stmt in &program.statements {
            match stmt {
                Stmt::Function(f) => self.visit_function_decl(f, None),
                Stmt::Class(c) => self.visit_class_decl(c),
                other => {
                    self.visit_stmt(other);
                }
            }
        }
    }

    fn visit_function_decl(&mut self, f: &FunctionDecl, owner_class: Option<&str>) {
        let label_owner = match owner_class {
            Some(class) => format!("{class}.{}", f.name),
            None => f.name.clone(),
        };
        let (params, return_type) = self
            .lookup_function_params_and_return(owner_class, &f.name)
            .unwrap_or_else(|| (Vec::new(), Type::Void));

        self.scopes.push(ScopeKind::Function, Some(label_owner.clone()));
        self.current_function = Some(FunctionContext {
            name: label_owner.clone(),
            return_type: return_type.clone(),
        });
        self.loop_depth = 0;

        let mut offset = 8i32;
        for (p, resolved) in f.params.iter().zip(params.into_iter()) {
            offset = resolved.offset + resolved.ty.size_of() as i32;
            if !self.scopes.define(Symbol::Parameter(resolved)) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E001,
                    format!("parameter '{}' is already declared", p.name),
                    p.loc.line,
                    p.loc.column,
                );
            }
        }
        self.local_offset = offset;

        let mut reachability = Reachability::Normal;
        for stmt in &f.body {
            if reachability == Reachability::Cut {
                let loc = stmt.loc();
                self.sink.error(
                    Phase::Semantic,
                    Code::E500,
                    "unreachable statement",
                    loc.line,
                    loc.column,
                );
            }
            reachability = self.visit_stmt(stmt);
        }

        let local_frame_size = (self.local_offset - offset).max(0) as usize;
        self.current_function = None;
        self.scopes.pop().ok();

        self.write_back_function_layout(owner_class, &f.name, &label_owner, local_frame_size);
    }

    fn lookup_function_params_and_return(
        &self,
        owner_class: Option<&str>,
        name: &str,
    ) -> Option<(Vec<crate::symbol::ParameterSymbol>, Type)> {
        match owner_class {
            Some(class) => self
                .scopes
                .classes
                .lookup_method(class, name)
                .map(|m| (m.params.clone(), m.return_type.clone())),
            None => self
                .scopes
                .resolve_global(name)
                .and_then(Symbol::as_function)
                .map(|f| (f.params.clone(), f.return_type.clone())),
        }
    }

    fn write_back_function_layout(
        &mut self,
        owner_class: Option<&str>,
        name: &str,
        label: &str,
        local_frame_size: usize,
    ) {
        let start_label = format!("{label}_start");
        let end_label = format!("{label}_end");
        match owner_class {
            Some(class) => {
                if let Some(method) = self
                    .scopes
                    .classes
                    .get_mut(class)
                    .and_then(|c| c.methods.get_mut(name))
                {
                    method.local_frame_size = local_frame_size;
                    method.start_label = Some(start_label);
                    method.end_label = Some(end_label);
                }
            }
            None => {
                if let Some(Symbol::Function(f)) = self.scopes.resolve_global_mut(name) {
                    f.local_frame_size = local_frame_size;
                    f.start_label = Some(start_label);
                    f.end_label = Some(end_label);
                }
            }
        }
    }

    fn visit_class_decl(&mut self, c: &ClassDecl) {
        self.current_class = Some(c.name.clone());
        self.scopes.push(ScopeKind::Class, Some(c.name.clone()));
        for method in &c.methods {
            self.visit_function_decl(method, Some(&c.name));
        }
        self.scopes.pop().ok();
        self.current_class = None;
    }

    /// Visit one statement and return whether control falls through.
    pub(super) fn visit_stmt(&mut self, stmt: &Stmt) -> Reachability {
        match stmt {
            Stmt::VarDecl {
                name,
                type_annotation,
                init,
                loc,
            } => self.visit_var_decl(name, type_annotation.as_ref(), init.as_ref(), *loc, false),
            Stmt::ConstDecl {
                name,
                type_annotation,
                init,
                loc,
            } => self.visit_var_decl(name, type_annotation.as_ref(), Some(init), *loc, true),

            Stmt::Assign { name, value, loc } => {
                self.visit_assign(name, value, *loc);
                Reachability::Normal
            }
            Stmt::PropertyAssign {
                object,
                field,
                value,
                id,
                loc,
            } => {
                self.visit_property_assign(object, field, value, *id, *loc);
                Reachability::Normal
            }
            Stmt::IndexAssign {
                object,
                index,
                value,
                loc,
            } => {
                self.visit_index_assign(object, index, value, *loc);
                Reachability::Normal
            }

            Stmt::If {
                cond,
                then_branch,
                else_branch,
                loc,
            } => self.visit_if(cond, then_branch, else_branch.as_deref(), *loc),

            Stmt::While { cond, body, loc } => {
                self.visit_loop_cond(cond, *loc);
                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
                Reachability::Normal
            }
            Stmt::DoWhile { body, cond, loc } => {
                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
                self.visit_loop_cond(cond, *loc);
                Reachability::Normal
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                loc,
            } => {
                self.scopes.push(ScopeKind::Block, None);
                if let Some(init) = init {
                    self.visit_stmt(init);
                }
                if let Some(cond) = cond {
                    self.visit_loop_cond(cond, *loc);
                }
                if let Some(step) = step {
                    self.visit_stmt(step);
                }
                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
                self.scopes.pop().ok();
                Reachability::Normal
            }
            Stmt::Foreach {
                var_name,
                iterable,
                body,
                loc,
            } => {
                let iterable_ty = self.check_expr(iterable);
                let elem_ty = match iterable_ty.array_element() {
                    Some(e) => e.clone(),
                    None => {
                        self.sink.error(
                            Phase::Semantic,
                            Code::E101,
                            format!("cannot iterate non-array type '{iterable_ty}'"),
                            loc.line,
                            loc.column,
                        );
                        Type::Integer
                    }
                };
                self.scopes.push(ScopeKind::Block, None);
                self.declare_local(var_name, elem_ty, false, *loc);
                self.loop_depth += 1;
                self.visit_stmt(body);
                self.loop_depth -= 1;
                self.scopes.pop().ok();
                Reachability::Normal
            }

            Stmt::Break(loc) => {
                if self.loop_depth == 0 {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E201,
                        "'break' outside a loop",
                        loc.line,
                        loc.column,
                    );
                }
                Reachability::Cut
            }
            Stmt::Continue(loc) => {
                if self.loop_depth == 0 {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E201,
                        "'continue' outside a loop",
                        loc.line,
                        loc.column,
                    );
                }
                Reachability::Cut
            }
            Stmt::Return { value, loc } => {
                self.visit_return(value.as_ref(), *loc);
                Reachability::Cut
            }

            Stmt::Switch {
                scrutinee,
                cases,
                default,
                loc,
            } => self.visit_switch(scrutinee, cases, default.as_deref(), *loc),

            Stmt::Block(stmts, _) => self.visit_block(stmts),

            Stmt::ExprStmt(e) => {
                self.check_expr(e);
                Reachability::Normal
            }

            Stmt::Function(f) => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E999,
                    "nested function declarations are not supported",
                    f.loc.line,
                    f.loc.column,
                );
                Reachability::Normal
            }
            Stmt::Class(c) => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E999,
                    "nested class declarations are not supported",
                    c.loc.line,
                    c.loc.column,
                );
                Reachability::Normal
            }
        }
    }

    fn visit_block(&mut self, stmts: &[Stmt]) -> Reachability {
        self.scopes.push(ScopeKind::Block, None);
        let mut reachability = Reachability::Normal;
        for stmt in stmts {
            if reachability == Reachability::Cut {
                let loc = stmt.loc();
                self.sink.error(
                    Phase::Semantic,
                    Code::E500,
                    "unreachable statement",
                    loc.line,
                    loc.column,
                );
            }
            reachability = self.visit_stmt(stmt);
        }
        self.scopes.pop().ok();
        reachability
    }

    fn declare_local(&mut self, name: &str, ty: Type, is_const: bool, loc: SourceLocation) {
        let in_function = self.current_function.is_some();
        let symbol = if in_function {
            let offset = self.local_offset;
            self.local_offset += ty.size_of() as i32;
            Symbol::Variable(VariableSymbol {
                name: name.to_string(),
                ty,
                is_const,
                storage: StorageClass::Local,
                offset,
                nesting_level: self.scopes.current_level(),
            })
        } else {
            let offset = self.global_offset;
            self.global_offset += ty.size_of() as i32;
            Symbol::Variable(VariableSymbol {
                name: name.to_string(),
                ty,
                is_const,
                storage: StorageClass::Global,
                offset,
                nesting_level: 0,
            })
        };
        if !self.scopes.define(symbol) {
            self.sink.error(
                Phase::Semantic,
                Code::E001,
                format!("'{name}' is already declared"),
                loc.line,
                loc.column,
            );
        }
    }

    fn visit_var_decl(
        &mut self,
        name: &str,
        type_annotation: Option<&crate::ast::TypeExpr>,
        init: Option<&crate::ast::Expr>,
        loc: SourceLocation,
        is_const: bool,
    ) -> Reachability {
        let declared_ty = type_annotation.map(|te| self.resolve_type_expr(te, loc));
        let init_ty = init.map(|e| self.check_expr(e));

        let ty = match (declared_ty, init_ty.clone()) {
            (Some(d), Some(i)) => {
                if !types::compatible(&d, &i) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot initialize '{name}' of type '{d}' with '{i}'"),
                        loc.line,
                        loc.column,
                    );
                }
                d
            }
            (Some(d), None) => d,
            (None, Some(i)) => i,
            (None, None) => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E104,
                    format!("'{name}' needs either a type annotation or an initializer"),
                    loc.line,
                    loc.column,
                );
                Type::Integer
            }
        };
        self.declare_local(name, ty, is_const, loc);
        Reachability::Normal
    }

    fn visit_assign(&mut self, name: &str, value: &crate::ast::Expr, loc: SourceLocation) {
        let value_ty = self.check_expr(value);
        match self.scopes.resolve(name) {
            Some(Symbol::Variable(v)) => {
                if v.is_const {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E202,
                        format!("cannot assign to const '{name}'"),
                        loc.line,
                        loc.column,
                    );
                } else if !types::compatible(&v.ty, &value_ty) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot assign '{value_ty}' to '{name}' of type '{}'", v.ty),
                        loc.line,
                        loc.column,
                    );
                }
            }
            Some(Symbol::Parameter(p)) => {
                if !types::compatible(&p.ty, &value_ty) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot assign '{value_ty}' to '{name}' of type '{}'", p.ty),
                        loc.line,
                        loc.column,
                    );
                }
            }
            Some(_) => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E002,
                    format!("'{name}' is not assignable"),
                    loc.line,
                    loc.column,
                );
            }
            None => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E002,
                    format!("undefined name '{name}'"),
                    loc.line,
                    loc.column,
                );
            }
        }
    }

    fn visit_property_assign(
        &mut self,
        object: &crate::ast::Expr,
        field: &str,
        value: &crate::ast::Expr,
        id: u32,
        loc: SourceLocation,
    ) {
        let object_ty = self.check_expr(object);
        let value_ty = self.check_expr(value);
        let Some(class_name) = object_ty.class_name() else {
            self.sink.error(
                Phase::Semantic,
                Code::E301,
                format!("cannot access member '{field}' on non-class type '{object_ty}'"),
                loc.line,
                loc.column,
            );
            return;
        };
        match self.scopes.classes.field_type(class_name, field) {
            Some(field_ty) => {
                if !types::compatible(&field_ty, &value_ty) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot assign '{value_ty}' to field '{field}' of type '{field_ty}'"),
                        loc.line,
                        loc.column,
                    );
                }
                if let Some(offset) = self.scopes.classes.field_offset(class_name, field) {
                    self.field_refs.insert(
                        id,
                        super::FieldRef {
                            class: class_name.to_string(),
                            offset,
                        },
                    );
                }
            }
            None => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E301,
                    format!("'{class_name}' has no field named '{field}'"),
                    loc.line,
                    loc.column,
                );
            }
        }
    }

    fn visit_index_assign(
        &mut self,
        object: &crate::ast::Expr,
        index: &crate::ast::Expr,
        value: &crate::ast::Expr,
        loc: SourceLocation,
    ) {
        let object_ty = self.check_expr(object);
        let index_ty = self.check_expr(index);
        let value_ty = self.check_expr(value);
        if !index_ty.is_integer() {
            self.sink.error(
                Phase::Semantic,
                Code::E401,
                format!("array index must be integer, got '{index_ty}'"),
                loc.line,
                loc.column,
            );
        }
        match object_ty.array_element() {
            Some(elem) => {
                if !types::compatible(elem, &value_ty) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot assign '{value_ty}' into array of '{elem}'"),
                        loc.line,
                        loc.column,
                    );
                }
            }
            None => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E101,
                    format!("cannot index non-array type '{object_ty}'"),
                    loc.line,
                    loc.column,
                );
            }
        }
    }

    /// `if` cuts only when both branches are present and both cut — §9's
    /// documented extension of the "cut" rule to two-armed conditionals.
    fn visit_if(
        &mut self,
        cond: &crate::ast::Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
        loc: SourceLocation,
    ) -> Reachability {
        let cond_ty = self.check_expr(cond);
        if !cond_ty.is_boolean() {
            self.sink.error(
                Phase::Semantic,
                Code::E101,
                format!("'if' condition must be boolean, got '{cond_ty}'"),
                loc.line,
                loc.column,
            );
        }
        let then_r = self.visit_stmt(then_branch);
        match else_branch {
            Some(else_stmt) => {
                let else_r = self.visit_stmt(else_stmt);
                Reachability::merge_both_required(then_r, else_r)
            }
            None => Reachability::Normal,
        }
    }

    fn visit_loop_cond(&mut self, cond: &crate::ast::Expr, loc: SourceLocation) {
        let ty = self.check_expr(cond);
        if !ty.is_boolean() {
            self.sink.error(
                Phase::Semantic,
                Code::E101,
                format!("loop condition must be boolean, got '{ty}'"),
                loc.line,
                loc.column,
            );
        }
    }

    fn visit_return(&mut self, value: Option<&crate::ast::Expr>, loc: SourceLocation) {
        let Some(ctx) = self.current_function.as_ref() else {
            self.sink.error(
                Phase::Semantic,
                Code::E103,
                "'return' outside a function",
                loc.line,
                loc.column,
            );
            if let Some(value) = value {
                self.check_expr(value);
            }
            return;
        };
        let expected = ctx.return_type.clone();
        match value {
            Some(expr) => {
                let actual = self.check_expr(expr);
                if expected.is_void() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E103,
                        "function is declared void but returns a value",
                        loc.line,
                        loc.column,
                    );
                } else if !types::compatible(&expected, &actual) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E103,
                        format!("return type '{actual}' incompatible with declared '{expected}'"),
                        loc.line,
                        loc.column,
                    );
                }
            }
            None => {
                if !expected.is_void() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E103,
                        format!("function must return a value of type '{expected}'"),
                        loc.line,
                        loc.column,
                    );
                }
            }
        }
    }

    fn visit_switch(
        &mut self,
        scrutinee: &crate::ast::Expr,
        cases: &[crate::ast::SwitchCase],
        default: Option<&[Stmt]>,
        _loc: SourceLocation,
    ) -> Reachability {
        let scrutinee_ty = self.check_expr(scrutinee);
        let mut all_cases_cut = !cases.is_empty() || default.is_some();
        for case in cases {
            let case_ty = self.check_expr(&case.value);
            if !types::compatible(&scrutinee_ty, &case_ty) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E302,
                    format!("case type '{case_ty}' incompatible with switch type '{scrutinee_ty}'"),
                    case.loc.line,
                    case.loc.column,
                );
            }
            let r = self.visit_block(&case.body);
            if r != Reachability::Cut {
                all_cases_cut = false;
            }
        }
        if let Some(default_body) = default {
            let r = self.visit_block(default_body);
            if r != Reachability::Cut {
                all_cases_cut = false;
            }
        } else {
            all_cases_cut = false;
        }
        if all_cases_cut {
            Reachability::Cut
        } else {
            Reachability::Normal
        }
    }
}
