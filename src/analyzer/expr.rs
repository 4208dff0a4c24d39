//! Expression type-checking (§4.4's "Expression" rules), including the
//! left-to-right suffix-chain fold (`a.b[c](d).e`) that threads a
//! [`Callable`] alongside the running [`Type`] so a `Call` suffix can
//! validate arity/argument types against the right signature.

use crate::ast::{BinaryOp, Expr, SourceLocation, UnaryOp};
use crate::diagnostics::{Code, Phase};
use crate::types::{self, Type};

use super::{Analyzer, Callable, FunctionSignature};

impl Analyzer {
    /// Type-check `expr` and return only its type, discarding whether it
    /// named something callable. Used by every caller that isn't itself
    /// folding a suffix chain.
    pub(super) fn check_expr(&mut self, expr: &Expr) -> Type {
        self.check_chain(expr).0
    }

    /// Type-check `expr`, also reporting what it resolves to when called.
    /// Literals, operators, and anything other than an identifier/field/
    /// call/index chain always report [`Callable::None`].
    pub(super) fn check_chain(&mut self, expr: &Expr) -> (Type, Callable) {
        match expr {
            Expr::IntLiteral(..) => (Type::Integer, Callable::None),
            Expr::FloatLiteral(..) => (Type::Float, Callable::None),
            Expr::BoolLiteral(..) => (Type::Boolean, Callable::None),
            Expr::StringLiteral(..) => (Type::String, Callable::None),
            Expr::NullLiteral(_) => (Type::Null, Callable::None),

            Expr::Identifier(name, loc) => self.check_identifier(name, *loc),

            Expr::This(loc) => match &self.current_class {
                Some(class) => (Type::Class(class.clone()), Callable::None),
                None => {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E301,
                        "'this' used outside a class method",
                        loc.line,
                        loc.column,
                    );
                    (Type::Integer, Callable::None)
                }
            },

            Expr::New { class_name, args, loc } => {
                (self.check_new(class_name, args, *loc), Callable::None)
            }

            Expr::ArrayLiteral { elements, loc } => {
                (self.check_array_literal(elements, *loc), Callable::None)
            }

            Expr::Unary { op, operand, loc } => (self.check_unary(*op, operand, *loc), Callable::None),

            Expr::Binary { op, lhs, rhs, loc } => {
                (self.check_binary(*op, lhs, rhs, *loc), Callable::None)
            }

            Expr::Ternary {
                cond,
                then_branch,
                else_branch,
                loc,
            } => (self.check_ternary(cond, then_branch, else_branch, *loc), Callable::None),

            Expr::Call { callee, args, loc } => (self.check_call(callee, args, *loc), Callable::None),

            Expr::Index { object, index, loc } => {
                (self.check_index(object, index, *loc), Callable::None)
            }

            Expr::Field { object, name, id, loc } => self.check_field(object, name, *id, *loc),
        }
    }

    fn check_identifier(&mut self, name: &str, loc: SourceLocation) -> (Type, Callable) {
        match self.scopes.resolve(name) {
            Some(sym) => {
                let ty = sym.ty();
                let callable = match sym.as_function() {
                    Some(f) => Callable::Function(FunctionSignature {
                        params: f.params.iter().map(|p| p.ty.clone()).collect(),
                        return_type: f.return_type.clone(),
                    }),
                    None => Callable::None,
                };
                (ty, callable)
            }
            None => match crate::builtins::lookup(name) {
                Some(builtin) => (builtin.return_type(), Callable::Builtin(builtin)),
                None => {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E002,
                        format!("undefined name '{name}'"),
                        loc.line,
                        loc.column,
                    );
                    (Type::Integer, Callable::None)
                }
            },
        }
    }

    fn check_new(&mut self, class_name: &str, args: &[Expr], loc: SourceLocation) -> Type {
        if !self.scopes.classes.contains(class_name) {
            self.sink.error(
                Phase::Semantic,
                Code::E002,
                format!("undefined class '{class_name}'"),
                loc.line,
                loc.column,
            );
            for a in args {
                self.check_expr(a);
            }
            return Type::Integer;
        }
        // §4.4: `new Name(args)` yields the class type; argument expressions
        // are still checked for their own diagnostics, but no arity check is
        // performed against the constructor here.
        for a in args {
            self.check_expr(a);
        }
        Type::Class(class_name.to_string())
    }

    fn check_array_literal(&mut self, elements: &[Expr], loc: SourceLocation) -> Type {
        if elements.is_empty() {
            return Type::array_of(Type::Integer);
        }
        let first = self.check_expr(&elements[0]);
        for el in &elements[1..] {
            let ty = self.check_expr(el);
            if !types::compatible(&first, &ty) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E101,
                    format!("array element type '{ty}' incompatible with '{first}'"),
                    el.loc().line,
                    el.loc().column,
                );
            }
        }
        Type::array_of(first)
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr, loc: SourceLocation) -> Type {
        let ty = self.check_expr(operand);
        match op {
            UnaryOp::Neg => {
                if !ty.is_numeric() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot negate '{ty}'"),
                        loc.line,
                        loc.column,
                    );
                    Type::Integer
                } else {
                    ty
                }
            }
            UnaryOp::Not => {
                if !ty.is_boolean() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot negate '{ty}' as boolean"),
                        loc.line,
                        loc.column,
                    );
                }
                Type::Boolean
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, loc: SourceLocation) -> Type {
        let lty = self.check_expr(lhs);
        let rty = self.check_expr(rhs);
        match op {
            BinaryOp::Add if lty.is_string() || rty.is_string() => {
                if !(lty.is_string() && rty.is_string()) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot concatenate '{lty}' and '{rty}'"),
                        loc.line,
                        loc.column,
                    );
                }
                Type::String
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lty.is_numeric() && rty.is_numeric() {
                    types::arithmetic_result(&lty, &rty)
                } else {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("arithmetic operator requires numeric operands, got '{lty}' and '{rty}'"),
                        loc.line,
                        loc.column,
                    );
                    Type::Integer
                }
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                if !types::compatible(&lty, &rty) && !types::compatible(&rty, &lty) {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("cannot compare '{lty}' and '{rty}'"),
                        loc.line,
                        loc.column,
                    );
                }
                Type::Boolean
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if !lty.is_numeric() || !rty.is_numeric() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("relational operator requires numeric operands, got '{lty}' and '{rty}'"),
                        loc.line,
                        loc.column,
                    );
                }
                Type::Boolean
            }
            BinaryOp::And | BinaryOp::Or => {
                if !lty.is_boolean() || !rty.is_boolean() {
                    self.sink.error(
                        Phase::Semantic,
                        Code::E101,
                        format!("logical operator requires boolean operands, got '{lty}' and '{rty}'"),
                        loc.line,
                        loc.column,
                    );
                }
                Type::Boolean
            }
        }
    }

    /// Per the resolved open question: the ternary's type is always its
    /// then-branch's type. The else-branch is still fully type-checked (for
    /// its own diagnostics) but never unified against the then-branch.
    fn check_ternary(
        &mut self,
        cond: &Expr,
        then_branch: &Expr,
        else_branch: &Expr,
        loc: SourceLocation,
    ) -> Type {
        let cond_ty = self.check_expr(cond);
        if !cond_ty.is_boolean() {
            self.sink.error(
                Phase::Semantic,
                Code::E101,
                format!("ternary condition must be boolean, got '{cond_ty}'"),
                loc.line,
                loc.column,
            );
        }
        let then_ty = self.check_expr(then_branch);
        let _else_ty = self.check_expr(else_branch);
        then_ty
    }

    fn check_call(&mut self, callee: &Expr, args: &[Expr], loc: SourceLocation) -> Type {
        let (_, callable) = self.check_chain(callee);
        let arg_types: Vec<Type> = args.iter().map(|a| self.check_expr(a)).collect();
        match callable {
            Callable::None => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E101,
                    "called value is not callable",
                    loc.line,
                    loc.column,
                );
                Type::Integer
            }
            Callable::Function(sig) | Callable::Method(sig) => {
                self.check_arity_and_types(&sig.params, &arg_types, loc);
                sig.return_type
            }
            Callable::Builtin(builtin) => {
                match builtin.params() {
                    Some(expected) => self.check_arity_and_types(expected, &arg_types, loc),
                    None if arg_types.len() != 1 => {
                        self.sink.error(
                            Phase::Semantic,
                            Code::E102,
                            format!("'{}' expects exactly 1 argument, got {}", builtin.name(), arg_types.len()),
                            loc.line,
                            loc.column,
                        );
                    }
                    None => {}
                }
                builtin.return_type()
            }
        }
    }

    fn check_arity_and_types(&mut self, expected: &[Type], actual: &[Type], loc: SourceLocation) {
        if expected.len() != actual.len() {
            self.sink.error(
                Phase::Semantic,
                Code::E102,
                format!("expected {} argument(s), got {}", expected.len(), actual.len()),
                loc.line,
                loc.column,
            );
            return;
        }
        for (exp, act) in expected.iter().zip(actual.iter()) {
            if !types::compatible(exp, act) {
                self.sink.error(
                    Phase::Semantic,
                    Code::E102,
                    format!("argument type '{act}' incompatible with parameter type '{exp}'"),
                    loc.line,
                    loc.column,
                );
            }
        }
    }

    fn check_index(&mut self, object: &Expr, index: &Expr, loc: SourceLocation) -> Type {
        let object_ty = self.check_expr(object);
        let index_ty = self.check_expr(index);
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
            Some(elem) => elem.clone(),
            None => {
                self.sink.error(
                    Phase::Semantic,
                    Code::E101,
                    format!("cannot index non-array type '{object_ty}'"),
                    loc.line,
                    loc.column,
                );
                Type::Integer
            }
        }
    }

    fn check_field(
        &mut self,
        object: &Expr,
        name: &str,
        id: u32,
        loc: SourceLocation,
    ) -> (Type, Callable) {
        let object_ty = self.check_expr(object);
        let Some(class_name) = object_ty.class_name() else {
            self.sink.error(
                Phase::Semantic,
                Code::E301,
                format!("cannot access member '{name}' on non-class type '{object_ty}'"),
                loc.line,
                loc.column,
            );
            return (Type::Integer, Callable::None);
        };
        let class_name = class_name.to_string();

        if let Some(field_ty) = self.scopes.classes.field_type(&class_name, name) {
            if let Some(offset) = self.scopes.classes.field_offset(&class_name, name) {
                self.field_refs.insert(
                    id,
                    super::FieldRef {
                        class: class_name.clone(),
                        offset,
                    },
                );
            }
            return (field_ty, Callable::None);
        }
        if let Some(method) = self.scopes.classes.lookup_method(&class_name, name) {
            let sig = FunctionSignature {
                params: method.params.iter().map(|p| p.ty.clone()).collect(),
                return_type: method.return_type.clone(),
            };
            self.method_refs.insert(id, (class_name, name.to_string()));
            return (sig.return_type.clone(), Callable::Method(sig));
        }

        self.sink.error(
            Phase::Semantic,
            Code::E301,
            format!("'{class_name}' has no field or method named '{name}'"),
            loc.line,
            loc.column,
        );
        (Type::Integer, Callable::None)
    }
}
