//! Parse-tree shapes (the collaborator described abstractly in §6).
//!
//! Nothing upstream of this crate hands it a parse tree, so this module
//! defines the node shapes §4/§6 require and [`crate::parser`] builds them.
//! Every node carries its own [`SourceLocation`]; there is no separate
//! position table to keep in sync.

/// A 1-indexed line/column pair, as produced by [`crate::lexer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        SourceLocation { line, column }
    }
}

/// A type as written in source: an annotation, a `new` target, or a
/// parameter/return type. Distinct from [`crate::types::Type`] only in that
/// it is produced by the parser before any name has been checked to refer
/// to a declared class — semantic analysis is what turns `TypeExpr::Named`
/// into a [`crate::types::Type::Class`] or rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Integer,
    Float,
    Boolean,
    String,
    Void,
    Array(Box<TypeExpr>),
    Named(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// An expression node. Every variant carries the [`SourceLocation`] of its
/// leading token, which the analyzer and IR generator attach to any
/// diagnostic or quadruple they produce for it.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    IntLiteral(i64, SourceLocation),
    FloatLiteral(f64, SourceLocation),
    BoolLiteral(bool, SourceLocation),
    StringLiteral(String, SourceLocation),
    NullLiteral(SourceLocation),
    Identifier(String, SourceLocation),
    This(SourceLocation),
    New {
        class_name: String,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    ArrayLiteral {
        elements: Vec<Expr>,
        loc: SourceLocation,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        loc: SourceLocation,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        loc: SourceLocation,
    },
    Ternary {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
        loc: SourceLocation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        loc: SourceLocation,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        loc: SourceLocation,
    },
    Field {
        object: Box<Expr>,
        name: String,
        /// Stable id assigned by the parser, used as a side-table key: the
        /// analyzer records here whether this suffix resolved to a method
        /// (vs. a field) so the IR generator — a separate pass that does
        /// not repeat type inference — knows to lower a following call as
        /// `CALL_METHOD` instead of `GET_FIELD` + `CALL` (§4.7, §9).
        id: u32,
        loc: SourceLocation,
    },
}

impl Expr {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Expr::IntLiteral(_, loc)
            | Expr::FloatLiteral(_, loc)
            | Expr::BoolLiteral(_, loc)
            | Expr::StringLiteral(_, loc)
            | Expr::NullLiteral(loc)
            | Expr::Identifier(_, loc)
            | Expr::This(loc)
            | Expr::New { loc, .. }
            | Expr::ArrayLiteral { loc, .. }
            | Expr::Unary { loc, .. }
            | Expr::Binary { loc, .. }
            | Expr::Ternary { loc, .. }
            | Expr::Call { loc, .. }
            | Expr::Index { loc, .. }
            | Expr::Field { loc, .. } => *loc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub type_annotation: TypeExpr,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// `None` means no return-type annotation was written, which this
    /// language treats as `void`.
    pub return_type: Option<TypeExpr>,
    pub body: Vec<Stmt>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub type_annotation: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub parent: Option<String>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunctionDecl>,
    pub loc: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub value: Expr,
    pub body: Vec<Stmt>,
    pub loc: SourceLocation,
}

/// A statement node. Function and class declarations are statements here
/// (not a separate `Item` layer) because Compiscript allows them wherever
/// a top-level statement is allowed, matching §4.4's "walk top-level
/// statements and for each function or class declaration...".
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    VarDecl {
        name: String,
        type_annotation: Option<TypeExpr>,
        init: Option<Expr>,
        loc: SourceLocation,
    },
    ConstDecl {
        name: String,
        type_annotation: Option<TypeExpr>,
        init: Expr,
        loc: SourceLocation,
    },
    Assign {
        name: String,
        value: Expr,
        loc: SourceLocation,
    },
    PropertyAssign {
        object: Expr,
        field: String,
        value: Expr,
        /// Stable id assigned by the parser, mirroring [`Expr::Field`]'s —
        /// the analyzer records the resolved field's offset here so the IR
        /// generator doesn't need to re-run type inference to lower
        /// `SET_FIELD`.
        id: u32,
        loc: SourceLocation,
    },
    IndexAssign {
        object: Expr,
        index: Expr,
        value: Expr,
        loc: SourceLocation,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        loc: SourceLocation,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        loc: SourceLocation,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
        loc: SourceLocation,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: Box<Stmt>,
        loc: SourceLocation,
    },
    Foreach {
        var_name: String,
        iterable: Expr,
        body: Box<Stmt>,
        loc: SourceLocation,
    },
    Break(SourceLocation),
    Continue(SourceLocation),
    Return {
        value: Option<Expr>,
        loc: SourceLocation,
    },
    Switch {
        scrutinee: Expr,
        cases: Vec<SwitchCase>,
        default: Option<Vec<Stmt>>,
        loc: SourceLocation,
    },
    Block(Vec<Stmt>, SourceLocation),
    /// An expression evaluated for effect, e.g. `print(x);` or a bare call.
    ExprStmt(Expr),
    Function(FunctionDecl),
    Class(ClassDecl),
}

impl Stmt {
    pub fn loc(&self) -> SourceLocation {
        match self {
            Stmt::VarDecl { loc, .. }
            | Stmt::ConstDecl { loc, .. }
            | Stmt::Assign { loc, .. }
            | Stmt::PropertyAssign { loc, .. }
            | Stmt::IndexAssign { loc, .. }
            | Stmt::If { loc, .. }
            | Stmt::While { loc, .. }
            | Stmt::DoWhile { loc, .. }
            | Stmt::For { loc, .. }
            | Stmt::Foreach { loc, .. }
            | Stmt::Return { loc, .. }
            | Stmt::Switch { loc, .. }
            | Stmt::Block(_, loc) => *loc,
            Stmt::Break(loc) | Stmt::Continue(loc) => *loc,
            Stmt::ExprStmt(e) => e.loc(),
            Stmt::Function(f) => f.loc,
            Stmt::Class(c) => c.loc,
        }
    }
}

/// A whole translation unit: a flat list of top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}
