//! Semantic analyzer (C5): a two-pass visitor over the parse tree.
//!
//! Pass 1 registers every top-level function and class signature (and, for
//! classes, every field/method signature) without visiting any body. Pass 2
//! walks bodies with accumulated state — current function, current class,
//! loop nesting — type-checking expressions and threading reachability so
//! that code after an unconditional `return`/`break`/`continue` is flagged
//! `E500` without aborting the walk (§4.4, §9).
//!
//! Following the re-architecture note in §9 ("one recursive descent
//! procedure dispatching on node kind... not a visitor-with-double-
//! dispatch"), this is a handful of `match`-dispatching methods on one
//! `Analyzer` struct, split across sibling modules the way the teacher
//! splits its `codegen` module into `state.rs`/`control_flow.rs`/etc.

mod decl;
mod expr;
mod stmt;
mod types_resolve;

use std::collections::HashMap;

use crate::ast::Program;
use crate::diagnostics::DiagnosticSink;
use crate::scope::ScopeStack;
use crate::types::Type;

/// A function's signature, cheap to clone so call-site type checking
/// doesn't need to hold a borrow on the scope stack or class table while
/// also recording diagnostics.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// What a chain expression resolves to, beyond its type: whether it names
/// something callable, and if so with what signature. `Call` suffixes
/// consult this to distinguish "call a resolved function/method" from
/// "attempt to call a non-callable value" (§4.4's "otherwise the current
/// symbol must be a function").
#[derive(Debug, Clone)]
pub(super) enum Callable {
    None,
    Function(FunctionSignature),
    Method(FunctionSignature),
    Builtin(crate::builtins::Builtin),
}

/// A field access that resolved through a class's inheritance chain: which
/// class declared it and its byte offset, exactly as [`crate::symbol::ClassTable::field_offset`]
/// computed it. Recorded here, keyed by the `Field` expression's (or
/// `PropertyAssign` statement's) node id, so the IR generator (§4.7) can
/// emit `GET_FIELD`/`SET_FIELD` without repeating type inference — the same
/// treatment `method_refs` gives method dispatch.
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub class: String,
    pub offset: i32,
}

/// State threaded through pass 2's recursive descent.
struct FunctionContext {
    name: String,
    return_type: Type,
}

/// Whether control falls through to the next statement, or has already
/// transferred unconditionally (`return`/`break`/`continue`, or a block
/// whose every path does). The "cut" sentinel of §9, reified as an enum
/// instead of a boolean flag so callers can't accidentally invert it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Reachability {
    Normal,
    Cut,
}

impl Reachability {
    fn merge_both_required(a: Reachability, b: Reachability) -> Reachability {
        if a == Reachability::Cut && b == Reachability::Cut {
            Reachability::Cut
        } else {
            Reachability::Normal
        }
    }
}

/// Every piece of state pass 1 and pass 2 share.
pub struct Analyzer {
    pub(super) scopes: ScopeStack,
    pub(super) sink: DiagnosticSink,
    pub(super) current_function: Option<FunctionContext>,
    pub(super) current_class: Option<String>,
    pub(super) loop_depth: usize,
    /// Next byte offset for a local/param in the function currently being
    /// visited, reset on entry to each function (§3's activation record).
    pub(super) local_offset: i32,
    /// Next byte offset for a global variable, shared across the whole
    /// program (monotonic for the compilation's lifetime).
    pub(super) global_offset: i32,
    /// `.field` suffix node id → `(class, method)` for suffixes that
    /// resolved to a method rather than a field, consulted by the IR
    /// generator (§4.7, §9) to lower a following call as `CALL_METHOD`.
    pub(super) method_refs: HashMap<u32, (String, String)>,
    /// `.field` suffix / property-assignment node id → resolved
    /// [`FieldRef`], the field counterpart to `method_refs`.
    pub(super) field_refs: HashMap<u32, FieldRef>,
}

/// Everything pass 1 + pass 2 produced: the populated symbol table, the
/// diagnostics recorded along the way, and the method/field-reference side
/// tables the IR generator needs.
pub struct AnalysisResult {
    pub scopes: ScopeStack,
    pub diagnostics: DiagnosticSink,
    pub method_refs: HashMap<u32, (String, String)>,
    pub field_refs: HashMap<u32, FieldRef>,
}

impl AnalysisResult {
    /// Per §5/§7: later stages run only when semantics succeeded.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

impl Analyzer {
    fn new() -> Self {
        Analyzer {
            scopes: ScopeStack::new(),
            sink: DiagnosticSink::new(),
            current_function: None,
            current_class: None,
            loop_depth: 0,
            local_offset: 8,
            global_offset: 0,
            method_refs: HashMap::new(),
            field_refs: HashMap::new(),
        }
    }

    /// Run both passes over `program` and return the populated symbol
    /// table, diagnostics, and method/field-reference tables.
    pub fn analyze(program: &Program) -> AnalysisResult {
        let mut analyzer = Analyzer::new();
        analyzer.pass1(program);
        analyzer.pass2(program);
        AnalysisResult {
            scopes: analyzer.scopes,
            diagnostics: analyzer.sink,
            method_refs: analyzer.method_refs,
            field_refs: analyzer.field_refs,
        }
    }
}
