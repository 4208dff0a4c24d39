//! Diagnostic sink (C4).
//!
//! An append-only collection of phase-tagged, coded, positioned error
//! records. Nothing in this module ever aborts a pass: callers record a
//! diagnostic and keep going, per §7's propagation policy.

use std::fmt;

use serde::Serialize;

/// Which stage of the pipeline produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Syntax,
    Semantic,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Syntax => write!(f, "syntax"),
            Phase::Semantic => write!(f, "semantic"),
        }
    }
}

/// Diagnostic codes, exactly the closed set in §4.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum Code {
    /// Redeclaration of a name already defined in the current scope.
    E001,
    /// Reference to an undefined name.
    E002,
    /// Type mismatch.
    E101,
    /// Argument arity or type mismatch in a call.
    E102,
    /// Return type mismatch, or `return` outside a function.
    E103,
    /// A variable declaration has neither an annotation nor an initializer.
    E104,
    /// `break`/`continue` outside a loop.
    E201,
    /// Assignment to a `const` binding.
    E202,
    /// Member access on a non-class type.
    E301,
    /// `switch`/`case` scrutinee and case type are incompatible.
    E302,
    /// Array index is not an integer.
    E401,
    /// Statement follows unconditional control transfer (unreachable code).
    E500,
    /// A construct could not be analyzed at all.
    E999,
}

impl Code {
    /// The canonical diagnostic code string, e.g. `"E101"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Code::E001 => "E001",
            Code::E002 => "E002",
            Code::E101 => "E101",
            Code::E102 => "E102",
            Code::E103 => "E103",
            Code::E104 => "E104",
            Code::E201 => "E201",
            Code::E202 => "E202",
            Code::E301 => "E301",
            Code::E302 => "E302",
            Code::E401 => "E401",
            Code::E500 => "E500",
            Code::E999 => "E999",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub phase: Phase,
    pub code: Code,
    pub message: String,
    pub line: usize,
    pub column: usize,
    /// Free-form structured detail (e.g. the offending name, or an expected
    /// vs. actual type pair rendered to text). Kept as a string so the sink
    /// stays serialization-agnostic; callers that need structure can encode
    /// it themselves.
    pub extra: Option<String>,
}

impl Diagnostic {
    pub fn new(
        phase: Phase,
        code: Code,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Diagnostic {
            phase,
            code,
            message: message.into(),
            line,
            column,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: [{} {}] {}",
            self.line, self.column, self.phase, self.code, self.message
        )
    }
}

/// Append-only diagnostic collection, shared by the syntax and semantic
/// phases. Insertion order is depth-first visitor order (§5), and that order
/// is part of this type's contract: tests assert on it directly.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSink {
    records: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        DiagnosticSink { records: Vec::new() }
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.records.push(diag);
    }

    pub fn error(
        &mut self,
        phase: Phase,
        code: Code,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) {
        self.push(Diagnostic::new(phase, code, message, line, column));
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_insertion_order() {
        let mut sink = DiagnosticSink::new();
        sink.error(Phase::Semantic, Code::E002, "undefined name 'x'", 1, 1);
        sink.error(Phase::Semantic, Code::E101, "type mismatch", 2, 5);
        let codes: Vec<_> = sink.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![Code::E002, Code::E101]);
    }

    #[test]
    fn display_includes_position_and_code() {
        let d = Diagnostic::new(Phase::Semantic, Code::E201, "break outside loop", 3, 7);
        assert_eq!(format!("{d}"), "3:7: [semantic E201] break outside loop");
    }
}
