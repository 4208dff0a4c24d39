//! Crate-level error type for failures that are not user-facing diagnostics.
//!
//! A malformed Compiscript program never produces a `CompileError` — it
//! produces [`crate::diagnostics::Diagnostic`] records collected in the
//! [`crate::diagnostics::DiagnosticSink`] while every pass runs to
//! completion. `CompileError` is reserved for conditions outside that
//! contract: I/O failures, CLI misuse, and the single fatal allocator state
//! described in the register allocator's contract.

use thiserror::Error;

/// Errors that abort compilation outright rather than being recorded as a
/// [`crate::diagnostics::Diagnostic`].
#[derive(Debug, Error)]
pub enum CompileError {
    /// Reading the source file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Writing generated MIPS assembly failed.
    #[error("failed to write output: {0}")]
    Output(#[source] std::fmt::Error),

    /// The register allocator reached a state §7 calls a compiler bug: no
    /// resident variable was eligible to be spilled. This can only happen
    /// if the allocator's pool-size invariant is violated by a caller.
    #[error("register allocator exhausted: no eligible spill victim for {register}")]
    AllocatorExhausted { register: &'static str },
}

impl From<std::fmt::Error> for CompileError {
    fn from(e: std::fmt::Error) -> Self {
        CompileError::Output(e)
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
