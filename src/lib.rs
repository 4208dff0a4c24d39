//! Compiscript compiler library.
//!
//! Provides a single-pass-feeling pipeline — lex, parse, analyze, lower to
//! three-address IR, emit MIPS32 — over Compiscript source text. Each stage
//! is a standalone module a caller can drive independently (e.g. a language
//! server only needs [`analyzer`] for diagnostics); [`compile`] wires all of
//! them together the way a CLI front end wants them.

pub mod analyzer;
pub mod ast;
pub mod builtins;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod symbol;
pub mod types;

pub use ast::Program;
pub use config::CompilerConfig;
pub use diagnostics::{Diagnostic, DiagnosticSink};
pub use error::{CompileError, CompileResult};
pub use ir::QuadList;
pub use parser::Parser;
pub use scope::ScopeStack;

use analyzer::{AnalysisResult, Analyzer};
use codegen::mips::MipsEmitter;
use ir::generator::IrGenerator;
use tracing::{debug, info};

/// Everything one call to [`compile`] produced: the parsed tree is not kept
/// (nothing downstream needs it once analysis has run), but every other
/// stage's output is — a `check`-only caller wants `analysis` without ever
/// touching `quads`/`assembly`.
pub struct CompileOutput {
    pub analysis: AnalysisResult,
    pub quads: Option<QuadList>,
    pub assembly: Option<String>,
}

/// Run the full pipeline over `source`. Stops after semantic analysis if it
/// found any diagnostics — per §5/§7, IR generation and code generation only
/// ever see a program pass 1/pass 2 accepted.
pub fn compile(source: &str, config: &CompilerConfig) -> CompileResult<CompileOutput> {
    let mut sink = DiagnosticSink::new();
    let program = {
        debug!("parsing source ({} bytes)", source.len());
        let mut parser = Parser::new(source, &mut sink);
        parser.parse_program()
    };

    if !sink.is_empty() {
        info!(count = sink.len(), "stopping after syntax errors");
        let analysis = AnalysisResult {
            scopes: ScopeStack::new(),
            diagnostics: sink,
            method_refs: Default::default(),
            field_refs: Default::default(),
        };
        return Ok(CompileOutput {
            analysis,
            quads: None,
            assembly: None,
        });
    }

    debug!("running semantic analysis");
    let analysis = Analyzer::analyze(&program);
    if !analysis.is_clean() {
        info!(count = analysis.diagnostics.len(), "stopping after semantic errors");
        return Ok(CompileOutput {
            analysis,
            quads: None,
            assembly: None,
        });
    }

    debug!("generating three-address IR");
    let quads = IrGenerator::generate(&program, &analysis);
    info!(quads = quads.len(), "generated IR");

    debug!("emitting MIPS32 assembly");
    let assembly = MipsEmitter::emit(&quads, &analysis.scopes, config)?;

    Ok(CompileOutput {
        analysis,
        quads: Some(quads),
        assembly: Some(assembly),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_program_reaches_assembly() {
        let config = CompilerConfig::new();
        let out = compile("function main(): void { print(1); }", &config).unwrap();
        assert!(out.analysis.is_clean());
        assert!(out.quads.is_some());
        assert!(out.assembly.unwrap().contains(".globl main"));
    }

    #[test]
    fn undefined_name_stops_before_ir() {
        let config = CompilerConfig::new();
        let out = compile("function main(): void { print(missing); }", &config).unwrap();
        assert!(!out.analysis.is_clean());
        assert!(out.quads.is_none());
        assert!(out.assembly.is_none());
    }

    #[test]
    fn syntax_error_stops_before_analysis() {
        let config = CompilerConfig::new();
        let out = compile("function main( { }", &config).unwrap();
        assert!(!out.analysis.is_clean());
        assert!(out.quads.is_none());
    }
}
