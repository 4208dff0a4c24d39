//! Compiscript compiler CLI.
//!
//! Subcommands mirror the pipeline's natural stopping points: `check`
//! (front end + semantic analysis only), `ir` (also lower to quadruples),
//! and `build` (full pipeline, emitting MIPS32 assembly). `completions`
//! generates shell completion scripts and carries no compiler semantics.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use compiscriptc::{compile, CompilerConfig};

#[derive(ClapParser)]
#[command(name = "compiscriptc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Compiscript compiler: semantic analysis, IR, and MIPS32 codegen", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the lexer, parser, and semantic analyzer; print diagnostics and
    /// the symbol-table dump.
    Check {
        /// Input Compiscript source file.
        input: PathBuf,

        /// Print diagnostics and the symbol-table dump as JSON instead of
        /// the human-readable text format.
        #[arg(long)]
        json: bool,
    },

    /// Like `check`, then also lower to three-address IR and print the
    /// quadruple dump.
    Ir {
        /// Input Compiscript source file.
        input: PathBuf,
    },

    /// Run the full pipeline and emit MIPS32 assembly.
    Build {
        /// Input Compiscript source file.
        input: PathBuf,

        /// Output .s file (defaults to stdout).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of $t registers the allocator may use.
        #[arg(long, default_value_t = 10)]
        temp_registers: usize,

        /// Number of $s registers the allocator may use.
        #[arg(long, default_value_t = 8)]
        saved_registers: usize,

        /// Disable the dirty-bit spill optimization.
        #[arg(long)]
        no_dirty_bit: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { input, json } => run_check(&input, json),
        Commands::Ir { input } => run_ir(&input),
        Commands::Build {
            input,
            output,
            temp_registers,
            saved_registers,
            no_dirty_bit,
        } => {
            let config = CompilerConfig::new()
                .with_temp_registers(temp_registers)
                .with_saved_registers(saved_registers)
                .with_dirty_bit_optimization(!no_dirty_bit);
            run_build(&input, output.as_deref(), &config);
        }
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn read_source(input: &std::path::Path) -> String {
    match fs::read_to_string(input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("failed to read {}: {err}", input.display());
            process::exit(1);
        }
    }
}

/// JSON shape for `check --json`: diagnostics per §6, scope dump per §6,
/// wrapped together since both come out of the same analysis run.
#[derive(serde::Serialize)]
struct CheckReport<'a> {
    diagnostics: &'a [compiscriptc::Diagnostic],
    scopes: Vec<compiscriptc::scope::ScopeDump>,
}

fn run_check(input: &std::path::Path, json: bool) {
    let source = read_source(input);
    let config = CompilerConfig::new();
    match compile(&source, &config) {
        Ok(out) => {
            if json {
                let report = CheckReport {
                    diagnostics: out.analysis.diagnostics.as_slice(),
                    scopes: out.analysis.scopes.dump(),
                };
                match serde_json::to_string_pretty(&report) {
                    Ok(text) => println!("{text}"),
                    Err(err) => {
                        eprintln!("failed to serialize report: {err}");
                        process::exit(1);
                    }
                }
            } else {
                for diag in out.analysis.diagnostics.iter() {
                    eprintln!("{diag}");
                }
                for scope in out.analysis.scopes.dump() {
                    println!("scope: {}", scope.scope);
                    for entry in scope.entries {
                        println!("  {} {} : {}", entry.kind.as_str(), entry.name, entry.ty);
                    }
                }
            }
            if !out.analysis.is_clean() {
                process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn run_ir(input: &std::path::Path) {
    let source = read_source(input);
    let config = CompilerConfig::new();
    match compile(&source, &config) {
        Ok(out) => {
            for diag in out.analysis.diagnostics.iter() {
                eprintln!("{diag}");
            }
            match out.quads {
                Some(quads) => {
                    for line in quads.dump() {
                        println!("{line}");
                    }
                }
                None => process::exit(1),
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

fn run_build(input: &std::path::Path, output: Option<&std::path::Path>, config: &CompilerConfig) {
    let source = read_source(input);
    match compile(&source, config) {
        Ok(out) => {
            for diag in out.analysis.diagnostics.iter() {
                eprintln!("{diag}");
            }
            let Some(assembly) = out.assembly else {
                process::exit(1);
            };
            match output {
                Some(path) => {
                    if let Err(err) = fs::write(path, &assembly) {
                        eprintln!("failed to write {}: {err}", path.display());
                        process::exit(1);
                    }
                    println!("wrote {}", path.display());
                }
                None => print!("{assembly}"),
            }
        }
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}
