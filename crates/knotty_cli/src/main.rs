//! The `knotty` binary: parses CLI options, runs the analyzer over a
//! project root, and prints diagnostics plus a summary line.
//!
//! Grounded on `ruff::main`'s top-level shape (`Args::parse` ->
//! `run(args)` -> map the `Result` onto an `ExitCode`, with the error
//! chain and failure banner printed via `anyhow`/`colored`), trimmed to
//! this crate's much smaller surface (one analysis pass, no subcommands).

mod args;
mod logging;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use knotty_db::fs::OsFileSystem;
use knotty_db::render::{render, RenderInput};
use knotty_semantic::analyzer::Analyzer;
use knotty_semantic::ast::RuffAstProvider;
use knotty_semantic::diagnostic::Severity;
use knotty_semantic::options::Options;

use args::Args;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitStatus {
    /// Analysis completed and found no error-severity diagnostics.
    Success,
    /// Analysis completed but found at least one error-severity diagnostic.
    Findings,
    /// Analysis could not run at all (bad root, cache dir failure, ...).
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => Self::from(0),
            ExitStatus::Findings => Self::from(1),
            ExitStatus::Error => Self::from(2),
        }
    }
}

pub fn main() -> ExitCode {
    let args = Args::parse();
    logging::set_up_logging(args.log_level());

    match run(args) {
        Ok(status) => status.into(),
        Err(err) => {
            let mut stderr_msg = format!("{}", "knotty failed".red().bold());
            for cause in err.chain() {
                stderr_msg.push_str(&format!("\n  {} {cause}", "Cause:".bold()));
            }
            eprintln!("{stderr_msg}");
            ExitStatus::Error.into()
        }
    }
}

fn run(args: Args) -> Result<ExitStatus> {
    let root = args
        .root
        .canonicalize()
        .with_context(|| format!("failed to resolve root path '{}'", args.root.display()))?;

    let options = Options {
        quiet: args.quiet,
        debug: args.debug,
        extra_search_paths: args.extra_search_paths(),
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| root.clone());
    let mut analyzer = Analyzer::new(OsFileSystem, RuffAstProvider, options, &root, &cwd)
        .context("failed to start the analyzer")?;

    analyzer
        .analyze(&root)
        .with_context(|| format!("analysis of '{}' failed", root.display()))?;

    let mut has_errors = false;
    for file in analyzer.loaded_files() {
        let Ok(source) = std::fs::read_to_string(file) else {
            continue;
        };
        for diagnostic in analyzer.diagnostics_for_file(file) {
            has_errors |= diagnostic.severity == Severity::Error;
            let rendered = render(&RenderInput {
                rule: diagnostic.rule.as_str(),
                severity: severity_label(diagnostic.severity),
                file,
                source: &source,
                range: diagnostic.range,
                message: &diagnostic.message,
            });
            print!("{rendered}");
        }
    }

    if !args.quiet {
        println!("{}", analyzer.analysis_summary());
    }

    analyzer.close();

    Ok(if has_errors {
        ExitStatus::Findings
    } else {
        ExitStatus::Success
    })
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "info",
    }
}
