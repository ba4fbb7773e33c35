//! Command-line argument parsing (§6: "Options" and the `PYTHONPATH`
//! search-path augmentation), grounded on `ruff::args::Args`'s shape of a
//! single `clap`-derived struct with a handful of flags plus a positional
//! path.

use std::path::PathBuf;

use clap::Parser;

use crate::logging::LogLevel;

#[derive(Debug, Parser)]
#[command(name = "knotty", about = "Whole-program static type inference for a Python-like language", version)]
pub struct Args {
    /// Root directory (or single file) to analyze.
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Extra module search-path entries, in priority order after the
    /// project root and the current working directory.
    #[arg(long = "search-path", value_name = "DIR")]
    pub search_paths: Vec<PathBuf>,

    /// Suppress informational output; only diagnostics are printed.
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose logging of the analysis itself (module loads, fixed-point
    /// iterations).
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    #[must_use]
    pub fn log_level(&self) -> LogLevel {
        if self.debug {
            LogLevel::Verbose
        } else if self.quiet {
            LogLevel::Quiet
        } else {
            LogLevel::Default
        }
    }

    /// Every search path entry this run should use beyond the root/cwd
    /// pair `knotty_semantic::options::Options::search_paths` already
    /// supplies: `--search-path` flags first, then `PYTHONPATH`.
    #[must_use]
    pub fn extra_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.search_paths.clone();
        if let Ok(pythonpath) = std::env::var("PYTHONPATH") {
            paths.extend(knotty_semantic::options::Options::parse_pythonpath(&pythonpath));
        }
        paths
    }
}
