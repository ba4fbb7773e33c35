//! Fatal analysis errors (§7 expansion): conditions that abort the whole run
//! before `finish()` is reached, as opposed to the per-file/per-node data
//! (`failedToParse`, `semanticErrors`) that analysis keeps running past.
//!
//! Modeled on `ruff`'s `src/main.rs` error-chain-via-`anyhow` convention,
//! with the enum itself shaped like `red_knot_python_semantic`'s use of
//! `thiserror` for its own structured error types.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("project root '{0}' does not exist or is not a directory")]
    RootNotFound(PathBuf),

    #[error("could not create or access the AST cache directory at '{0}'")]
    CacheDirUnavailable(PathBuf, #[source] std::io::Error),

    #[error("failed to read '{0}'")]
    Io(PathBuf, #[source] std::io::Error),
}
