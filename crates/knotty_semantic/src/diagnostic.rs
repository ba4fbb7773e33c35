//! Semantic diagnostics (§7): the analyzer's own findings, as opposed to
//! parse errors (§7's `failedToParse`) which come from the AST collaborator.
//!
//! Modeled on `red_knot_python_semantic::types::diagnostic`'s rule-id plus
//! severity plus span shape, minus the rendering (rendering to annotated
//! source text is `knotty_db::render`'s job, an external collaborator per
//! §6).

use ruff_text_size::TextRange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A stable identifier for a class of diagnostic, so external tooling
/// (and the integration tests) can match on "which rule fired" without
/// parsing the message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    UnusedVariable,
    NonCallable,
}

impl RuleId {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnusedVariable => "unused-variable",
            Self::NonCallable => "non-callable",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub rule: RuleId,
    pub severity: Severity,
    pub file: std::path::PathBuf,
    pub range: TextRange,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        rule: RuleId,
        severity: Severity,
        file: std::path::PathBuf,
        range: TextRange,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            severity,
            file,
            range,
            message: message.into(),
        }
    }
}
