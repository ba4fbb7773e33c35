//! The external "AST collaborator" contract (§1, §6) and a default
//! implementation backed by a real Python parser.
//!
//! The core never owns AST memory: a [`ParsedModule`] is a cheaply-cloned,
//! reference-counted handle to a parsed tree, modeled on
//! `red_knot_python_semantic::ast_node_ref::AstNodeRef`'s observation that
//! holding the `ParsedModule` alive is what lets the rest of the analyzer
//! hand out `&'_ Stmt`/`&'_ Expr` borrows (and the [`crate::node_key::NodeKey`]s
//! derived from them) without the analyzer owning a copy of the tree.

use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use ruff_python_ast::ModModule;
use ruff_python_parser::ParseError;
use ruff_text_size::TextRange;

/// A parsed module, kept alive for as long as anything still borrows into
/// it. Cloning is an `Arc` bump, not a copy of the tree.
#[derive(Clone)]
pub struct ParsedModule {
    inner: Arc<ModModule>,
}

impl ParsedModule {
    fn new(module: ModModule) -> Self {
        Self {
            inner: Arc::new(module),
        }
    }

    #[must_use]
    pub fn syntax(&self) -> &ModModule {
        &self.inner
    }
}

impl Deref for ParsedModule {
    type Target = ModModule;

    fn deref(&self) -> &ModModule {
        &self.inner
    }
}

/// A parse diagnostic, independent of the underlying parser's own error
/// type, so callers of [`AstProvider`] don't need to depend on
/// `ruff_python_parser` directly.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<ParseError> for SyntaxError {
    fn from(error: ParseError) -> Self {
        Self {
            message: error.error.to_string(),
            range: error.location,
        }
    }
}

/// The external parser collaborator: `getAst(filePath) -> Module | null`
/// from §6, spelled as a `Result` so the caller can distinguish "parsed with
/// errors" (recorded, analysis of the file skipped) from "parsed clean".
pub trait AstProvider {
    /// Parses `source` (the contents of `path`) and returns the resulting
    /// tree. `Err` means the file is unparsable and must be recorded in
    /// `failedToParse` (§7); the source language tolerates files that parse
    /// with recoverable syntax errors, in which case the tree is still
    /// returned alongside the collected errors.
    fn parse(&self, path: &Path, source: &str) -> Result<(ParsedModule, Vec<SyntaxError>), SyntaxError>;
}

/// The default [`AstProvider`], backed by the real recursive-descent parser.
#[derive(Default)]
pub struct RuffAstProvider;

impl AstProvider for RuffAstProvider {
    fn parse(&self, _path: &Path, source: &str) -> Result<(ParsedModule, Vec<SyntaxError>), SyntaxError> {
        let parsed = ruff_python_parser::parse_module(source).map_err(SyntaxError::from)?;
        let errors = parsed.errors().iter().cloned().map(SyntaxError::from).collect();
        Ok((ParsedModule::new(parsed.into_syntax()), errors))
    }
}
