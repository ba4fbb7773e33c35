//! The analysis coordinator (§7): the explicit, process-local owner of
//! every registry the driver mutates, and the driver of the file-discovery,
//! fixed-point, and diagnostic-emission passes around it.
//!
//! Modeled on `red_knot_python_semantic::db::Db`/`Program` for *what* state
//! a whole-program analysis needs to own, but deliberately not on Salsa
//! itself: the Design Notes call for an explicit, single-owner coordinator
//! instead of ambient incremental-query state, so `Analyzer` is a plain
//! struct threaded through by value/reference rather than a tracked
//! database. Every pass below works by building one [`driver::Ctx`] out of
//! `&mut self`'s fields and calling straight into `driver`'s free functions
//! — no closures, no trait objects standing in for the recursion.

use std::path::{Path, PathBuf};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{info, info_span};
use walkdir::WalkDir;

use knotty_db::cache::AstCache;
use knotty_db::fs::FileSystem;

use crate::ast::AstProvider;
use crate::binding::{BindingId, BindingKind, BindingRegistry};
use crate::builtins;
use crate::diagnostic::{Diagnostic, RuleId, Severity};
use crate::driver::{self, Ctx};
use crate::error::AnalyzerError;
use crate::module_resolver::ModuleLoader;
use crate::name::ModuleName;
use crate::node_key::NodeKey;
use crate::options::Options;
use crate::scope::{ScopeArena, ScopeId};
use crate::types::{DataType, TypeArena, TypeId};

/// A snapshot of where an `analyze()` run ended up, returned by
/// [`Analyzer::analysis_summary`] for callers that just want headline
/// counts rather than the full registries (§7: "prints the summary (counts
/// of modules, errors, definitions, references, resolution rate)").
#[derive(Debug, Clone, Default)]
pub struct AnalysisSummary {
    pub modules_loaded: usize,
    pub modules_failed_to_parse: usize,
    pub bindings_created: usize,
    pub references: usize,
    pub diagnostics: usize,
    pub errors: usize,
    /// `resolved / (resolved + unresolved)` identifier/import nodes, or
    /// `1.0` when nothing was looked up at all.
    pub resolution_rate: f64,
}

impl std::fmt::Display for AnalysisSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} modules loaded ({} failed to parse), {} definitions, {} references, {} diagnostics ({} errors), {:.0}% of imports resolved",
            self.modules_loaded,
            self.modules_failed_to_parse,
            self.bindings_created,
            self.references,
            self.diagnostics,
            self.errors,
            self.resolution_rate * 100.0
        )
    }
}

/// Owns every registry an analysis run produces and coordinates the passes
/// over them (§7).
pub struct Analyzer<F, A> {
    options: Options,
    types: TypeArena,
    scopes: ScopeArena,
    bindings: BindingRegistry,
    loader: ModuleLoader<F, A>,
    /// Opened at construction and flushed in [`Self::close`] (§5's resource
    /// lifecycle); a directory-creation failure here is the one fatal
    /// condition named in §7's error table ("Cache directory create
    /// failure"), so it aborts `Analyzer::new` rather than being recorded
    /// as a diagnostic.
    ast_cache: AstCache,

    global_scope: ScopeId,
    synthetic_modules: FxHashMap<ModuleName, TypeId>,

    diagnostics: Vec<Diagnostic>,
    parse_errors: FxHashMap<PathBuf, Vec<crate::ast::SyntaxError>>,
    failed_to_parse: FxHashSet<PathBuf>,
    loaded_files: FxHashSet<PathBuf>,

    resolved_names: FxHashSet<NodeKey>,
    unresolved_names: FxHashSet<NodeKey>,

    call_stack: FxHashSet<(TypeId, Vec<TypeId>)>,
    memo: FxHashMap<(TypeId, Vec<TypeId>), TypeId>,
    uncalled: Vec<TypeId>,
}

impl<F: FileSystem, A: AstProvider> Analyzer<F, A> {
    /// # Errors
    /// Returns [`AnalyzerError::CacheDirUnavailable`] if the AST cache
    /// directory cannot be created — the one fatal startup condition named
    /// in §7 ("Cache directory create failure | Fatal error to caller |
    /// Abort analyzer startup").
    pub fn new(fs: F, ast: A, options: Options, root: &Path, cwd: &Path) -> Result<Self, AnalyzerError> {
        let ast_cache = AstCache::open("knotty").map_err(|error| {
            let path = std::env::temp_dir().join("knotty").join("ast_cache");
            AnalyzerError::CacheDirUnavailable(path, error)
        })?;

        let mut types = TypeArena::new();
        let mut scopes = ScopeArena::new();
        let mut bindings = BindingRegistry::new();
        let (global_scope, builtins::SyntheticModules(synthetic_modules)) =
            builtins::seed(&mut types, &mut scopes, &mut bindings);

        let search_paths = options.search_paths(root, cwd);
        let loader = ModuleLoader::new(fs, ast, search_paths);

        Ok(Self {
            options,
            types,
            scopes,
            bindings,
            loader,
            ast_cache,
            global_scope,
            synthetic_modules,
            diagnostics: Vec::new(),
            parse_errors: FxHashMap::default(),
            failed_to_parse: FxHashSet::default(),
            loaded_files: FxHashSet::default(),
            resolved_names: FxHashSet::default(),
            unresolved_names: FxHashSet::default(),
            call_stack: FxHashSet::default(),
            memo: FxHashMap::default(),
            uncalled: Vec::new(),
        })
    }

    /// Builds the [`Ctx`] every pass below runs through, borrowing every
    /// field of `self` it needs disjointly. `file`/`current_module` start
    /// out pointing at a placeholder; callers that actually descend into a
    /// file immediately overwrite both via `driver::infer_file`.
    fn ctx(&mut self) -> Ctx<'_, F, A> {
        // An empty source always parses cleanly; this just gives the `Ctx`
        // a valid placeholder `ParsedModule` to start from; every real pass
        // overwrites `file`/`current_module` via `driver::infer_file` before
        // creating any `AstNodeRef` against them.
        let (placeholder_module, _) = self
            .loader
            .parse(Path::new(""), "")
            .expect("parsing an empty module never fails");

        Ctx {
            types: &mut self.types,
            scopes: &mut self.scopes,
            bindings: &mut self.bindings,
            diagnostics: &mut self.diagnostics,
            loader: &mut self.loader,
            synthetic_modules: &self.synthetic_modules,
            global_scope: self.global_scope,
            loaded_files: &mut self.loaded_files,
            failed_to_parse: &mut self.failed_to_parse,
            parse_errors: &mut self.parse_errors,
            resolved_names: &mut self.resolved_names,
            unresolved_names: &mut self.unresolved_names,
            call_stack: &mut self.call_stack,
            memo: &mut self.memo,
            uncalled: &mut self.uncalled,
            file: PathBuf::new(),
            current_module: placeholder_module,
            return_types: Vec::new(),
        }
    }

    /// Analyzes `root` (§1, §6: "a root filesystem path (file or
    /// directory)"): a single `.py` file is analyzed on its own; a
    /// directory is recursively discovered for every `.py` file under it
    /// (§4.4). Either way, the uncalled-function worklist is then drained
    /// to a fixed point (§7's `finish()` contract, folded into `analyze`
    /// since this library has no separate "keep the session open" mode).
    pub fn analyze(&mut self, root: &Path) -> Result<(), AnalyzerError> {
        if !root.exists() {
            return Err(AnalyzerError::RootNotFound(root.to_path_buf()));
        }

        let _span = info_span!("analyze", root = %root.display()).entered();

        let files: Vec<PathBuf> = if root.is_file() {
            vec![root.to_path_buf()]
        } else {
            WalkDir::new(root)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "py"))
                .map(|entry| entry.path().to_path_buf())
                .collect()
        };

        for path in &files {
            if self.loaded_files.contains(path) {
                continue;
            }
            let Ok(source) = self.loader.read_source(path) else {
                continue;
            };
            let mut ctx = self.ctx();
            driver::load_top_level_file(&mut ctx, path, &source);
        }

        self.finish();
        info!(
            modules = self.loaded_files.len(),
            diagnostics = self.diagnostics.len(),
            "analysis complete"
        );
        Ok(())
    }

    /// Drains the uncalled-function worklist to a fixed point (§7): running
    /// a function's body can itself define or surface further functions
    /// that have not been called either, so this loops until the worklist
    /// is empty. Each drained function is applied with every parameter
    /// widened to `Unknown`, the same shape an unconstrained call site
    /// would produce.
    fn finish(&mut self) {
        loop {
            let Some(fun_id) = self.uncalled.pop() else { break };
            let DataType::Fun(fun) = self.types.get(fun_id).clone() else {
                continue;
            };
            if fun.def.is_none() {
                continue;
            }
            let key = (fun_id, Vec::new());
            if self.memo.contains_key(&key) || self.call_stack.contains(&key) {
                continue;
            }

            let unknown_args: Vec<TypeId> = fun.params.iter().map(|_| self.types.unknown()).collect();
            let mut ctx = self.ctx();
            driver::apply_function(&mut ctx, fun_id, &fun, &unknown_args);
        }

        self.emit_unused_variable_diagnostics();
    }

    fn emit_unused_variable_diagnostics(&mut self) {
        let offenders: Vec<BindingId> = self
            .bindings
            .iter()
            .filter(|(_, binding)| {
                !binding.is_builtin
                    && !binding.is_synthetic
                    && binding.is_unused()
                    && !matches!(
                        binding.kind,
                        BindingKind::Class
                            | BindingKind::Function
                            | BindingKind::Method
                            | BindingKind::Constructor
                            | BindingKind::Module
                            | BindingKind::Parameter
                            | BindingKind::Scope
                    )
            })
            .map(|(id, _)| id)
            .collect();

        for id in offenders {
            let binding = self.bindings.get(id);
            self.diagnostics.push(Diagnostic::new(
                RuleId::UnusedVariable,
                Severity::Error,
                binding.file.clone(),
                binding.range,
                format!("Unused variable: {}", binding.name),
            ));
        }
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn bindings(&self) -> &BindingRegistry {
        &self.bindings
    }

    /// The type arena backing every [`TypeId`] handed out by this run, for
    /// callers that need to inspect what a binding's type actually is (e.g.
    /// rendering a hover, or asserting on inferred types in tests).
    #[must_use]
    pub fn types(&self) -> &TypeArena {
        &self.types
    }

    /// The scope arena backing every [`ScopeId`] created during this run.
    #[must_use]
    pub fn scopes(&self) -> &ScopeArena {
        &self.scopes
    }

    /// Identifier-like nodes that resolved (§3, §4.5): plain name lookups
    /// that hit, plus `import`/`import from` aliases that located their
    /// module. Disjoint from `unresolved_names` (§8 invariant 3).
    #[must_use]
    pub fn resolved_names(&self) -> &FxHashSet<NodeKey> {
        &self.resolved_names
    }

    #[must_use]
    pub fn unresolved_names(&self) -> &FxHashSet<NodeKey> {
        &self.unresolved_names
    }

    #[must_use]
    pub fn loaded_files(&self) -> &FxHashSet<PathBuf> {
        &self.loaded_files
    }

    #[must_use]
    pub fn failed_to_parse(&self) -> &FxHashSet<PathBuf> {
        &self.failed_to_parse
    }

    #[must_use]
    pub fn parse_errors(&self) -> &FxHashMap<PathBuf, Vec<crate::ast::SyntaxError>> {
        &self.parse_errors
    }

    /// Diagnostics raised while inferring `file`, for callers that render
    /// one file's worth at a time (§6's CLI surface).
    #[must_use]
    pub fn diagnostics_for_file(&self, file: &Path) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.file == file).collect()
    }

    #[must_use]
    pub fn analysis_summary(&self) -> AnalysisSummary {
        let resolved = self.resolved_names.len();
        let unresolved = self.unresolved_names.len();
        let resolution_rate = if resolved + unresolved == 0 {
            1.0
        } else {
            resolved as f64 / (resolved + unresolved) as f64
        };

        AnalysisSummary {
            modules_loaded: self.loaded_files.len(),
            modules_failed_to_parse: self.failed_to_parse.len(),
            bindings_created: self.bindings.iter().count(),
            references: self.bindings.references().len(),
            diagnostics: self.diagnostics.len(),
            errors: self
                .diagnostics
                .iter()
                .filter(|d| d.severity == Severity::Error)
                .count(),
            resolution_rate,
        }
    }

    /// Flushes the AST cache and releases every registry (§4.6).
    pub fn close(self) {
        self.ast_cache.close();
    }
}
