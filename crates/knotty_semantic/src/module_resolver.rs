//! Recursive module loading (§4.4): turning a dotted name into a located,
//! read, parsed file, with circular-import protection.
//!
//! Modeled on `red_knot_python_semantic::module_resolver::resolver`'s
//! search-path walk (`resolve_module`/`resolve_package`/`resolve_file_module`)
//! and on `red_knot_python_semantic::program::Program`'s working-directory
//! handling. This type only locates, reads, and caches files — driving
//! inference over what it reads is [`crate::driver::resolve_import`]'s job,
//! since that needs the shared type/scope/binding arenas this loader
//! doesn't own.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use knotty_db::fs::FileSystem;

use crate::ast::AstProvider;
use crate::name::ModuleName;
use crate::types::TypeId;

/// A location the loader will look for a dotted name's first component.
#[derive(Debug, Clone)]
pub struct SearchPath(pub PathBuf);

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResolutionError {
    #[error("no module named '{0}'")]
    NotFound(ModuleName),
}

pub struct ModuleLoader<F, A> {
    fs: F,
    ast: A,
    search_paths: Vec<SearchPath>,
    cache: FxHashMap<ModuleName, TypeId>,
    /// Modules currently being loaded, in load order; a module found here
    /// during its own load is a circular import (§4.4: resolves to `None`,
    /// not an error).
    importing: Vec<ModuleName>,
}

impl<F: FileSystem, A: AstProvider> ModuleLoader<F, A> {
    pub fn new(fs: F, ast: A, search_paths: Vec<SearchPath>) -> Self {
        Self {
            fs,
            ast,
            search_paths,
            cache: FxHashMap::default(),
            importing: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_loading(&self, name: &ModuleName) -> bool {
        self.importing.contains(name)
    }

    #[must_use]
    pub fn loaded_type(&self, name: &ModuleName) -> Option<TypeId> {
        self.cache.get(name).copied()
    }

    pub fn cache_insert(&mut self, name: ModuleName, ty: TypeId) {
        self.cache.insert(name, ty);
    }

    pub fn push_importing(&mut self, name: ModuleName) {
        self.importing.push(name);
    }

    pub fn pop_importing(&mut self) {
        self.importing.pop();
    }

    /// Finds the file backing `name` by walking the search paths in order,
    /// preferring a package (`name/__init__.py`) over a plain module file
    /// (`name.py`) when both exist.
    pub fn locate_module(&self, name: &ModuleName) -> Result<PathBuf, ResolutionError> {
        let relative: PathBuf = name.components().collect::<PathBuf>();

        for search_path in &self.search_paths {
            let package_init = search_path.0.join(&relative).join("__init__.py");
            if self.fs.is_file(&package_init) {
                return Ok(package_init);
            }

            let mut plain_file = search_path.0.join(&relative);
            plain_file.set_extension("py");
            if self.fs.is_file(&plain_file) {
                return Ok(plain_file);
            }
        }

        Err(ResolutionError::NotFound(name.clone()))
    }

    pub fn read_source(&self, path: &Path) -> std::io::Result<String> {
        self.fs.read_to_string(path)
    }

    #[must_use]
    pub fn current_dir(&self) -> Option<PathBuf> {
        self.fs.current_dir()
    }

    pub fn set_current_dir(&mut self, dir: &Path) {
        self.fs.set_current_dir(dir);
    }

    /// Derives the qualified name a file would be imported as, relative to
    /// the first search path that contains it (§4.4's qualified-name
    /// derivation, via [`ModuleName::from_path_components`] for the literal-
    /// dot escaping).
    #[must_use]
    pub fn qualified_name_for_path(&self, path: &Path) -> Option<ModuleName> {
        let search_path = self.search_paths.iter().find(|sp| path.starts_with(&sp.0))?;
        let relative = path.strip_prefix(&search_path.0).ok()?;

        let mut components: Vec<&str> = relative
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect();

        if let Some(last) = components.last_mut() {
            *last = last.strip_suffix(".py").unwrap_or(last);
        }
        if components.last() == Some(&"__init__") {
            components.pop();
        }
        if components.is_empty() {
            return None;
        }

        Some(ModuleName::from_path_components(components))
    }

    pub fn parse(
        &self,
        path: &Path,
        source: &str,
    ) -> Result<(crate::ast::ParsedModule, Vec<crate::ast::SyntaxError>), crate::ast::SyntaxError> {
        self.ast.parse(path, source)
    }
}
