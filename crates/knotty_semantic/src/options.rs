//! Analysis configuration (§6 expansion): the knobs a caller sets before
//! `analyze()` runs, and `PYTHONPATH`-style search-path configuration.
//!
//! Modeled on `ruff`'s `Args`/`LogLevel` split between "what to analyze" and
//! "how noisy to be", kept here instead of in `knotty_cli` so a library
//! caller gets the same configuration surface the CLI does.

use std::path::PathBuf;

use crate::module_resolver::SearchPath;

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub quiet: bool,
    pub debug: bool,
    /// Extra search-path entries beyond the project root and current
    /// working directory, in priority order.
    pub extra_search_paths: Vec<PathBuf>,
}

impl Options {
    /// Splits a `PYTHONPATH`-shaped string on the platform's path-list
    /// separator (`:` on Unix, `;` on Windows) into search path entries,
    /// dropping empty segments (a leading/trailing/doubled separator).
    pub fn parse_pythonpath(raw: &str) -> Vec<PathBuf> {
        std::env::split_paths(raw).filter(|p| !p.as_os_str().is_empty()).collect()
    }

    /// Builds the full, ordered search path list for a project rooted at
    /// `root`: the root itself first, then the current working directory
    /// (if different), then every configured extra path, matching the
    /// order named in §4.4 ("cwd, project root, configured paths") with the
    /// project root moved first since it's what `analyze()` was actually
    /// asked to analyze.
    #[must_use]
    pub fn search_paths(&self, root: &std::path::Path, cwd: &std::path::Path) -> Vec<SearchPath> {
        let mut paths = vec![SearchPath(root.to_path_buf())];
        if cwd != root {
            paths.push(SearchPath(cwd.to_path_buf()));
        }
        paths.extend(self.extra_search_paths.iter().cloned().map(SearchPath));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::Options;
    use std::path::PathBuf;

    #[test]
    fn parses_platform_path_list_dropping_empties() {
        let sep = if cfg!(windows) { ";" } else { ":" };
        let raw = format!("a{sep}{sep}b");
        assert_eq!(
            Options::parse_pythonpath(&raw),
            vec![PathBuf::from("a"), PathBuf::from("b")]
        );
    }
}
