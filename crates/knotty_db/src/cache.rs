//! The on-disk AST cache (§6 Non-goals list it as external; §4.8 of the
//! expanded spec gives it a concrete home here): a content-hash-keyed blob
//! store under the system temp directory, so re-analyzing an unchanged tree
//! of files doesn't re-pay parse cost.
//!
//! `red_knot_python_semantic` gets this for free from Salsa's own query
//! memoization; since this crate's Design Notes rule out an ambient
//! incremental layer, the same effect is approximated here with a plain,
//! explicitly-passed cache the caller consults before invoking the parser.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use rustc_hash::FxHasher;

/// A cache directory rooted at `<tempdir>/<product>/ast_cache`.
pub struct AstCache {
    root: PathBuf,
}

impl AstCache {
    /// Creates (if needed) and opens the cache directory for `product`
    /// (e.g. `"knotty"`), rooted under the system temp directory.
    pub fn open(product: &str) -> std::io::Result<Self> {
        let root = std::env::temp_dir().join(product).join("ast_cache");
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    #[must_use]
    pub fn open_in(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Flushes the cache (§5: "closed explicitly via `close()`"). Every
    /// write already lands synchronously via [`Self::put`], so there is no
    /// buffered state to persist; this exists so callers have the same
    /// explicit open/close bracket the resource-lifecycle design calls for.
    pub fn close(self) {
        drop(self);
    }

    fn entry_path(&self, path: &Path, content: &str) -> PathBuf {
        let mut hasher = FxHasher::default();
        path.hash(&mut hasher);
        content.hash(&mut hasher);
        self.root.join(format!("{:016x}.cache", hasher.finish()))
    }

    #[must_use]
    pub fn get(&self, path: &Path, content: &str) -> Option<Vec<u8>> {
        std::fs::read(self.entry_path(path, content)).ok()
    }

    pub fn put(&self, path: &Path, content: &str, bytes: &[u8]) -> std::io::Result<()> {
        std::fs::write(self.entry_path(path, content), bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_cached_blob() {
        let dir = tempfile::tempdir().unwrap();
        let cache = AstCache::open_in(dir.path().to_path_buf());
        let path = Path::new("pkg/mod.py");

        assert!(cache.get(path, "x = 1").is_none());
        cache.put(path, "x = 1", b"cached").unwrap();
        assert_eq!(cache.get(path, "x = 1").as_deref(), Some(&b"cached"[..]));

        // A different content hash misses, even for the same path.
        assert!(cache.get(path, "x = 2").is_none());
    }
}
