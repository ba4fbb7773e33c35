//! The filesystem collaborator (§6): every touch of disk the semantic core
//! makes goes through this trait, so tests can substitute an in-memory
//! filesystem instead of writing temp files.
//!
//! No equivalent file was retrieved from the teacher's own `ruff_db` crate
//! in this pack, but every call site in `red_knot_python_semantic` that
//! would otherwise call `std::fs` directly goes through its `System` trait
//! instead; this trait plays the same role, trimmed to the handful of
//! operations the module loader actually needs (§4.4: existence checks,
//! reads, and the per-file working-directory save/restore).

use std::path::{Path, PathBuf};

/// Filesystem operations the module loader needs. Implemented by
/// [`OsFileSystem`] for real runs and freely mockable in tests.
pub trait FileSystem {
    fn is_file(&self, path: &Path) -> bool;
    fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
    /// `None` if the current directory cannot be determined (e.g. it was
    /// deleted out from under the process).
    fn current_dir(&self) -> Option<PathBuf>;
    fn set_current_dir(&self, path: &Path);
}

/// The real filesystem, via `std::fs` and the process's actual working
/// directory.
///
/// Changing the process-wide working directory is global, mutable state;
/// this is only sound because analysis is single-threaded and always
/// restores the previous directory before returning to its caller (§4.4).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn current_dir(&self) -> Option<PathBuf> {
        std::env::current_dir().ok()
    }

    fn set_current_dir(&self, path: &Path) {
        if let Err(error) = std::env::set_current_dir(path) {
            tracing::warn!(path = %path.display(), %error, "failed to change working directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn os_filesystem_reads_back_what_it_wrote() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("mod.py");
        std::fs::write(&file, "x = 1\n").unwrap();

        let fs = OsFileSystem;
        assert!(fs.is_file(&file));
        assert_eq!(fs.read_to_string(&file).unwrap(), "x = 1\n");
        assert!(!fs.is_file(&dir.path().join("missing.py")));
    }
}
