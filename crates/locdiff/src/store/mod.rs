pub mod db;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CompareError;

/// Directory under the storage root holding diff artifacts.
pub const DIFF_DIR: &str = "DIFF";

/// Filesystem layout of the screenshot store.
///
/// Screenshots live at `{project}/{locale}/{build}/{screen}.png`, diff
/// artifacts at `DIFF/{source_id}_{target_id}.png`. Relative paths are
/// persisted with `/` separators.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Relative path of a screenshot inside the storage tree.
    pub fn screen_rel(project: &str, locale: &str, build: &str, screen: &str) -> String {
        format!("{project}/{locale}/{build}/{screen}.png")
    }

    /// Relative path of the diff artifact for an ordered id pair.
    pub fn diff_rel(source_id: i64, target_id: i64) -> String {
        format!("{DIFF_DIR}/{source_id}_{target_id}.png")
    }

    /// Absolute path under the storage root.
    pub fn abs(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write screenshot bytes, creating parent directories as needed.
    pub fn store_screen(&self, rel: &str, bytes: &[u8]) -> Result<(), CompareError> {
        let path = self.abs(rel);
        ensure_parent(&path)?;
        fs::write(&path, bytes).map_err(|source| CompareError::StorageWrite { path, source })
    }
}

/// Create the parent directory of `path` if it does not exist.
pub fn ensure_parent(path: &Path) -> Result<(), CompareError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| CompareError::StorageWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}

/// Duplicate the forward diff artifact to the reverse path.
///
/// No-op when the reverse artifact already exists; only the initial copy on
/// first computation is required.
pub fn copy_reverse_artifact(forward: &Path, reverse: &Path) -> Result<(), CompareError> {
    if reverse.exists() {
        return Ok(());
    }
    fs::copy(forward, reverse).map_err(|source| CompareError::StorageWrite {
        path: reverse.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_path_layout() {
        assert_eq!(
            Storage::screen_rel("shop", "ja", "1.2.0", "Install"),
            "shop/ja/1.2.0/Install.png"
        );
    }

    #[test]
    fn diff_path_layout() {
        assert_eq!(Storage::diff_rel(3, 7), "DIFF/3_7.png");
        assert_eq!(Storage::diff_rel(7, 3), "DIFF/7_3.png");
    }

    #[test]
    fn store_screen_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path());
        let rel = Storage::screen_rel("shop", "en", "b1", "Login");
        storage.store_screen(&rel, b"bytes").unwrap();
        assert_eq!(fs::read(storage.abs(&rel)).unwrap(), b"bytes");
    }

    #[test]
    fn reverse_copy_is_noop_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let forward = dir.path().join("fwd.png");
        let reverse = dir.path().join("rev.png");
        fs::write(&forward, b"forward").unwrap();
        fs::write(&reverse, b"existing").unwrap();

        copy_reverse_artifact(&forward, &reverse).unwrap();
        assert_eq!(fs::read(&reverse).unwrap(), b"existing");

        fs::remove_file(&reverse).unwrap();
        copy_reverse_artifact(&forward, &reverse).unwrap();
        assert_eq!(fs::read(&reverse).unwrap(), b"forward");
    }
}
