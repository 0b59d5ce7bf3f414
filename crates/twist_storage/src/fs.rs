//! Local filesystem backend.

use crate::store::{Storage, StoreError, StoreResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Filesystem storage
///
/// Relative paths resolve against `root`; absolute paths are used as given,
/// matching how traces name fixture files.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create storage rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted at the process working directory
    #[must_use]
    pub fn cwd() -> Self {
        Self::new(".")
    }

    /// Root relative paths resolve against
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }
}

impl Storage for FsStorage {
    fn exists(&self, path: &Path) -> StoreResult<bool> {
        let full = self.resolve(path);
        match fs::metadata(&full) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::from_io(path, &e)),
        }
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        let full = self.resolve(path);
        debug!(path = %full.display(), "reading file");
        fs::read(&full).map_err(|e| StoreError::from_io(path, &e))
    }

    fn write(&mut self, path: &Path, content: &[u8]) -> StoreResult<()> {
        let full = self.resolve(path);
        debug!(path = %full.display(), size = content.len(), "writing file");
        fs::write(&full, content).map_err(|e| StoreError::from_io(path, &e))
    }

    fn append(&mut self, path: &Path, content: &[u8]) -> StoreResult<()> {
        let full = self.resolve(path);
        debug!(path = %full.display(), size = content.len(), "appending to file");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full)
            .map_err(|e| StoreError::from_io(path, &e))?;
        file.write_all(content)
            .map_err(|e| StoreError::from_io(path, &e))
    }

    fn delete(&mut self, path: &Path) -> StoreResult<bool> {
        let full = self.resolve(path);
        match fs::remove_file(&full) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::from_io(path, &e)),
        }
    }

    fn reset_dir(&mut self, dir: &Path) -> StoreResult<()> {
        let full = self.resolve(dir);
        debug!(dir = %full.display(), "resetting directory");
        match fs::remove_dir_all(&full) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::from_io(dir, &e)),
        }
        fs::create_dir_all(&full).map_err(|e| StoreError::from_io(dir, &e))
    }

    fn copy(&mut self, from: &Path, to: &Path) -> StoreResult<()> {
        let src = self.resolve(from);
        let dst = self.resolve(to);
        debug!(from = %src.display(), to = %dst.display(), "copying file");
        if !src.is_file() {
            return Err(StoreError::not_found(from));
        }
        fs::copy(&src, &dst)
            .map(|_| ())
            .map_err(|e| StoreError::from_io(to, &e))
    }
}
