//! In-memory backend.

use crate::store::{Storage, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// In-memory storage for testing
///
/// Directories are implicit: a path exists only if content was written to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryStorage {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Content of a path, if present
    #[must_use]
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&[u8]> {
        self.files.get(path.as_ref()).map(Vec::as_slice)
    }

    /// All paths currently holding content
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Number of files
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, path: &Path) -> StoreResult<bool> {
        Ok(self.files.contains_key(path))
    }

    fn read(&self, path: &Path) -> StoreResult<Vec<u8>> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }

    fn write(&mut self, path: &Path, content: &[u8]) -> StoreResult<()> {
        self.files.insert(path.to_path_buf(), content.to_vec());
        Ok(())
    }

    fn append(&mut self, path: &Path, content: &[u8]) -> StoreResult<()> {
        self.files
            .entry(path.to_path_buf())
            .or_default()
            .extend_from_slice(content);
        Ok(())
    }

    fn delete(&mut self, path: &Path) -> StoreResult<bool> {
        Ok(self.files.remove(path).is_some())
    }

    fn reset_dir(&mut self, dir: &Path) -> StoreResult<()> {
        self.files.retain(|path, _| !path.starts_with(dir));
        Ok(())
    }
}
