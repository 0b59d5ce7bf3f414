//! Storage interface.

use std::path::Path;

/// Storage result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Path does not exist
    #[error("Path not found: {path}")]
    NotFound {
        /// Missing path
        path: String,
    },
    /// Underlying I/O failure
    #[error("IO error on {path}: {reason}")]
    Io {
        /// Path being accessed
        path: String,
        /// Failure description
        reason: String,
    },
}

impl StoreError {
    /// Build a not-found error for a path
    #[must_use]
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.display().to_string(),
        }
    }

    /// Map an `std::io::Error` for a path, keeping not-found distinguishable
    #[must_use]
    pub fn from_io(path: &Path, err: &std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(path)
        } else {
            Self::Io {
                path: path.display().to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Whether the error means the path was absent
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Byte storage the replay engine mutates
///
/// Mutation takes `&mut self`; a replay owns its storage for the whole run.
pub trait Storage {
    /// Check if a path holds content
    ///
    /// # Errors
    ///
    /// Returns error if existence cannot be determined
    fn exists(&self, path: &Path) -> StoreResult<bool>;

    /// Read the whole content of a path
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the path is absent
    fn read(&self, path: &Path) -> StoreResult<Vec<u8>>;

    /// Replace or create a path's content
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    fn write(&mut self, path: &Path, content: &[u8]) -> StoreResult<()>;

    /// Append to a path, creating it if absent
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    fn append(&mut self, path: &Path, content: &[u8]) -> StoreResult<()>;

    /// Delete a path; returns whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if the path exists but cannot be removed
    fn delete(&mut self, path: &Path) -> StoreResult<bool>;

    /// Remove everything under `dir` and leave it empty
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be cleared or created
    fn reset_dir(&mut self, dir: &Path) -> StoreResult<()>;

    /// Copy `from` to `to`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `from` is absent
    fn copy(&mut self, from: &Path, to: &Path) -> StoreResult<()> {
        let content = self.read(from)?;
        self.write(to, &content)
    }

    /// Compare two paths byte for byte
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either side is absent
    fn byte_equals(&self, left: &Path, right: &Path) -> StoreResult<bool> {
        Ok(self.read(left)? == self.read(right)?)
    }
}
