//! Test fixtures and filesystem helpers.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Temporary storage root that is removed when dropped.
#[derive(Debug)]
pub struct StorageFixture {
    dir: TempDir,
}

impl StorageFixture {
    /// Create an empty storage root.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("fileman-storage-")
            .tempdir()
            .context("failed to create storage fixture")?;
        Ok(Self { dir })
    }

    /// Absolute path of the storage root.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of a root-relative entry (`"a/b.txt"`).
    #[must_use]
    pub fn path(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root().to_path_buf(), |acc, segment| acc.join(segment))
    }

    /// Create a directory (and its parents) below the root.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_dir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.path(relative);
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        Ok(path)
    }

    /// Write a file below the root, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or its parents cannot be written.
    pub fn write_file(&self, relative: &str, contents: impl AsRef<[u8]>) -> Result<PathBuf> {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Read a file below the root as UTF-8.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or not UTF-8.
    pub fn read_to_string(&self, relative: &str) -> Result<String> {
        let path = self.path(relative);
        fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
    }

    /// Whether a root-relative entry exists.
    #[must_use]
    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }
}
