//! Directory enumeration with per-child metadata.
//!
//! # Design
//! - A directory that cannot be opened fails the whole call with `NotReadable`.
//! - Each child is stat'ed on its own; a failed stat degrades only that entry.
//! - Enumeration order is preserved; sorting is left to the client.

use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::error::{FsOpsError, FsOpsResult};
use crate::model::Entry;

/// List the children of an already resolved directory.
///
/// # Errors
///
/// Returns [`FsOpsError::NotReadable`] if the directory cannot be opened or enumerated.
pub async fn list_directory(dir: &Path) -> FsOpsResult<Vec<Entry>> {
    let mut reader = fs::read_dir(dir)
        .await
        .map_err(|source| FsOpsError::NotReadable {
            path: dir.to_path_buf(),
            source,
        })?;

    let mut entries = Vec::new();
    while let Some(child) = reader
        .next_entry()
        .await
        .map_err(|source| FsOpsError::NotReadable {
            path: dir.to_path_buf(),
            source,
        })?
    {
        let name = child.file_name().to_string_lossy().into_owned();
        let entry = match fs::metadata(child.path()).await {
            Ok(metadata) => Entry::from_metadata(name, &metadata),
            Err(err) => {
                debug!(entry = %name, error = %err, "stat failed; listing fallback entry");
                Entry::unreadable(name)
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::EntryKind;
    use anyhow::{Result, anyhow};

    #[tokio::test]
    async fn lists_files_and_directories() -> Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::create_dir(temp.path().join("child"))?;
        std::fs::write(temp.path().join("file.txt"), "data")?;

        let mut entries = list_directory(temp.path()).await?;
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "child");
        assert_eq!(entries[0].kind, EntryKind::Directory);
        assert_eq!(entries[1].name, "file.txt");
        assert_eq!(entries[1].kind, EntryKind::File);
        assert_eq!(entries[1].size_bytes, 4);
        assert!(entries[1].modified_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn empty_directory_lists_nothing() -> Result<()> {
        let temp = tempfile::tempdir()?;
        assert!(list_directory(temp.path()).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_directory_is_not_readable() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let err = list_directory(&temp.path().join("missing"))
            .await
            .err()
            .ok_or_else(|| anyhow!("expected read failure"))?;
        assert_eq!(err.kind(), ErrorKind::NotReadable);
        Ok(())
    }

    #[tokio::test]
    async fn file_path_is_not_readable() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let file = temp.path().join("file.txt");
        std::fs::write(&file, "data")?;
        let err = list_directory(&file)
            .await
            .err()
            .ok_or_else(|| anyhow!("expected read failure"))?;
        assert_eq!(err.kind(), ErrorKind::NotReadable);
        Ok(())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dangling_symlink_degrades_to_fallback_entry() -> Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::write(temp.path().join("real.txt"), "abc")?;
        std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("broken"))?;

        let entries = list_directory(temp.path()).await?;
        assert_eq!(entries.len(), 2);
        let broken = entries
            .iter()
            .find(|entry| entry.name == "broken")
            .ok_or_else(|| anyhow!("broken entry missing"))?;
        assert_eq!(broken, &Entry::unreadable("broken".to_string()));
        Ok(())
    }
}
