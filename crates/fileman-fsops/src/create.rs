//! Single-directory creation.
//!
//! Existence is checked before creating; the check and the create are not atomic, so a
//! concurrent creator surfaces as `CreateFailed` from the create call itself.

use std::io;
use std::path::Path;

use tokio::fs;

use crate::error::{FsOpsError, FsOpsResult};

/// Create `target` as a new directory; its parent must already exist.
///
/// # Errors
///
/// Returns [`FsOpsError::AlreadyExists`] when anything already occupies `target`, and
/// [`FsOpsError::CreateFailed`] for every other failure.
pub async fn create_directory(target: &Path) -> FsOpsResult<()> {
    match fs::symlink_metadata(target).await {
        Ok(_) => {
            return Err(FsOpsError::AlreadyExists {
                path: target.to_path_buf(),
            });
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(FsOpsError::CreateFailed {
                path: target.to_path_buf(),
                source: err,
            });
        }
    }

    fs::create_dir(target)
        .await
        .map_err(|source| FsOpsError::CreateFailed {
            path: target.to_path_buf(),
            source,
        })
}
