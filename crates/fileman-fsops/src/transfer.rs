//! File content transfer: upload sinks and download sources.
//!
//! Uploads overwrite an existing file of the same name; a failed upload removes the
//! partially written file.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::error::{ErrorKind, FsOpsError, FsOpsResult};

/// Destination for the bytes of one uploaded file.
#[derive(Debug)]
pub struct UploadSink {
    path: PathBuf,
    file: File,
    written: u64,
}

impl UploadSink {
    pub(crate) async fn create(path: PathBuf) -> FsOpsResult<Self> {
        let file = File::create(&path)
            .await
            .map_err(|source| FsOpsError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    /// Absolute path being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a chunk of bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::WriteFailed`] if the write fails.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> FsOpsResult<()> {
        self.file
            .write_all(chunk)
            .await
            .map_err(|source| FsOpsError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    /// Flush the file to disk and return the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`FsOpsError::WriteFailed`] if flushing fails.
    pub async fn finish(mut self) -> FsOpsResult<u64> {
        self.file
            .flush()
            .await
            .map_err(|source| FsOpsError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        self.file
            .sync_all()
            .await
            .map_err(|source| FsOpsError::WriteFailed {
                path: self.path.clone(),
                source,
            })?;
        Ok(self.written)
    }

    /// Drop the partially written file.
    pub async fn discard(self) {
        let Self { path, file, .. } = self;
        drop(file);
        if let Err(err) = fs::remove_file(&path).await {
            warn!(path = %path.display(), error = %err, "failed to discard partial upload");
        }
    }
}

/// An opened file ready to be streamed to a client.
#[derive(Debug)]
pub struct Download {
    /// Open handle positioned at the start of the file.
    pub file: File,
    /// File name offered to the client.
    pub file_name: String,
    /// Size in bytes.
    pub len: u64,
}

pub(crate) async fn open_download(path: &Path) -> FsOpsResult<Download> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|source| FsOpsError::not_found(path, Some(source)))?;
    if !metadata.is_file() {
        return Err(FsOpsError::not_found(path, None));
    }
    let file = File::open(path).await.map_err(|source| {
        let kind = if source.kind() == io::ErrorKind::NotFound {
            ErrorKind::NotFound
        } else {
            ErrorKind::NotReadable
        };
        FsOpsError::io(kind, "download.open", path, source)
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Download {
        file,
        file_name,
        len: metadata.len(),
    })
}
