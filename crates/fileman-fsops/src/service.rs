//! File manager service: the single entry point the HTTP layer talks to.
//!
//! # Design
//! - Every logical path goes through [`PathResolver`] before any filesystem call.
//! - Request-level failures (unresolvable source/destination, unreadable directory) are
//!   returned as `Err`; item-level failures are folded into the [`BatchReport`].
//! - Holds no per-request state; cheap to clone and share behind an `Arc`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileman_telemetry::Metrics;
use tokio::fs;
use tracing::{info, instrument};

use crate::batch::{BatchExecutor, BatchLimits, ItemAction, PlannedItem};
use crate::create::create_directory;
use crate::error::{FsOpsError, FsOpsResult};
use crate::listing::list_directory;
use crate::model::{BatchReport, Entry, OperationKind, OperationRequest, OperationResult};
use crate::resolver::PathResolver;
use crate::transfer::{Download, UploadSink, open_download};

/// Sandboxed file manager bound to one storage root.
#[derive(Clone)]
pub struct FileManager {
    resolver: Arc<PathResolver>,
    executor: BatchExecutor,
}

impl FileManager {
    /// Build a file manager over the resolver's storage root.
    #[must_use]
    pub fn new(resolver: PathResolver, limits: BatchLimits, metrics: Metrics) -> Self {
        Self {
            resolver: Arc::new(resolver),
            executor: BatchExecutor::new(limits, metrics),
        }
    }

    /// Resolver guarding this manager's storage root.
    #[must_use]
    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Limits applied to every batch.
    #[must_use]
    pub const fn limits(&self) -> BatchLimits {
        self.executor.limits()
    }

    /// List the entries of a logical directory.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` for paths outside the root and `NotReadable` when the
    /// directory cannot be enumerated.
    #[instrument(name = "fileman.list", skip(self))]
    pub async fn list(&self, logical: &str) -> FsOpsResult<Vec<Entry>> {
        let dir = self.resolver.resolve(logical)?;
        list_directory(&dir).await
    }

    /// Create `name` inside the logical directory `parent`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank name, `PathEscape` for unsafe paths or names,
    /// `AlreadyExists` when the target is taken, and `CreateFailed` otherwise.
    #[instrument(name = "fileman.create_directory", skip(self))]
    pub async fn create_directory(&self, parent: &str, name: &str) -> FsOpsResult<PathBuf> {
        if name.trim().is_empty() {
            return Err(FsOpsError::InvalidInput {
                field: "directory",
                reason: "empty",
                value: Some(name.to_string()),
            });
        }
        let parent_dir = self.resolver.resolve(parent)?;
        let target = self.resolver.resolve_child(&parent_dir, name)?;
        create_directory(&target).await?;
        info!(path = %target.display(), "directory created");
        Ok(target)
    }

    /// Copy every item from the source directory into the destination directory.
    ///
    /// # Errors
    ///
    /// Returns request-level errors only: an unsafe source/destination or a missing
    /// destination field.
    pub async fn copy(&self, request: OperationRequest) -> FsOpsResult<BatchReport> {
        self.transfer(OperationKind::Copy, request).await
    }

    /// Move every item from the source directory into the destination directory.
    ///
    /// # Errors
    ///
    /// Returns request-level errors only: an unsafe source/destination or a missing
    /// destination field.
    pub async fn move_items(&self, request: OperationRequest) -> FsOpsResult<BatchReport> {
        self.transfer(OperationKind::Move, request).await
    }

    /// Remove every item from the source directory.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` when the source directory is outside the root.
    pub async fn remove(&self, request: OperationRequest) -> FsOpsResult<BatchReport> {
        let source_dir = self.resolver.resolve(&request.source_path)?;
        let recursive = request.recursive.unwrap_or(false);
        let items = request
            .items
            .into_iter()
            .map(|item| {
                let action = self
                    .resolver
                    .resolve_child(&source_dir, &item.name)
                    .map(|path| ItemAction::Remove {
                        path,
                        kind: item.kind,
                        recursive,
                    });
                PlannedItem::new(item.name, action)
            })
            .collect();
        Ok(self.executor.run(OperationKind::Remove, items).await)
    }

    /// Move or rename one entry from one full logical path to another.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` for unsafe paths and `InvalidInput` when either side is the
    /// storage root itself. Filesystem failures are reported in the returned result.
    pub async fn move_item(&self, from: &str, to: &str) -> FsOpsResult<OperationResult> {
        let source = self.resolver.resolve(from)?;
        let destination = self.resolver.resolve(to)?;
        for (field, path, value) in [("path", &source, from), ("destination", &destination, to)]
        {
            if self.resolver.is_root(path) {
                return Err(FsOpsError::InvalidInput {
                    field,
                    reason: "storage_root",
                    value: Some(value.to_string()),
                });
            }
        }

        let item_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let item = PlannedItem::new(
            item_name,
            Ok(ItemAction::Rename {
                from: source,
                to: destination,
            }),
        );
        let mut report = self
            .executor
            .run(OperationKind::SingleMove, vec![item])
            .await;
        report.results.pop().ok_or(FsOpsError::InvalidInput {
            field: "path",
            reason: "no_result",
            value: Some(from.to_string()),
        })
    }

    /// Open a logical file for download.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` for unsafe paths and `NotFound` unless the target is a regular
    /// file.
    pub async fn open_download(&self, logical: &str) -> FsOpsResult<Download> {
        let path = self.resolver.resolve(logical)?;
        open_download(&path).await
    }

    /// Resolve the directory an upload writes into; it must already exist.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` for unsafe paths and `DestinationNotFound` when the directory
    /// is missing.
    pub async fn upload_directory(&self, logical: &str) -> FsOpsResult<PathBuf> {
        let dir = self.resolver.resolve(logical)?;
        let is_dir = fs::metadata(&dir)
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        if !is_dir {
            return Err(FsOpsError::DestinationNotFound { path: dir });
        }
        Ok(dir)
    }

    /// Start writing an uploaded file named `file_name` into `dir`.
    ///
    /// # Errors
    ///
    /// Returns `PathEscape` when the name is not a single safe segment and `WriteFailed`
    /// when the file cannot be created.
    pub async fn begin_upload(&self, dir: &Path, file_name: &str) -> FsOpsResult<UploadSink> {
        let path = self.resolver.resolve_child(dir, file_name)?;
        UploadSink::create(path).await
    }

    async fn transfer(
        &self,
        operation: OperationKind,
        request: OperationRequest,
    ) -> FsOpsResult<BatchReport> {
        let source_dir = self.resolver.resolve(&request.source_path)?;
        let destination = request
            .destination_path
            .as_deref()
            .ok_or(FsOpsError::InvalidInput {
                field: "destination",
                reason: "missing",
                value: None,
            })?;
        let destination_dir = self.resolver.resolve(destination)?;

        let items = request
            .items
            .into_iter()
            .map(|item| {
                let action = self
                    .resolver
                    .resolve_child(&source_dir, &item.name)
                    .and_then(|from| {
                        self.resolver
                            .resolve_child(&destination_dir, &item.name)
                            .map(|to| match operation {
                                OperationKind::Copy => ItemAction::Copy { from, to },
                                _ => ItemAction::Rename { from, to },
                            })
                    });
                PlannedItem::new(item.name, action)
            })
            .collect();
        Ok(self.executor.run(operation, items).await)
    }
}
