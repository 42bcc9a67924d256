//! Concurrent batch execution with a join-all-settle barrier.
//!
//! # Design
//! - Every item is spawned as its own task up front; a semaphore bounds how many run at once.
//! - The barrier waits for every item; one failure never cancels or hides another result.
//! - An optional batch deadline turns still-unsettled items into `Timeout` failures. Copies
//!   are cancelled at the deadline and their partial target is removed; a rename or removal
//!   already handed to the OS cannot be recalled.
//! - No rollback of settled items: a partially applied batch is reported item by item.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use fileman_telemetry::Metrics;
use futures_util::future::join_all;
use tokio::fs::{self, File};
use tokio::io::{self as async_io, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::error::{ErrorKind, FsOpsError, FsOpsResult};
use crate::model::{
    BatchReport, BatchState, EntryKind, ErrorDetail, ItemState, OperationKind, OperationResult,
};

/// Default cap on concurrently running items per batch.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;
/// Default deadline for a whole batch.
pub const DEFAULT_BATCH_DEADLINE: Duration = Duration::from_secs(300);

/// Resource bounds applied to every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of items whose filesystem action runs at the same time.
    pub max_in_flight: usize,
    /// Deadline for the whole batch; `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            deadline: Some(DEFAULT_BATCH_DEADLINE),
        }
    }
}

/// Filesystem action planned for one item.
#[derive(Debug, Clone)]
pub(crate) enum ItemAction {
    Copy {
        from: PathBuf,
        to: PathBuf,
    },
    Rename {
        from: PathBuf,
        to: PathBuf,
    },
    Remove {
        path: PathBuf,
        kind: EntryKind,
        recursive: bool,
    },
    #[cfg(test)]
    Stall { path: PathBuf, duration: Duration },
}

impl ItemAction {
    fn source(&self) -> &Path {
        match self {
            Self::Copy { from, .. } | Self::Rename { from, .. } => from,
            Self::Remove { path, .. } => path,
            #[cfg(test)]
            Self::Stall { path, .. } => path,
        }
    }

    fn destination(&self) -> Option<&Path> {
        match self {
            Self::Copy { to, .. } | Self::Rename { to, .. } => Some(to),
            Self::Remove { .. } => None,
            #[cfg(test)]
            Self::Stall { .. } => None,
        }
    }

    async fn execute(self) -> FsOpsResult<()> {
        match self {
            Self::Copy { from, to } => copy_entry(from, to).await,
            Self::Rename { from, to } => rename_entry(from, to).await,
            Self::Remove {
                path,
                kind,
                recursive,
            } => remove_entry(path, kind, recursive).await,
            #[cfg(test)]
            Self::Stall { duration, .. } => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}

/// An item whose paths have been resolved, or that was rejected while resolving.
#[derive(Debug)]
pub(crate) struct PlannedItem {
    name: String,
    action: FsOpsResult<ItemAction>,
}

impl PlannedItem {
    pub(crate) const fn new(name: String, action: FsOpsResult<ItemAction>) -> Self {
        Self { name, action }
    }
}

struct PendingItem {
    name: String,
    source: Option<PathBuf>,
    destination: Option<PathBuf>,
    task: FsOpsResult<JoinHandle<FsOpsResult<()>>>,
}

/// Runs planned items concurrently and aggregates their outcomes.
#[derive(Clone)]
pub(crate) struct BatchExecutor {
    limits: BatchLimits,
    metrics: Metrics,
}

impl BatchExecutor {
    pub(crate) const fn new(limits: BatchLimits, metrics: Metrics) -> Self {
        Self { limits, metrics }
    }

    pub(crate) const fn limits(&self) -> BatchLimits {
        self.limits
    }

    pub(crate) async fn run(&self, operation: OperationKind, items: Vec<PlannedItem>) -> BatchReport {
        let total = items.len();
        let started = Instant::now();
        let deadline = self.limits.deadline.map(|limit| started + limit);
        let permits = Arc::new(Semaphore::new(self.limits.max_in_flight.max(1)));
        info!(
            operation = operation.as_str(),
            items = total,
            state = BatchState::Collecting.as_str(),
            "batch started"
        );
        self.metrics.batch_started();

        let pending: Vec<PendingItem> = items
            .into_iter()
            .map(|item| Self::launch(operation, item, &permits))
            .collect();
        let results = join_all(
            pending
                .into_iter()
                .map(|item| self.settle(operation, item, deadline)),
        )
        .await;

        let report = BatchReport::from_results(results);
        self.metrics.batch_settled(started.elapsed());
        info!(
            operation = operation.as_str(),
            items = total,
            failed = report.failed_count(),
            state = BatchState::AllSettled.as_str(),
            "batch settled"
        );
        report
    }

    fn launch(operation: OperationKind, item: PlannedItem, permits: &Arc<Semaphore>) -> PendingItem {
        let PlannedItem { name, action } = item;
        let action = match action {
            Ok(action) => action,
            Err(err) => {
                return PendingItem {
                    name,
                    source: None,
                    destination: None,
                    task: Err(err),
                };
            }
        };

        let source = Some(action.source().to_path_buf());
        let destination = action.destination().map(Path::to_path_buf);
        let permits = Arc::clone(permits);
        let item_name = name.clone();
        debug!(
            operation = operation.as_str(),
            item = %name,
            state = ItemState::Pending.as_str(),
            "batch item queued"
        );

        let task = tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return Err(FsOpsError::io(
                    failure_kind(operation),
                    "batch.acquire_permit",
                    action.source(),
                    io::Error::other("batch semaphore closed"),
                ));
            };
            debug!(
                operation = operation.as_str(),
                item = %item_name,
                state = ItemState::Running.as_str(),
                "batch item running"
            );
            action.execute().await
        });

        PendingItem {
            name,
            source,
            destination,
            task: Ok(task),
        }
    }

    async fn settle(
        &self,
        operation: OperationKind,
        item: PendingItem,
        deadline: Option<Instant>,
    ) -> OperationResult {
        let PendingItem {
            name,
            source,
            destination,
            task,
        } = item;

        let outcome = match task {
            Ok(mut handle) => match deadline {
                Some(deadline) => match timeout_at(deadline, &mut handle).await {
                    Ok(joined) => {
                        flatten_join(operation, source.as_deref(), destination.as_deref(), joined)
                    }
                    Err(_) => {
                        handle.abort();
                        Err(FsOpsError::Timeout {
                            operation: operation.as_str(),
                            after: self.limits.deadline.unwrap_or_default(),
                        })
                    }
                },
                None => flatten_join(
                    operation,
                    source.as_deref(),
                    destination.as_deref(),
                    handle.await,
                ),
            },
            Err(err) => Err(err),
        };

        let (state, error) = match outcome {
            Ok(()) => (ItemState::Succeeded, None),
            Err(err) => {
                warn!(
                    operation = operation.as_str(),
                    item = %name,
                    kind = err.kind().as_str(),
                    error = ?err,
                    "batch item failed"
                );
                (ItemState::Failed, Some(ErrorDetail::from(&err)))
            }
        };
        debug!(
            operation = operation.as_str(),
            item = %name,
            state = state.as_str(),
            "batch item settled"
        );
        self.metrics
            .record_batch_item(operation.as_str(), state.as_str());

        OperationResult {
            item_name: name,
            success: error.is_none(),
            source_abs_path: source,
            dest_abs_path: destination,
            error,
        }
    }
}

/// Kind reported when an item fails outside its filesystem action.
const fn failure_kind(operation: OperationKind) -> ErrorKind {
    match operation {
        OperationKind::Copy => ErrorKind::CopyFailed,
        OperationKind::Move | OperationKind::SingleMove => ErrorKind::RenameFailed,
        OperationKind::Remove => ErrorKind::RemoveFailed,
    }
}

fn flatten_join(
    operation: OperationKind,
    source: Option<&Path>,
    destination: Option<&Path>,
    joined: Result<FsOpsResult<()>, JoinError>,
) -> FsOpsResult<()> {
    joined.unwrap_or_else(|err| {
        let from = source.map(Path::to_path_buf).unwrap_or_default();
        let to = destination.map(Path::to_path_buf).unwrap_or_default();
        let cause = io::Error::other(err.to_string());
        Err(match operation {
            OperationKind::Copy => FsOpsError::CopyFailed {
                from,
                to,
                source: cause,
            },
            OperationKind::Move | OperationKind::SingleMove => FsOpsError::RenameFailed {
                from,
                to,
                source: cause,
            },
            OperationKind::Remove => FsOpsError::RemoveFailed {
                path: from,
                source: cause,
            },
        })
    })
}

async fn copy_entry(from: PathBuf, to: PathBuf) -> FsOpsResult<()> {
    let metadata = match fs::metadata(&from).await {
        Ok(metadata) => metadata,
        Err(err) => return Err(classify_transfer(&from, &to, err, copy_failed).await),
    };

    let copied = if metadata.is_dir() {
        if to.starts_with(&from) {
            return Err(FsOpsError::InvalidInput {
                field: "destination",
                reason: "inside_source",
                value: Some(to.to_string_lossy().into_owned()),
            });
        }
        copy_tree(&from, &to).await
    } else {
        copy_file(&from, &to).await
    };
    match copied {
        Ok(()) => Ok(()),
        Err(err) => Err(classify_transfer(&from, &to, err, copy_failed).await),
    }
}

async fn rename_entry(from: PathBuf, to: PathBuf) -> FsOpsResult<()> {
    match fs::rename(&from, &to).await {
        Ok(()) => Ok(()),
        Err(err) => Err(classify_transfer(&from, &to, err, rename_failed).await),
    }
}

async fn remove_entry(path: PathBuf, kind: EntryKind, recursive: bool) -> FsOpsResult<()> {
    let removed = match (kind, recursive) {
        (EntryKind::Directory, true) => fs::remove_dir_all(&path).await,
        (EntryKind::Directory, false) => fs::remove_dir(&path).await,
        (EntryKind::File, _) => fs::remove_file(&path).await,
    };
    removed.map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            FsOpsError::not_found(path, Some(source))
        } else {
            FsOpsError::RemoveFailed { path, source }
        }
    })
}

fn copy_failed(from: PathBuf, to: PathBuf, source: io::Error) -> FsOpsError {
    FsOpsError::CopyFailed { from, to, source }
}

fn rename_failed(from: PathBuf, to: PathBuf, source: io::Error) -> FsOpsError {
    FsOpsError::RenameFailed { from, to, source }
}

/// Attribute a failed transfer to the missing destination, the missing source, or the
/// operation itself, in that order.
async fn classify_transfer(
    from: &Path,
    to: &Path,
    err: io::Error,
    failed: fn(PathBuf, PathBuf, io::Error) -> FsOpsError,
) -> FsOpsError {
    if let Some(parent) = to.parent() {
        let parent_is_dir = fs::metadata(parent)
            .await
            .is_ok_and(|metadata| metadata.is_dir());
        if !parent_is_dir {
            return FsOpsError::DestinationNotFound {
                path: parent.to_path_buf(),
            };
        }
    }
    if fs::symlink_metadata(from).await.is_err() {
        return FsOpsError::not_found(from, Some(err));
    }
    failed(from.to_path_buf(), to.to_path_buf(), err)
}

/// Target of an in-progress copy, removed on drop unless the copy completed.
///
/// An item aborted at the batch deadline drops its task at the next await point, so the
/// partial target never outlives a `Timeout` result.
struct PartialCopy {
    path: PathBuf,
    is_dir: bool,
    armed: bool,
}

impl PartialCopy {
    const fn file(path: PathBuf) -> Self {
        Self {
            path,
            is_dir: false,
            armed: true,
        }
    }

    const fn directory(path: PathBuf) -> Self {
        Self {
            path,
            is_dir: true,
            armed: true,
        }
    }

    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialCopy {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let removed = if self.is_dir {
            std::fs::remove_dir_all(&self.path)
        } else {
            std::fs::remove_file(&self.path)
        };
        match removed {
            Ok(()) => debug!(path = %self.path.display(), "partial copy removed"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to remove partial copy");
            }
        }
    }
}

async fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from).await?;
    let permissions = source.metadata().await?.permissions();
    let mut target = File::create(to).await?;
    let guard = PartialCopy::file(to.to_path_buf());
    async_io::copy(&mut source, &mut target).await?;
    target.flush().await?;
    drop(target);
    fs::set_permissions(to, permissions).await?;
    guard.complete();
    Ok(())
}

async fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir(to).await?;
    let guard = PartialCopy::directory(to.to_path_buf());
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    while let Some((source_dir, target_dir)) = pending.pop() {
        let mut entries = fs::read_dir(&source_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = target_dir.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                fs::create_dir(&target).await?;
                pending.push((entry.path(), target));
            } else {
                copy_file(&entry.path(), &target).await?;
            }
        }
    }
    guard.complete();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use tempfile::TempDir;

    fn executor(limits: BatchLimits) -> Result<BatchExecutor> {
        Ok(BatchExecutor::new(limits, Metrics::new()?))
    }

    fn seeded() -> Result<TempDir> {
        let temp = tempfile::Builder::new().prefix("fileman-batch-").tempdir()?;
        std::fs::create_dir(temp.path().join("src"))?;
        std::fs::create_dir(temp.path().join("dst"))?;
        Ok(temp)
    }

    fn copy_plan(temp: &TempDir, name: &str) -> PlannedItem {
        PlannedItem::new(
            name.to_string(),
            Ok(ItemAction::Copy {
                from: temp.path().join("src").join(name),
                to: temp.path().join("dst").join(name),
            }),
        )
    }

    #[tokio::test]
    async fn empty_batch_settles_immediately() -> Result<()> {
        let report = executor(BatchLimits::default())?
            .run(OperationKind::Copy, Vec::new())
            .await;
        assert!(report.results.is_empty());
        assert!(report.overall_success);
        Ok(())
    }

    #[tokio::test]
    async fn rejected_plan_is_reported_without_running() -> Result<()> {
        let report = executor(BatchLimits::default())?
            .run(
                OperationKind::Remove,
                vec![PlannedItem::new(
                    "../x".to_string(),
                    Err(FsOpsError::escape("../x")),
                )],
            )
            .await;
        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert!(!result.success);
        assert!(result.source_abs_path.is_none());
        let kind = result.error.as_ref().map(|error| error.kind);
        assert_eq!(kind, Some(ErrorKind::PathEscape));
        Ok(())
    }

    #[tokio::test]
    async fn serialized_batch_still_settles_every_item() -> Result<()> {
        let temp = seeded()?;
        for name in ["a", "b", "c"] {
            std::fs::write(temp.path().join("src").join(name), name)?;
        }
        let limits = BatchLimits {
            max_in_flight: 1,
            deadline: None,
        };
        let items = ["a", "missing", "b", "c"]
            .into_iter()
            .map(|name| copy_plan(&temp, name))
            .collect();

        let report = executor(limits)?.run(OperationKind::Copy, items).await;
        let outcomes: Vec<_> = report
            .results
            .iter()
            .map(|result| (result.item_name.as_str(), result.success))
            .collect();
        assert_eq!(
            outcomes,
            vec![("a", true), ("missing", false), ("b", true), ("c", true)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn copy_into_missing_destination_reports_destination_not_found() -> Result<()> {
        let temp = seeded()?;
        std::fs::write(temp.path().join("src").join("a"), "a")?;
        let item = PlannedItem::new(
            "a".to_string(),
            Ok(ItemAction::Copy {
                from: temp.path().join("src").join("a"),
                to: temp.path().join("nowhere").join("a"),
            }),
        );

        let report = executor(BatchLimits::default())?
            .run(OperationKind::Copy, vec![item])
            .await;
        let kind = report.results[0].error.as_ref().map(|error| error.kind);
        assert_eq!(kind, Some(ErrorKind::DestinationNotFound));
        Ok(())
    }

    #[tokio::test]
    async fn copies_directories_recursively() -> Result<()> {
        let temp = seeded()?;
        let nested = temp.path().join("src").join("tree").join("inner");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(nested.join("leaf.txt"), "leaf")?;

        let report = executor(BatchLimits::default())?
            .run(OperationKind::Copy, vec![copy_plan(&temp, "tree")])
            .await;
        assert!(report.overall_success, "{report:?}");
        let copied = temp.path().join("dst").join("tree").join("inner").join("leaf.txt");
        assert_eq!(std::fs::read_to_string(copied)?, "leaf");
        assert!(nested.join("leaf.txt").is_file());
        Ok(())
    }

    #[tokio::test]
    async fn copying_directory_into_itself_is_rejected() -> Result<()> {
        let temp = seeded()?;
        let tree = temp.path().join("src").join("tree");
        std::fs::create_dir(&tree)?;
        let item = PlannedItem::new(
            "tree".to_string(),
            Ok(ItemAction::Copy {
                from: tree.clone(),
                to: tree.join("tree"),
            }),
        );

        let report = executor(BatchLimits::default())?
            .run(OperationKind::Copy, vec![item])
            .await;
        let kind = report.results[0].error.as_ref().map(|error| error.kind);
        assert_eq!(kind, Some(ErrorKind::InvalidInput));
        Ok(())
    }

    #[tokio::test]
    async fn rename_of_missing_source_reports_not_found() -> Result<()> {
        let temp = seeded()?;
        let item = PlannedItem::new(
            "ghost".to_string(),
            Ok(ItemAction::Rename {
                from: temp.path().join("src").join("ghost"),
                to: temp.path().join("dst").join("ghost"),
            }),
        );

        let report = executor(BatchLimits::default())?
            .run(OperationKind::Move, vec![item])
            .await;
        let kind = report.results[0].error.as_ref().map(|error| error.kind);
        assert_eq!(kind, Some(ErrorKind::NotFound));
        Ok(())
    }

    #[tokio::test]
    async fn remove_without_recursion_keeps_non_empty_directory() -> Result<()> {
        let temp = seeded()?;
        let dir = temp.path().join("src").join("full");
        std::fs::create_dir(&dir)?;
        std::fs::write(dir.join("inside.txt"), "x")?;
        let plan = |recursive| {
            PlannedItem::new(
                "full".to_string(),
                Ok(ItemAction::Remove {
                    path: dir.clone(),
                    kind: EntryKind::Directory,
                    recursive,
                }),
            )
        };
        let executor = executor(BatchLimits::default())?;

        let gated = executor.run(OperationKind::Remove, vec![plan(false)]).await;
        let kind = gated.results[0].error.as_ref().map(|error| error.kind);
        assert_eq!(kind, Some(ErrorKind::RemoveFailed));
        assert!(dir.is_dir());

        let removed = executor.run(OperationKind::Remove, vec![plan(true)]).await;
        assert!(removed.overall_success);
        assert!(!dir.exists());
        Ok(())
    }

    #[tokio::test]
    async fn expired_deadline_reports_timeout_for_unsettled_items() -> Result<()> {
        let temp = seeded()?;
        std::fs::write(temp.path().join("src").join("quick"), "q")?;
        let limits = BatchLimits {
            max_in_flight: 4,
            deadline: Some(Duration::from_millis(200)),
        };
        let items = vec![
            copy_plan(&temp, "quick"),
            PlannedItem::new(
                "slow".to_string(),
                Ok(ItemAction::Stall {
                    path: temp.path().join("src").join("slow"),
                    duration: Duration::from_secs(30),
                }),
            ),
        ];

        let started = std::time::Instant::now();
        let report = executor(limits)?.run(OperationKind::Copy, items).await;
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(report.results.len(), 2);
        assert!(report.results[0].success);
        let slow = report
            .results
            .get(1)
            .ok_or_else(|| anyhow!("slow result missing"))?;
        assert!(!slow.success);
        assert_eq!(
            slow.error.as_ref().map(|error| error.kind),
            Some(ErrorKind::Timeout)
        );
        assert!(!report.overall_success);
        Ok(())
    }

    #[tokio::test]
    async fn timed_out_copy_leaves_no_target_behind() -> Result<()> {
        let temp = seeded()?;
        let payload = vec![7_u8; 64 * 1024 * 1024];
        std::fs::write(temp.path().join("src").join("big.bin"), &payload)?;
        let limits = BatchLimits {
            max_in_flight: 1,
            deadline: Some(Duration::from_millis(25)),
        };

        let report = executor(limits)?
            .run(OperationKind::Copy, vec![copy_plan(&temp, "big.bin")])
            .await;
        tokio::time::sleep(Duration::from_millis(500)).await;

        let result = report
            .results
            .first()
            .ok_or_else(|| anyhow!("copy result missing"))?;
        let target = temp.path().join("dst").join("big.bin");
        if result.success {
            assert_eq!(std::fs::metadata(&target)?.len(), u64::try_from(payload.len())?);
        } else {
            assert_eq!(
                result.error.as_ref().map(|error| error.kind),
                Some(ErrorKind::Timeout)
            );
            assert!(!target.exists());
        }
        Ok(())
    }

    #[tokio::test]
    async fn copied_directory_tree_matches_source() -> Result<()> {
        let temp = seeded()?;
        let nested = temp.path().join("src").join("tree").join("inner");
        std::fs::create_dir_all(&nested)?;
        std::fs::write(nested.join("leaf.txt"), "leaf")?;
        std::fs::write(temp.path().join("src").join("tree").join("top.txt"), "top")?;

        let report = executor(BatchLimits::default())?
            .run(OperationKind::Copy, vec![copy_plan(&temp, "tree")])
            .await;
        assert!(report.overall_success);
        let copied = temp.path().join("dst").join("tree");
        assert_eq!(std::fs::read_to_string(copied.join("top.txt"))?, "top");
        assert_eq!(
            std::fs::read_to_string(copied.join("inner").join("leaf.txt"))?,
            "leaf"
        );
        Ok(())
    }

    #[test]
    fn partial_copy_guard_removes_unfinished_target() -> Result<()> {
        let temp = seeded()?;
        let unfinished = temp.path().join("dst").join("half.bin");
        std::fs::write(&unfinished, "half")?;
        drop(PartialCopy::file(unfinished.clone()));
        assert!(!unfinished.exists());

        let finished = temp.path().join("dst").join("whole.bin");
        std::fs::write(&finished, "whole")?;
        PartialCopy::file(finished.clone()).complete();
        assert!(finished.exists());
        Ok(())
    }

    #[test]
    fn failures_outside_the_action_follow_the_operation() {
        assert_eq!(failure_kind(OperationKind::Copy), ErrorKind::CopyFailed);
        assert_eq!(failure_kind(OperationKind::Move), ErrorKind::RenameFailed);
        assert_eq!(failure_kind(OperationKind::SingleMove), ErrorKind::RenameFailed);
        assert_eq!(failure_kind(OperationKind::Remove), ErrorKind::RemoveFailed);
    }
}
