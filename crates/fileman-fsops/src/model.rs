//! Domain models exchanged between the file manager core and its callers.
//!
//! # Design
//! - Keep request/response types request-scoped value objects; nothing here holds IO handles.
//! - Serialize with the camelCase field names the browser client expects.

use std::fs::Metadata;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, FsOpsError};

/// Kind of a listed or operated-on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EntryKind {
    /// Regular file (also the fallback when metadata is unavailable).
    #[default]
    #[serde(rename = "file")]
    File,
    /// Directory.
    #[serde(rename = "dir")]
    Directory,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// File name of the child.
    pub name: String,
    /// Entry kind.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Size reported by the filesystem.
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Creation time when the platform reports one.
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last modification time.
    #[serde(rename = "updatedAt", with = "chrono::serde::ts_milliseconds_option")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Entry {
    pub(crate) fn from_metadata(name: String, metadata: &Metadata) -> Self {
        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };
        Self {
            name,
            kind,
            size_bytes: metadata.len(),
            created_at: metadata.created().ok().map(DateTime::<Utc>::from),
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
        }
    }

    /// Fallback shape used when a child cannot be stat'ed.
    pub(crate) const fn unreadable(name: String) -> Self {
        Self {
            name,
            kind: EntryKind::File,
            size_bytes: 0,
            created_at: None,
            modified_at: None,
        }
    }
}

/// One unit of work inside a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationItem {
    /// Name of the entry relative to the batch source directory.
    pub name: String,
    /// Entry kind; only consulted by removal.
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
}

impl OperationItem {
    /// Item that is treated as a regular file.
    #[must_use]
    pub fn file(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    /// Item that is treated as a directory.
    #[must_use]
    pub fn directory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// Inputs for a copy, move or remove batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationRequest {
    /// Logical directory holding the items.
    pub source_path: String,
    /// Logical directory receiving the items (copy and move only).
    pub destination_path: Option<String>,
    /// Items to operate on, in client order.
    pub items: Vec<OperationItem>,
    /// Whether directory removal may recurse into non-empty directories.
    pub recursive: Option<bool>,
}

/// Operation kinds the batch executor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Copy items into the destination, keeping the source.
    Copy,
    /// Rename items into the destination directory.
    Move,
    /// Delete items.
    Remove,
    /// Rename one entry from one full path to another.
    SingleMove,
}

impl OperationKind {
    /// Stable identifier used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Remove => "remove",
            Self::SingleMove => "single_move",
        }
    }
}

/// Wire form of a failure: machine-readable kind plus a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Failure classification.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
    /// Underlying platform error, for diagnostics only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl From<&FsOpsError> for ErrorDetail {
    fn from(error: &FsOpsError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            cause: std::error::Error::source(error).map(ToString::to_string),
        }
    }
}

/// Outcome of a single item within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    /// Item name as supplied by the client.
    pub item_name: String,
    /// Whether the item's filesystem action succeeded.
    pub success: bool,
    /// Resolved source path; absent when the item name itself was rejected.
    pub source_abs_path: Option<PathBuf>,
    /// Resolved destination path for transfers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dest_abs_path: Option<PathBuf>,
    /// Failure detail when `success` is false.
    pub error: Option<ErrorDetail>,
}

/// Aggregate output of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// One result per requested item, in request order.
    pub results: Vec<OperationResult>,
    /// True when every item succeeded (vacuously true for empty batches).
    pub overall_success: bool,
}

impl BatchReport {
    pub(crate) fn from_results(results: Vec<OperationResult>) -> Self {
        let overall_success = results.iter().all(|result| result.success);
        Self {
            results,
            overall_success,
        }
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|result| !result.success).count()
    }
}

/// Lifecycle of one batch item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Spawned, waiting for a concurrency permit.
    Pending,
    /// Filesystem action in flight.
    Running,
    /// Action completed successfully.
    Succeeded,
    /// Action failed, timed out or was rejected up front.
    Failed,
}

impl ItemState {
    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Lifecycle of a whole batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// Items are still settling.
    Collecting,
    /// Every item reached a terminal state.
    AllSettled,
}

impl BatchState {
    /// Stable identifier used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Collecting => "collecting",
            Self::AllSettled => "all_settled",
        }
    }
}
