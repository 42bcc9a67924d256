//! # Design
//!
//! - Provide structured, constant-message errors for every file manager operation.
//! - Capture operation context (paths, fields, inputs) to make failures reproducible in tests.
//! - Preserve source errors without interpolating context into error messages.
//! - Map every variant onto a machine-readable [`ErrorKind`] for the wire format.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for file manager operations.
pub type FsOpsResult<T> = Result<T, FsOpsError>;

/// Machine-readable failure classification surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A logical path or item name would leave the storage root.
    PathEscape,
    /// The source entry does not exist.
    NotFound,
    /// A directory could not be opened or enumerated.
    NotReadable,
    /// The target entry already exists.
    AlreadyExists,
    /// Directory creation failed for a reason other than a pre-existing target.
    CreateFailed,
    /// Copying an entry failed.
    CopyFailed,
    /// Renaming or moving an entry failed.
    RenameFailed,
    /// Removing an entry failed.
    RemoveFailed,
    /// The destination directory of a transfer does not exist.
    DestinationNotFound,
    /// The batch deadline expired before the item settled.
    Timeout,
    /// The request itself was malformed.
    InvalidInput,
    /// Persisting uploaded bytes failed.
    WriteFailed,
}

impl ErrorKind {
    /// Stable identifier used in logs and metrics labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PathEscape => "PathEscape",
            Self::NotFound => "NotFound",
            Self::NotReadable => "NotReadable",
            Self::AlreadyExists => "AlreadyExists",
            Self::CreateFailed => "CreateFailed",
            Self::CopyFailed => "CopyFailed",
            Self::RenameFailed => "RenameFailed",
            Self::RemoveFailed => "RemoveFailed",
            Self::DestinationNotFound => "DestinationNotFound",
            Self::Timeout => "Timeout",
            Self::InvalidInput => "InvalidInput",
            Self::WriteFailed => "WriteFailed",
        }
    }
}

/// Errors produced by the file manager core.
#[derive(Debug, Error)]
pub enum FsOpsError {
    /// A logical path resolved outside the storage root.
    #[error("path escapes the storage root")]
    PathEscape {
        /// Offending client-supplied value.
        value: String,
    },
    /// Input validation failures.
    #[error("invalid input")]
    InvalidInput {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// The requested entry does not exist.
    #[error("file or directory not found")]
    NotFound {
        /// Absolute path that was looked up.
        path: PathBuf,
        /// Underlying IO error when one was observed.
        #[source]
        source: Option<io::Error>,
    },
    /// A directory could not be opened or enumerated.
    #[error("cannot read folder")]
    NotReadable {
        /// Directory that failed to open.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The target already exists.
    #[error("the folder already exists")]
    AlreadyExists {
        /// Target path that already exists.
        path: PathBuf,
    },
    /// Directory creation failed.
    #[error("unknown error creating folder")]
    CreateFailed {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Copying an entry failed.
    #[error("an error occurred copying the item")]
    CopyFailed {
        /// Source entry.
        from: PathBuf,
        /// Destination entry.
        to: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Renaming an entry failed.
    #[error("an error occurred moving the item")]
    RenameFailed {
        /// Source entry.
        from: PathBuf,
        /// Destination entry.
        to: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Removing an entry failed.
    #[error("an error occurred deleting the item")]
    RemoveFailed {
        /// Entry that could not be removed.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The destination directory of a transfer is missing.
    #[error("destination directory not found")]
    DestinationNotFound {
        /// Destination directory that was expected to exist.
        path: PathBuf,
    },
    /// The batch deadline elapsed before the item settled.
    ///
    /// An unfinished copy is cancelled and leaves no target behind. A rename or removal
    /// already running in the OS may still complete after this is reported.
    #[error("operation timed out")]
    Timeout {
        /// Operation that was running.
        operation: &'static str,
        /// Deadline that elapsed.
        after: Duration,
    },
    /// Writing uploaded content failed.
    #[error("an error occurred uploading files")]
    WriteFailed {
        /// File being written.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// IO failures outside of the operation-specific variants.
    #[error("fsops io failure")]
    Io {
        /// Classification chosen by the call site.
        kind: ErrorKind,
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl FsOpsError {
    pub(crate) fn io(
        kind: ErrorKind,
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            kind,
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn escape(value: impl Into<String>) -> Self {
        Self::PathEscape {
            value: value.into(),
        }
    }

    pub(crate) fn not_found(path: impl Into<PathBuf>, source: Option<io::Error>) -> Self {
        Self::NotFound {
            path: path.into(),
            source,
        }
    }

    /// Classification of this error for clients and metrics.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PathEscape { .. } => ErrorKind::PathEscape,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotReadable { .. } => ErrorKind::NotReadable,
            Self::Io { kind, .. } => *kind,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::CreateFailed { .. } => ErrorKind::CreateFailed,
            Self::CopyFailed { .. } => ErrorKind::CopyFailed,
            Self::RenameFailed { .. } => ErrorKind::RenameFailed,
            Self::RemoveFailed { .. } => ErrorKind::RemoveFailed,
            Self::DestinationNotFound { .. } => ErrorKind::DestinationNotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::WriteFailed { .. } => ErrorKind::WriteFailed,
        }
    }
}
