//! Sandboxed file manager core: path containment, listing, directory creation,
//! batch copy/move/remove and upload/download plumbing.
#![forbid(unsafe_code)]
#![deny(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions, clippy::multiple_crate_versions)]

pub mod batch;
pub mod create;
pub mod error;
pub mod listing;
pub mod model;
pub mod resolver;
pub mod service;
pub mod transfer;

pub use batch::{BatchLimits, DEFAULT_BATCH_DEADLINE, DEFAULT_MAX_IN_FLIGHT};
pub use error::{ErrorKind, FsOpsError, FsOpsResult};
pub use model::{
    BatchReport, BatchState, Entry, EntryKind, ErrorDetail, ItemState, OperationItem,
    OperationKind, OperationRequest, OperationResult,
};
pub use resolver::PathResolver;
pub use service::FileManager;
pub use transfer::{Download, UploadSink};
