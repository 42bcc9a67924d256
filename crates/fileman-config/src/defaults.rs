//! Default values and environment variable names for server configuration.
//!
//! # Design
//! - Keep every default in one place so docs, loader and tests agree.

/// Storage root used when `FILEMAN_STORAGE_ROOT` is unset.
pub const DEFAULT_STORAGE_ROOT: &str = "./docdata";
/// Bind address used when `FILEMAN_BIND_ADDR` is unset.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
/// HTTP port used when `FILEMAN_HTTP_PORT` is unset.
pub const DEFAULT_HTTP_PORT: u16 = 8000;
/// Request body cap for uploads (100 MiB).
pub const DEFAULT_UPLOAD_LIMIT_BYTES: usize = 100 * 1024 * 1024;
/// Per-batch in-flight item cap.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 64;
/// Whole-batch deadline in seconds; `0` disables the deadline.
pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 300;

pub(crate) const ENV_STORAGE_ROOT: &str = "FILEMAN_STORAGE_ROOT";
pub(crate) const ENV_BIND_ADDR: &str = "FILEMAN_BIND_ADDR";
pub(crate) const ENV_HTTP_PORT: &str = "FILEMAN_HTTP_PORT";
pub(crate) const ENV_UPLOAD_LIMIT_BYTES: &str = "FILEMAN_UPLOAD_LIMIT_BYTES";
pub(crate) const ENV_BATCH_CONCURRENCY: &str = "FILEMAN_BATCH_CONCURRENCY";
pub(crate) const ENV_BATCH_TIMEOUT_SECS: &str = "FILEMAN_BATCH_TIMEOUT_SECS";
pub(crate) const ENV_LOG_FORMAT: &str = "FILEMAN_LOG_FORMAT";
pub(crate) const ENV_LOG_LEVEL: &str = "RUST_LOG";
