//! Typed server configuration and its environment loader.
//!
//! # Design
//! - Configuration is read once at startup and passed into constructors; nothing is global.
//! - Loading goes through a lookup function so tests never mutate the process environment.
//! - Unset variables fall back to [`crate::defaults`]; set-but-invalid values are errors.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use fileman_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};
use tracing::debug;

use crate::defaults::{
    DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_TIMEOUT_SECS, DEFAULT_BIND_ADDR, DEFAULT_HTTP_PORT,
    DEFAULT_STORAGE_ROOT, DEFAULT_UPLOAD_LIMIT_BYTES, ENV_BATCH_CONCURRENCY,
    ENV_BATCH_TIMEOUT_SECS, ENV_BIND_ADDR, ENV_HTTP_PORT, ENV_LOG_FORMAT, ENV_LOG_LEVEL,
    ENV_STORAGE_ROOT, ENV_UPLOAD_LIMIT_BYTES,
};
use crate::error::{ConfigError, ConfigResult};
use crate::validate::{parse_bind_addr, parse_port, parse_positive, parse_seconds};

/// Runtime settings for the file manager server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Directory all client paths are confined to.
    pub storage_root: PathBuf,
    /// IP address the HTTP listener binds to.
    pub bind_addr: IpAddr,
    /// TCP port the HTTP listener binds to.
    pub http_port: u16,
    /// Maximum request body size accepted by the upload route.
    pub upload_limit_bytes: usize,
    /// Maximum number of concurrently running items per batch.
    pub batch_concurrency: usize,
    /// Deadline for a whole batch; `None` waits indefinitely.
    pub batch_timeout: Option<Duration>,
    /// Log output format.
    pub log_format: LogFormat,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from(DEFAULT_STORAGE_ROOT),
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            http_port: DEFAULT_HTTP_PORT,
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT_BYTES,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            batch_timeout: timeout_from_secs(DEFAULT_BATCH_TIMEOUT_SECS),
            log_format: LogFormat::infer(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an invalid value or the storage root is
    /// not an existing directory.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error when a variable is set to an invalid value or the storage root is
    /// not an existing directory.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let storage_root = PathBuf::from(
            get(ENV_STORAGE_ROOT).unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string()),
        );
        let bind_addr = parse_bind_addr(
            &get(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            ENV_BIND_ADDR,
        )?;
        let http_port = get(ENV_HTTP_PORT)
            .map(|value| parse_port(&value, ENV_HTTP_PORT))
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_PORT);
        let upload_limit_bytes = get(ENV_UPLOAD_LIMIT_BYTES)
            .map(|value| parse_positive(&value, ENV_UPLOAD_LIMIT_BYTES))
            .transpose()?
            .unwrap_or(DEFAULT_UPLOAD_LIMIT_BYTES);
        let batch_concurrency = get(ENV_BATCH_CONCURRENCY)
            .map(|value| parse_positive(&value, ENV_BATCH_CONCURRENCY))
            .transpose()?
            .unwrap_or(DEFAULT_BATCH_CONCURRENCY);
        let batch_timeout_secs = get(ENV_BATCH_TIMEOUT_SECS)
            .map(|value| parse_seconds(&value, ENV_BATCH_TIMEOUT_SECS))
            .transpose()?
            .unwrap_or(DEFAULT_BATCH_TIMEOUT_SECS);
        let log_format = match get(ENV_LOG_FORMAT) {
            Some(value) => LogFormat::parse(&value).ok_or(ConfigError::InvalidField {
                field: ENV_LOG_FORMAT,
                reason: "unknown_log_format",
                value: Some(value),
            })?,
            None => LogFormat::infer(),
        };
        let log_level = get(ENV_LOG_LEVEL).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let config = Self {
            storage_root,
            bind_addr,
            http_port,
            upload_limit_bytes,
            batch_concurrency,
            batch_timeout: timeout_from_secs(batch_timeout_secs),
            log_format,
            log_level,
        };
        config.validate()?;
        debug!(
            storage_root = %config.storage_root.display(),
            listen = %config.socket_addr(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Check invariants that parsing alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage root is missing or not a directory.
    pub fn validate(&self) -> ConfigResult<()> {
        let metadata =
            std::fs::metadata(&self.storage_root).map_err(|source| ConfigError::StorageRoot {
                path: self.storage_root.clone(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(ConfigError::InvalidField {
                field: ENV_STORAGE_ROOT,
                reason: "not_a_directory",
                value: Some(self.storage_root.display().to_string()),
            });
        }
        Ok(())
    }

    /// Address the HTTP listener binds to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.http_port)
    }
}

fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}
