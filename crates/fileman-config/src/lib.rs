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

//! Environment-driven configuration for the file manager server.
//!
//! Layout: `defaults.rs` (defaults and variable names), `model.rs` (`ServerConfig` and its
//! loader), `validate.rs` (parsing helpers), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::ServerConfig;
