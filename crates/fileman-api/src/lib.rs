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

//! HTTP API for the sandboxed file manager.
//!
//! Layout: `http/` (router, handlers, middleware), `models.rs` (request/response DTOs),
//! `state.rs` (shared handler state), `error.rs` (server errors).

pub mod error;
pub(crate) mod http;
pub mod models;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use models::Envelope;
pub use state::ApiState;
