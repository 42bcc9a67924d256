//! HTTP surface modules (router, handlers, middleware).

/// Shared constants and header names.
pub(crate) mod constants;
/// Extractors that reject with envelopes.
pub(crate) mod extract;
/// Envelope-shaped error responses.
pub(crate) mod errors;
/// File manager handlers.
pub(crate) mod filemanager;
/// Health and diagnostics endpoints.
pub(crate) mod health;
/// Router construction and server host.
pub(crate) mod router;
/// Metrics middleware for HTTP requests.
pub(crate) mod telemetry;
