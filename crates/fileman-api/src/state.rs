//! Shared application state handed to every handler.

use fileman_fsops::FileManager;
use fileman_telemetry::Metrics;

/// Dependencies shared by the HTTP handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Sandboxed file manager.
    pub files: FileManager,
    /// Metrics registry rendered at `/metrics`.
    pub telemetry: Metrics,
}

impl ApiState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub const fn new(files: FileManager, telemetry: Metrics) -> Self {
        Self { files, telemetry }
    }
}
