//! Envelope-shaped API error wrapper.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use fileman_fsops::{ErrorDetail, ErrorKind, FsOpsError};
use tracing::warn;

use crate::models::Envelope;

/// Request-level failure rendered as `{data: null, success: false, errorMsg, error}`.
#[derive(Debug)]
pub(crate) struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<ErrorDetail>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Malformed or oversized multipart bodies keep the status axum assigns them.
    pub(crate) fn multipart(error: &MultipartError) -> Self {
        let status = error.status();
        warn!(status = status.as_u16(), error = %error, "multipart body rejected");
        Self::new(status, error.body_text())
    }

    /// Wrap a file manager failure, choosing the status from its kind.
    pub(crate) fn fs(message: impl Into<String>, error: &FsOpsError) -> Self {
        let detail = ErrorDetail::from(error);
        let status = status_for(detail.kind);
        let message = message.into();
        warn!(
            status = status.as_u16(),
            kind = detail.kind.as_str(),
            error = ?error,
            "{message}"
        );
        Self {
            status,
            message,
            detail: Some(detail),
        }
    }

    #[cfg(test)]
    pub(crate) const fn status(&self) -> StatusCode {
        self.status
    }
}

const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::PathEscape | ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound | ErrorKind::DestinationNotFound => StatusCode::NOT_FOUND,
        ErrorKind::AlreadyExists => StatusCode::CONFLICT,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::NotReadable
        | ErrorKind::CreateFailed
        | ErrorKind::CopyFailed
        | ErrorKind::RenameFailed
        | ErrorKind::RemoveFailed
        | ErrorKind::WriteFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl Display for ApiError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body: Envelope<()> = Envelope::failure(self.message, self.detail);
        (self.status, Json(body)).into_response()
    }
}
