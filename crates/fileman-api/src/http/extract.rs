//! Request extractors whose rejections render as failure envelopes.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query};
use fileman_fsops::FsOpsError;

use crate::http::constants::MSG_INVALID_REQUEST;
use crate::http::errors::ApiError;

/// JSON body extractor that rejects with an `InvalidInput` envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct ApiJson<T>(pub(crate) T);

/// Query string extractor that rejects with an `InvalidInput` envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(Query), rejection(ApiError))]
pub(crate) struct ApiQuery<T>(pub(crate) T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::fs(
            MSG_INVALID_REQUEST,
            &FsOpsError::InvalidInput {
                field: "body",
                reason: "malformed_json",
                value: Some(rejection.body_text()),
            },
        )
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::fs(
            MSG_INVALID_REQUEST,
            &FsOpsError::InvalidInput {
                field: "query",
                reason: "malformed_query",
                value: Some(rejection.body_text()),
            },
        )
    }
}
