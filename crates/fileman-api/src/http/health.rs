//! Health and diagnostics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use fileman_telemetry::build_sha;
use tracing::error;

use crate::http::errors::ApiError;
use crate::models::{Envelope, HealthResponse};
use crate::state::ApiState;

pub(crate) async fn health() -> Json<Envelope<HealthResponse>> {
    Json(Envelope::ok(HealthResponse {
        status: "ok".to_string(),
        build: build_sha().to_string(),
    }))
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
