//! File manager endpoints under `/filemanager`.
//!
//! Request-level failures become non-2xx envelopes; per-item batch failures stay inside a
//! 200 response.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::{Multipart, State, multipart::Field},
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    },
    response::Response,
};
use fileman_fsops::{Entry, FsOpsError, OperationResult, UploadSink};
use tokio_util::io::ReaderStream;
use tracing::{error, info};

use crate::http::constants::{
    HEADER_UPLOAD_PATH, MSG_COPY_FAILED, MSG_CREATE_FAILED, MSG_DOWNLOAD_FAILED,
    MSG_LIST_FAILED, MSG_MOVE_FAILED, MSG_REMOVE_FAILED, MSG_RENAME_FAILED, MSG_UPLOAD_EMPTY,
    MSG_UPLOAD_FAILED, UPLOAD_FIELD,
};
use crate::http::errors::ApiError;
use crate::http::extract::{ApiJson, ApiQuery};
use crate::models::{
    ContentQuery, CreateDirectoryRequest, Envelope, ItemMoveRequest, ListQuery, RemoveRequest,
    TransferRequest,
};
use crate::state::ApiState;

const ROOT: &str = "/";

pub(crate) async fn list(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Envelope<Vec<Entry>>>, ApiError> {
    let path = query.path.as_deref().unwrap_or(ROOT);
    let entries = state
        .files
        .list(path)
        .await
        .map_err(|err| ApiError::fs(MSG_LIST_FAILED, &err))?;
    Ok(Json(Envelope::ok(entries)))
}

pub(crate) async fn create_directory(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<CreateDirectoryRequest>,
) -> Result<Json<Envelope<()>>, ApiError> {
    state
        .files
        .create_directory(&request.path, &request.directory)
        .await
        .map_err(|err| ApiError::fs(MSG_CREATE_FAILED, &err))?;
    Ok(Json(Envelope::ok(())))
}

pub(crate) async fn download(
    State(state): State<Arc<ApiState>>,
    ApiQuery(query): ApiQuery<ContentQuery>,
) -> Result<Response, ApiError> {
    let download = state
        .files
        .open_download(&query.path)
        .await
        .map_err(|err| ApiError::fs(MSG_DOWNLOAD_FAILED, &err))?;
    let disposition = content_disposition(&download.file_name)?;
    let body = Body::from_stream(ReaderStream::new(download.file));

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/octet-stream")
        .header(CONTENT_LENGTH, download.len)
        .header(CONTENT_DISPOSITION, disposition)
        .body(body)
        .map_err(|err| {
            error!(error = %err, "failed to build download response");
            ApiError::internal(MSG_DOWNLOAD_FAILED)
        })
}

fn content_disposition(file_name: &str) -> Result<HeaderValue, ApiError> {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\"")).map_err(|err| {
        error!(error = %err, file_name, "file name is not a valid header value");
        ApiError::internal(MSG_DOWNLOAD_FAILED)
    })
}

pub(crate) async fn copy_items(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<Json<Envelope<Vec<OperationResult>>>, ApiError> {
    let report = state
        .files
        .copy(request.into())
        .await
        .map_err(|err| ApiError::fs(MSG_COPY_FAILED, &err))?;
    Ok(Json(Envelope::ok(report.results)))
}

pub(crate) async fn move_items(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<TransferRequest>,
) -> Result<Json<Envelope<Vec<OperationResult>>>, ApiError> {
    let report = state
        .files
        .move_items(request.into())
        .await
        .map_err(|err| ApiError::fs(MSG_MOVE_FAILED, &err))?;
    Ok(Json(Envelope::ok(report.results)))
}

pub(crate) async fn move_item(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<ItemMoveRequest>,
) -> Result<Json<Envelope<OperationResult>>, ApiError> {
    let result = state
        .files
        .move_item(&request.path, &request.destination)
        .await
        .map_err(|err| ApiError::fs(MSG_RENAME_FAILED, &err))?;
    Ok(Json(Envelope::ok(result)))
}

pub(crate) async fn remove_items(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<RemoveRequest>,
) -> Result<Json<Envelope<Vec<OperationResult>>>, ApiError> {
    let report = state
        .files
        .remove(request.into())
        .await
        .map_err(|err| ApiError::fs(MSG_REMOVE_FAILED, &err))?;
    Ok(Json(Envelope::ok(report.results)))
}

/// Stream every `file[]` part into the directory named by the `path` header.
pub(crate) async fn upload_items(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Envelope<bool>>, ApiError> {
    let target = match headers.get(HEADER_UPLOAD_PATH) {
        Some(value) => value
            .to_str()
            .map_err(|_| ApiError::bad_request("path header must be valid UTF-8"))?,
        None => {
            let err = FsOpsError::InvalidInput {
                field: HEADER_UPLOAD_PATH,
                reason: "missing",
                value: None,
            };
            return Err(ApiError::fs(MSG_UPLOAD_FAILED, &err));
        }
    };
    let dir = state
        .files
        .upload_directory(target)
        .await
        .map_err(|err| ApiError::fs(MSG_UPLOAD_FAILED, &err))?;

    let mut stored = 0_usize;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::multipart(&err))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(ToString::to_string) else {
            continue;
        };
        let mut sink = state
            .files
            .begin_upload(&dir, &file_name)
            .await
            .map_err(|err| ApiError::fs(MSG_UPLOAD_FAILED, &err))?;
        let stored_at = sink.path().to_path_buf();
        if let Err(err) = receive(&mut field, &mut sink).await {
            sink.discard().await;
            return Err(err);
        }
        let written = sink
            .finish()
            .await
            .map_err(|err| ApiError::fs(MSG_UPLOAD_FAILED, &err))?;
        state.telemetry.add_uploaded_bytes(written);
        info!(path = %stored_at.display(), bytes = written, "upload stored");
        stored += 1;
    }

    if stored == 0 {
        let err = FsOpsError::InvalidInput {
            field: UPLOAD_FIELD,
            reason: "empty",
            value: None,
        };
        return Err(ApiError::fs(MSG_UPLOAD_EMPTY, &err));
    }
    Ok(Json(Envelope::ok(true)))
}

async fn receive(field: &mut Field<'_>, sink: &mut UploadSink) -> Result<(), ApiError> {
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::multipart(&err))?
    {
        sink.write_chunk(&chunk)
            .await
            .map_err(|err| ApiError::fs(MSG_UPLOAD_FAILED, &err))?;
    }
    Ok(())
}
