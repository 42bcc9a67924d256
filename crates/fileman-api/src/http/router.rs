//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderName, Method, Request,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    routing::{get, post},
};
use fileman_fsops::FileManager;
use fileman_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::constants::{HEADER_REQUEST_ID, HEADER_REQUESTED_WITH, HEADER_UPLOAD_PATH};
use crate::http::filemanager::{
    copy_items, create_directory, download, list, move_item, move_items, remove_items,
    upload_items,
};
use crate::http::health::{health, metrics};
use crate::http::telemetry::HttpMetricsLayer;
use crate::state::ApiState;

/// Axum router wrapper that hosts the file manager HTTP API.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Construct a new API server backed by `files`.
    ///
    /// `upload_limit_bytes` caps the request body accepted by the upload route.
    #[must_use]
    pub fn new(files: FileManager, telemetry: Metrics, upload_limit_bytes: usize) -> Self {
        let state = Arc::new(ApiState::new(files, telemetry.clone()));
        let cors_layer = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::OPTIONS,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers([
                CONTENT_TYPE,
                HeaderName::from_static(HEADER_REQUESTED_WITH),
                HeaderName::from_static(HEADER_UPLOAD_PATH),
            ])
            .expose_headers([CONTENT_DISPOSITION]);
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                let method = request.method().clone();
                let uri_path = request.uri().path();
                let request_id = request
                    .headers()
                    .get(HEADER_REQUEST_ID)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("")
                    .to_string();

                tracing::info_span!(
                    "http.request",
                    method = %method,
                    route = %uri_path,
                    request_id = %request_id,
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    let status = response.status().as_u16();
                    span.record("status_code", status);
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(fileman_telemetry::propagate_request_id_layer())
            .layer(fileman_telemetry::set_request_id_layer())
            .layer(trace_layer)
            .layer(HttpMetricsLayer::new(telemetry));

        let router = Self::build_router(upload_limit_bytes)
            .layer(cors_layer)
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn build_router(upload_limit_bytes: usize) -> Router<Arc<ApiState>> {
        Router::new()
            .route("/health", get(health))
            .route("/metrics", get(metrics))
            .route("/filemanager/list", get(list))
            .route("/filemanager/dir/create", post(create_directory))
            .route("/filemanager/file/content", get(download))
            .route("/filemanager/items/copy", post(copy_items))
            .route("/filemanager/items/move", post(move_items))
            .route("/filemanager/item/move", post(move_item))
            .route(
                "/filemanager/items/upload",
                post(upload_items).layer(DefaultBodyLimit::max(upload_limit_bytes)),
            )
            .route("/filemanager/items/remove", post(remove_items))
    }

    /// Serve the API on `addr` until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        tracing::info!(%addr, "file manager api listening");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        tracing::info!("file manager api stopped");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::body::{Body, to_bytes};
    use axum::http::StatusCode;
    use fileman_fsops::{BatchLimits, PathResolver};
    use fileman_test_support::StorageFixture;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const BOUNDARY: &str = "fileman-test-boundary";

    fn server(storage: &StorageFixture, upload_limit_bytes: usize) -> Result<(ApiServer, Metrics)> {
        let telemetry = Metrics::new()?;
        let files = FileManager::new(
            PathResolver::new(storage.root())?,
            BatchLimits::default(),
            telemetry.clone(),
        );
        Ok((
            ApiServer::new(files, telemetry.clone(), upload_limit_bytes),
            telemetry,
        ))
    }

    async fn send(server: &ApiServer, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = server.router().clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    fn post_json(uri: &str, body: &Value) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(body)?))?)
    }

    fn multipart_body(parts: &[(&str, &str, &str)]) -> String {
        let mut body = String::new();
        for (field, file_name, contents) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{contents}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn upload_request(path: &str, body: String) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method(Method::POST)
            .uri("/filemanager/items/upload")
            .header(HEADER_UPLOAD_PATH, path)
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))?)
    }

    #[tokio::test]
    async fn health_reports_ok_inside_envelope() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder().uri("/health").body(Body::empty())?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"]["status"], json!("ok"));
        Ok(())
    }

    #[tokio::test]
    async fn list_defaults_to_root() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.write_file("readme.txt", "hi")?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder()
            .uri("/filemanager/list")
            .body(Body::empty())?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], json!("readme.txt"));
        assert_eq!(body["data"][0]["type"], json!("file"));
        assert_eq!(body["data"][0]["size"], json!(2));
        Ok(())
    }

    #[tokio::test]
    async fn escaping_list_path_is_rejected() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder()
            .uri("/filemanager/list?path=/../..")
            .body(Body::empty())?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["error"]["kind"], json!("PathEscape"));
        Ok(())
    }

    #[tokio::test]
    async fn create_directory_conflict_maps_to_409() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.create_dir("taken")?;
        let (server, _) = server(&storage, 1024)?;
        let request = post_json(
            "/filemanager/dir/create",
            &json!({"path": "/", "directory": "taken"}),
        )?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], json!("AlreadyExists"));
        Ok(())
    }

    #[tokio::test]
    async fn copy_batch_keeps_item_failures_inside_ok_envelope() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.write_file("a/f1.txt", "one")?;
        storage.create_dir("b")?;
        let (server, telemetry) = server(&storage, 1024)?;
        let request = post_json(
            "/filemanager/items/copy",
            &json!({"path": "/a", "filenames": ["f1.txt", "missing.txt"], "destination": "/b"}),
        )?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["data"][0]["itemName"], json!("f1.txt"));
        assert_eq!(body["data"][0]["success"], json!(true));
        assert_eq!(body["data"][1]["success"], json!(false));
        assert_eq!(body["data"][1]["error"]["kind"], json!("NotFound"));
        assert!(storage.exists("b/f1.txt"));

        let rendered = telemetry.render()?;
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("/filemanager/items/copy"));
        Ok(())
    }

    #[tokio::test]
    async fn remove_without_recursive_keeps_non_empty_directory() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.write_file("old/keep.txt", "x")?;
        let (server, _) = server(&storage, 1024)?;
        let request = post_json(
            "/filemanager/items/remove",
            &json!({"path": "/", "selectedFiles": [{"name": "old", "type": "dir"}]}),
        )?;

        let (status, body) = send(&server, request).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["success"], json!(false));
        assert!(storage.exists("old/keep.txt"));
        Ok(())
    }

    #[tokio::test]
    async fn upload_stores_every_file_part() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.create_dir("inbox")?;
        let (server, telemetry) = server(&storage, 1024)?;
        let body = multipart_body(&[
            ("file[]", "one.txt", "first"),
            ("file[]", "two.txt", "second"),
        ]);

        let (status, body) = send(&server, upload_request("/inbox", body)?).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!(true));
        assert_eq!(storage.read_to_string("inbox/one.txt")?, "first");
        assert_eq!(storage.read_to_string("inbox/two.txt")?, "second");
        assert_eq!(telemetry.snapshot().uploaded_bytes_total, 11);
        Ok(())
    }

    #[tokio::test]
    async fn upload_without_file_parts_is_rejected() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let body = multipart_body(&[("other", "note.txt", "ignored")]);

        let (status, body) = send(&server, upload_request("/", body)?).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errorMsg"], json!("Cannot find any file to upload"));
        assert!(!storage.exists("note.txt"));
        Ok(())
    }

    #[tokio::test]
    async fn upload_into_missing_directory_is_not_found() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let body = multipart_body(&[("file[]", "one.txt", "first")]);

        let (status, body) = send(&server, upload_request("/nowhere", body)?).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], json!("DestinationNotFound"));
        Ok(())
    }

    #[tokio::test]
    async fn download_streams_file_with_attachment_headers() -> Result<()> {
        let storage = StorageFixture::new()?;
        storage.write_file("docs/a.txt", "alpha")?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder()
            .uri("/filemanager/file/content?path=/docs/a.txt")
            .body(Body::empty())?;

        let response = server.router().clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
            Some("attachment; filename=\"a.txt\"")
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(&bytes[..], b"alpha");
        Ok(())
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_prometheus_text() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder().uri("/metrics").body(Body::empty())?;

        let response = server.router().clone().oneshot(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("text/plain; version=0.0.4")
        );
        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight_allows_path_header() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/filemanager/items/upload")
            .header("origin", "http://localhost:3000")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "path")
            .body(Body::empty())?;

        let response = server.router().clone().oneshot(request).await?;
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_requests_are_rejected_with_envelopes() -> Result<()> {
        let storage = StorageFixture::new()?;
        let (server, _) = server(&storage, 1024)?;
        let invalid_json = Request::builder()
            .method(Method::POST)
            .uri("/filemanager/items/copy")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))?;
        let missing_content_type = Request::builder()
            .method(Method::POST)
            .uri("/filemanager/items/remove")
            .body(Body::from(r#"{"path": "/", "selectedFiles": []}"#))?;
        let missing_query = Request::builder()
            .uri("/filemanager/file/content")
            .body(Body::empty())?;

        for request in [invalid_json, missing_content_type, missing_query] {
            let uri = request.uri().clone();
            let (status, body) = send(&server, request).await?;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["success"], json!(false), "{uri}");
            assert_eq!(body["data"], Value::Null, "{uri}");
            assert_eq!(body["error"]["kind"], json!("InvalidInput"), "{uri}");
        }
        Ok(())
    }
}
