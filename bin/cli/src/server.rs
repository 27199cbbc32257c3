//! Local generation API.
//!
//! Exposes shape generation to the browser front-end: `GET /health` and
//! `POST /generate3d`, which takes a multipart `image` field and answers with
//! the generated GLB.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use photomesh_inference::{ImageSource, InferenceBackend, ShapeGeneration, ShapeGenerationRequest};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Largest accepted upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Shared state of the server.
pub struct AppState {
    pub backend: Arc<dyn InferenceBackend>,
    pub generation: ShapeGeneration,
}

impl AppState {
    #[must_use]
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            generation: ShapeGeneration::new(),
        }
    }
}

/// Builds the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate3d", post(generate3d))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn generate3d(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let image = read_image(multipart).await?;
    info!(image = %image.describe(), "generate3d request");

    let request = ShapeGenerationRequest::from_image(image);
    let result = state
        .generation
        .run(state.backend.as_ref(), &request)
        .await
        .map_err(|report| ApiError::Generation(report.to_string()))?;
    let (file, bytes) = state
        .generation
        .fetch_model(state.backend.as_ref(), &result)
        .await
        .map_err(|report| ApiError::Generation(report.to_string()))?;

    let disposition = format!("attachment; filename=\"{}\"", download_name(file.file_name()));
    Ok((
        [
            (header::CONTENT_TYPE, "model/gltf-binary".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// Returns the first non-empty `image` field of the form.
async fn read_image(mut multipart: Multipart) -> Result<ImageSource, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image.png").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        if data.is_empty() {
            break;
        }
        return Ok(ImageSource::Bytes {
            file_name,
            data: data.to_vec(),
        });
    }
    Err(ApiError::MissingImage)
}

fn download_name(remote: &str) -> String {
    let stem = remote.rsplit_once('.').map_or(remote, |(stem, _)| stem);
    let safe: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if safe.is_empty() {
        "model.glb".to_string()
    } else {
        format!("{safe}.glb")
    }
}

/// Errors returned to API clients as `{"error": ...}`.
#[derive(Debug)]
pub enum ApiError {
    MissingImage,
    BadRequest(String),
    Generation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::MissingImage => (StatusCode::BAD_REQUEST, "No image provided".to_string()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Generation(msg) => {
                error!("generation failed: {msg}");
                (StatusCode::BAD_GATEWAY, msg)
            }
        };
        (status, Json(json!({"error": message}))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use photomesh_inference::{FileData, InferenceError};
    use rootcause::prelude::Report;
    use serde_json::Value as JsonValue;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "photomesh-test-boundary";

    #[derive(Default)]
    struct StubBackend {
        uploads: Mutex<Vec<(String, usize)>>,
        fail: bool,
    }

    #[async_trait]
    impl InferenceBackend for StubBackend {
        async fn upload(&self, image: &ImageSource) -> Result<FileData, Report<InferenceError>> {
            let ImageSource::Bytes { file_name, data } = image else {
                panic!("server uploads in-memory images");
            };
            self.uploads
                .lock()
                .unwrap()
                .push((file_name.clone(), data.len()));
            Ok(FileData::uploaded("/tmp/gradio/in.png", file_name.clone(), data.len() as u64))
        }

        async fn predict(
            &self,
            api_name: &str,
            _data: Vec<JsonValue>,
        ) -> Result<Vec<JsonValue>, Report<InferenceError>> {
            if self.fail {
                return Err(InferenceError::RemoteError {
                    api_name: api_name.to_string(),
                    message: Some("GPU quota exceeded".to_string()),
                }
                .into());
            }
            Ok(vec![json!({"path": "/tmp/gradio/white_mesh.glb"})])
        }

        async fn download(&self, _file: &FileData) -> Result<Vec<u8>, Report<InferenceError>> {
            Ok(b"glTF-binary".to_vec())
        }
    }

    fn app(backend: Arc<StubBackend>) -> Router {
        router(Arc::new(AppState::new(backend)))
    }

    fn multipart_request(field: &str, content: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"chair.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/generate3d")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(Arc::default())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn generate_returns_model_bytes() {
        let backend = Arc::new(StubBackend::default());
        let response = app(Arc::clone(&backend))
            .oneshot(multipart_request("image", b"\x89PNG data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "model/gltf-binary"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"white_mesh.glb\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"glTF-binary");
        assert_eq!(
            *backend.uploads.lock().unwrap(),
            vec![("chair.png".to_string(), 9)]
        );
    }

    #[tokio::test]
    async fn missing_image_is_bad_request() {
        let backend = Arc::new(StubBackend::default());
        let response = app(Arc::clone(&backend))
            .oneshot(multipart_request("photo", b"data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({"error": "No image provided"}));
        assert!(backend.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn inference_failure_is_bad_gateway() {
        let backend = Arc::new(StubBackend {
            fail: true,
            ..Default::default()
        });
        let response = app(backend)
            .oneshot(multipart_request("image", b"data"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(json_body(response).await["error"].is_string());
    }

    #[test]
    fn download_name_is_sanitized() {
        assert_eq!(download_name("white_mesh.glb"), "white_mesh.glb");
        assert_eq!(download_name("../\"evil\".glb"), "evil.glb");
        assert_eq!(download_name(""), "model.glb");
    }
}
