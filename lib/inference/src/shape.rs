//! Shape generation.
//!
//! Uploads the request's images, invokes `/shape_generation` exactly once and
//! returns the raw outputs. The call is complete when the result stream
//! delivers its `complete` event; there is no task handle to poll afterwards.

use crate::backend::InferenceBackend;
use crate::error::InferenceError;
use crate::gradio::FileData;
use crate::request::{ImageSlot, SHAPE_GENERATION_API, ShapeArguments, ShapeGenerationRequest};
use chrono::{DateTime, Utc};
use photomesh_core::InvocationId;
use rootcause::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{info, instrument};

/// The result of a shape generation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeGenerationResult {
    /// Unique identifier for this invocation.
    pub id: InvocationId,
    /// The operation that was invoked.
    pub api_name: String,
    /// Output values, exactly as the operation returned them.
    pub outputs: Vec<JsonValue>,
    /// When the call was made.
    pub timestamp: DateTime<Utc>,
    /// Latency in milliseconds, uploads included.
    pub latency_ms: u64,
}

impl ShapeGenerationResult {
    /// Returns the first output that is a file payload (the generated mesh).
    #[must_use]
    pub fn model_file(&self) -> Option<FileData> {
        self.outputs.iter().find_map(FileData::from_output)
    }
}

/// A shape generation executor.
#[derive(Debug, Clone)]
pub struct ShapeGeneration {
    api_name: String,
}

impl Default for ShapeGeneration {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeGeneration {
    /// Creates an executor for `/shape_generation`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_name: SHAPE_GENERATION_API.to_string(),
        }
    }

    /// Overrides the operation name.
    #[must_use]
    pub fn with_api_name(mut self, api_name: impl Into<String>) -> Self {
        self.api_name = api_name.into();
        self
    }

    /// Uploads every image present in the request and builds the arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if any upload fails.
    pub async fn prepare<B: InferenceBackend + ?Sized>(
        &self,
        backend: &B,
        request: &ShapeGenerationRequest,
    ) -> Result<ShapeArguments, Report<InferenceError>> {
        let mut uploaded = HashMap::new();
        for slot in ImageSlot::ALL {
            if let Some(image) = request.image(slot) {
                uploaded.insert(slot, backend.upload(image).await?);
            }
        }
        Ok(ShapeArguments::from_request(request, uploaded))
    }

    /// Runs the request once against the backend.
    ///
    /// # Errors
    ///
    /// Returns an error if an upload or the remote call fails.
    #[instrument(skip_all, fields(api = %self.api_name))]
    pub async fn run<B: InferenceBackend + ?Sized>(
        &self,
        backend: &B,
        request: &ShapeGenerationRequest,
    ) -> Result<ShapeGenerationResult, Report<InferenceError>> {
        let id = InvocationId::new();
        let started = Instant::now();

        let outputs = self
            .invoke(backend, request)
            .await
            .context(InferenceError::Invocation { invocation_id: id })?;

        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(invocation_id = %id, outputs = outputs.len(), latency_ms, "shape generation finished");

        Ok(ShapeGenerationResult {
            id,
            api_name: self.api_name.clone(),
            outputs,
            timestamp: Utc::now(),
            latency_ms,
        })
    }

    async fn invoke<B: InferenceBackend + ?Sized>(
        &self,
        backend: &B,
        request: &ShapeGenerationRequest,
    ) -> Result<Vec<JsonValue>, Report<InferenceError>> {
        let arguments = self.prepare(backend, request).await?;
        let data = arguments
            .to_positional()
            .map_err(|e| InferenceError::InvalidConfig {
                reason: format!("failed to encode arguments: {e}"),
            })?;
        backend.predict(&self.api_name, data).await
    }

    /// Downloads the model file of a result.
    ///
    /// # Errors
    ///
    /// Returns `NoModelOutput` if the result holds no file, or the backend's
    /// error if the download fails.
    pub async fn fetch_model<B: InferenceBackend + ?Sized>(
        &self,
        backend: &B,
        result: &ShapeGenerationResult,
    ) -> Result<(FileData, Vec<u8>), Report<InferenceError>> {
        let file = result.model_file().ok_or(InferenceError::NoModelOutput)?;
        let bytes = backend.download(&file).await?;
        Ok((file, bytes))
    }

    /// Downloads the model file of a result and writes it to `path`.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or the write fails.
    pub async fn save_model<B: InferenceBackend + ?Sized>(
        &self,
        backend: &B,
        result: &ShapeGenerationResult,
        path: &Path,
    ) -> Result<u64, Report<InferenceError>> {
        let (_, bytes) = self.fetch_model(backend, result).await?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|e| InferenceError::WriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        info!(path = %path.display(), bytes = bytes.len(), "model saved");
        Ok(bytes.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ImageSource;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Backend double that records calls and replays canned outputs.
    #[derive(Default)]
    struct RecordingBackend {
        uploads: Arc<Mutex<Vec<String>>>,
        predictions: Arc<Mutex<Vec<(String, Vec<JsonValue>)>>>,
        outputs: Vec<JsonValue>,
        fail_predict: bool,
    }

    #[async_trait]
    impl InferenceBackend for RecordingBackend {
        async fn upload(&self, image: &ImageSource) -> Result<FileData, Report<InferenceError>> {
            let name = image.file_name();
            self.uploads.lock().unwrap().push(name.clone());
            Ok(FileData::uploaded(format!("/tmp/gradio/{name}"), name, 3))
        }

        async fn predict(
            &self,
            api_name: &str,
            data: Vec<JsonValue>,
        ) -> Result<Vec<JsonValue>, Report<InferenceError>> {
            self.predictions
                .lock()
                .unwrap()
                .push((api_name.to_string(), data));
            if self.fail_predict {
                return Err(InferenceError::RemoteError {
                    api_name: api_name.to_string(),
                    message: Some("boom".to_string()),
                }
                .into());
            }
            Ok(self.outputs.clone())
        }

        async fn download(&self, file: &FileData) -> Result<Vec<u8>, Report<InferenceError>> {
            Ok(format!("glTF:{}", file.path).into_bytes())
        }
    }

    fn image(name: &str) -> ImageSource {
        ImageSource::Bytes {
            file_name: name.to_string(),
            data: vec![0, 1, 2],
        }
    }

    #[tokio::test]
    async fn run_uploads_present_images_and_invokes_once() {
        let backend = RecordingBackend {
            outputs: vec![json!({"path": "/tmp/gradio/white_mesh.glb"}), json!("<html>"), json!(42)],
            ..Default::default()
        };
        let request = ShapeGenerationRequest::from_image(image("front.png"))
            .with_image(ImageSlot::Left, image("left.png"));

        let result = ShapeGeneration::new()
            .run(&backend, &request)
            .await
            .expect("run succeeds");

        assert_eq!(*backend.uploads.lock().unwrap(), vec!["front.png", "left.png"]);
        let predictions = backend.predictions.lock().unwrap();
        assert_eq!(predictions.len(), 1);
        let (api_name, data) = &predictions[0];
        assert_eq!(api_name, "/shape_generation");
        assert_eq!(data[1]["path"], "/tmp/gradio/front.png");
        assert_eq!(data[2], JsonValue::Null);
        assert_eq!(data[4]["path"], "/tmp/gradio/left.png");

        assert_eq!(result.outputs.len(), 3);
        assert_eq!(
            result.model_file().expect("model file").path,
            "/tmp/gradio/white_mesh.glb"
        );
    }

    #[tokio::test]
    async fn remote_failure_propagates() {
        let backend = RecordingBackend {
            fail_predict: true,
            ..Default::default()
        };
        let request = ShapeGenerationRequest::from_image(image("a.png"));

        let err = ShapeGeneration::new()
            .run(&backend, &request)
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            InferenceError::Invocation { .. }
        ));
    }

    #[tokio::test]
    async fn save_model_writes_downloaded_bytes() {
        let backend = RecordingBackend::default();
        let result = ShapeGenerationResult {
            id: InvocationId::new(),
            api_name: SHAPE_GENERATION_API.to_string(),
            outputs: vec![json!({"path": "/tmp/gradio/mesh.glb"})],
            timestamp: Utc::now(),
            latency_ms: 5,
        };
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.glb");

        let written = ShapeGeneration::new()
            .save_model(&backend, &result, &path)
            .await
            .expect("saved");

        let content = std::fs::read(&path).expect("read back");
        assert_eq!(content, b"glTF:/tmp/gradio/mesh.glb");
        assert_eq!(written, content.len() as u64);
    }

    #[tokio::test]
    async fn fetch_model_without_file_output_fails() {
        let backend = RecordingBackend::default();
        let result = ShapeGenerationResult {
            id: InvocationId::new(),
            api_name: SHAPE_GENERATION_API.to_string(),
            outputs: vec![json!("no mesh")],
            timestamp: Utc::now(),
            latency_ms: 1,
        };

        let err = ShapeGeneration::new()
            .fetch_model(&backend, &result)
            .await
            .unwrap_err();
        assert_eq!(err.current_context(), &InferenceError::NoModelOutput);
    }
}
