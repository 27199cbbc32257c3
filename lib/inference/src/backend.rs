//! Inference backend abstraction.
//!
//! `InferenceBackend` is the seam between shape generation and the hosted
//! space; `GradioBackend` talks to a real Gradio server over HTTP.

use crate::error::InferenceError;
use crate::gradio::{
    self, CallRequest, CallStarted, FileData, SpaceConfig, SpaceHost, endpoint_name,
};
use crate::request::ImageSource;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use rootcause::prelude::Report;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Trait for hosted inference backends.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Uploads an input image and returns the payload referencing it.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be read or the upload fails.
    async fn upload(&self, image: &ImageSource) -> Result<FileData, Report<InferenceError>>;

    /// Invokes a named operation once and returns its output values.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the operation reports an error.
    async fn predict(
        &self,
        api_name: &str,
        data: Vec<JsonValue>,
    ) -> Result<Vec<JsonValue>, Report<InferenceError>>;

    /// Fetches the bytes of a file produced by an operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be fetched.
    async fn download(&self, file: &FileData) -> Result<Vec<u8>, Report<InferenceError>>;
}

/// Configuration for a Gradio backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct GradioConfig {
    /// Space identifier (`owner/name`) or a full base URL.
    #[serde(default = "default_space")]
    pub space: String,
    /// Hub used to resolve space identifiers.
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    /// Access token for private or gated spaces.
    #[serde(default)]
    pub hf_token: Option<String>,
    /// Per-request timeout, covering the whole result stream.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_space() -> String {
    "tencent/Hunyuan3D-2".to_string()
}

fn default_hub_url() -> String {
    "https://huggingface.co".to_string()
}

fn default_request_timeout_secs() -> u64 {
    600
}

impl Default for GradioConfig {
    fn default() -> Self {
        Self::new(default_space())
    }
}

impl std::fmt::Debug for GradioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradioConfig")
            .field("space", &self.space)
            .field("hub_url", &self.hub_url)
            .field("hf_token", &self.hf_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl GradioConfig {
    /// Creates a configuration for a space with default settings.
    #[must_use]
    pub fn new(space: impl Into<String>) -> Self {
        Self {
            space: space.into(),
            hub_url: default_hub_url(),
            hf_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    /// Sets the access token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.hf_token = Some(token.into());
        self
    }

    /// Returns true if `space` is already a URL rather than an identifier.
    #[must_use]
    pub fn is_direct_url(&self) -> bool {
        self.space.starts_with("http://") || self.space.starts_with("https://")
    }
}

/// A Gradio server reached over HTTP.
#[derive(Debug, Clone)]
pub struct GradioBackend {
    http: reqwest::Client,
    config: GradioConfig,
    /// Host plus the server's api prefix, without a trailing slash.
    root: String,
}

impl GradioBackend {
    /// Resolves the space and reads its configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the space cannot be resolved or its `/config`
    /// cannot be read.
    #[instrument(skip_all, fields(space = %config.space))]
    pub async fn connect(config: GradioConfig) -> Result<Self, Report<InferenceError>> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| InferenceError::InvalidConfig {
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        let host = if config.is_direct_url() {
            config.space.trim_end_matches('/').to_string()
        } else {
            let url = format!(
                "{}/api/spaces/{}/host",
                config.hub_url.trim_end_matches('/'),
                config.space
            );
            let resolved: SpaceHost = get_json(&http, &url, config.hf_token.as_deref())
                .await
                .map_err(|e| InferenceError::SpaceResolutionFailed {
                    space: config.space.clone(),
                    reason: e.to_string(),
                })?;
            resolved.host.trim_end_matches('/').to_string()
        };

        let space_config: SpaceConfig =
            get_json(&http, &format!("{host}/config"), config.hf_token.as_deref()).await?;
        let prefix = space_config.api_prefix.unwrap_or_default();
        let root = format!("{host}{}", prefix.trim_end_matches('/'));

        info!(%root, "connected to space");
        Ok(Self { http, config, root })
    }

    /// Returns the base URL every endpoint is resolved against.
    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        authorize(request, self.config.hf_token.as_deref())
    }

    async fn read_image(&self, image: &ImageSource) -> Result<Vec<u8>, Report<InferenceError>> {
        let read_failed = |reason: String| InferenceError::ImageReadFailed {
            image: image.describe(),
            reason,
        };

        match image {
            ImageSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| read_failed(e.to_string()).into()),
            ImageSource::Url(url) => {
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| read_failed(e.to_string()))?;
                let response = ensure_success(url, response).await?;
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| read_failed(e.to_string()))?;
                Ok(bytes.to_vec())
            }
            ImageSource::Bytes { data, .. } => Ok(data.clone()),
        }
    }
}

#[async_trait]
impl InferenceBackend for GradioBackend {
    #[instrument(skip_all, fields(image = %image.describe()))]
    async fn upload(&self, image: &ImageSource) -> Result<FileData, Report<InferenceError>> {
        let data = self.read_image(image).await?;
        let file_name = image.file_name();
        let size = data.len() as u64;

        let url = format!("{}/upload", self.root);
        let form = Form::new().part("files", Part::bytes(data).file_name(file_name.clone()));
        let response = self
            .authorized(self.http.post(&url).multipart(form))
            .send()
            .await
            .map_err(|e| request_failed(&url, &e))?;
        let paths: Vec<String> = parse_json(&url, ensure_success(&url, response).await?).await?;

        let path = paths
            .into_iter()
            .next()
            .ok_or_else(|| InferenceError::ResponseParseFailed {
                endpoint: url.clone(),
                reason: "upload returned no paths".to_string(),
            })?;

        debug!(%path, size, "image uploaded");
        Ok(FileData::uploaded(path, file_name, size))
    }

    #[instrument(skip(self, data), fields(args = data.len()))]
    async fn predict(
        &self,
        api_name: &str,
        data: Vec<JsonValue>,
    ) -> Result<Vec<JsonValue>, Report<InferenceError>> {
        let call_url = format!("{}/call/{}", self.root, endpoint_name(api_name));
        let response = self
            .authorized(self.http.post(&call_url).json(&CallRequest { data }))
            .send()
            .await
            .map_err(|e| request_failed(&call_url, &e))?;
        let started: CallStarted =
            parse_json(&call_url, ensure_success(&call_url, response).await?).await?;
        debug!(event_id = %started.event_id, "call queued");

        let stream_url = format!("{call_url}/{}", started.event_id);
        let response = self
            .authorized(self.http.get(&stream_url))
            .send()
            .await
            .map_err(|e| request_failed(&stream_url, &e))?;
        let body = ensure_success(&stream_url, response)
            .await?
            .text()
            .await
            .map_err(|e| request_failed(&stream_url, &e))?;

        Ok(gradio::completion(
            gradio::parse_event_stream(&body),
            api_name,
        )?)
    }

    #[instrument(skip_all, fields(path = %file.path))]
    async fn download(&self, file: &FileData) -> Result<Vec<u8>, Report<InferenceError>> {
        let url = file
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/file={}", self.root, file.path));
        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(|e| request_failed(&url, &e))?;
        let bytes = ensure_success(&url, response)
            .await?
            .bytes()
            .await
            .map_err(|e| request_failed(&url, &e))?;
        debug!(bytes = bytes.len(), "file downloaded");
        Ok(bytes.to_vec())
    }
}

fn authorize(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        Some(token) if !token.is_empty() => request.bearer_auth(token),
        _ => request,
    }
}

fn request_failed(endpoint: &str, error: &reqwest::Error) -> InferenceError {
    InferenceError::RequestFailed {
        endpoint: endpoint.to_string(),
        reason: error.to_string(),
    }
}

async fn ensure_success(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, Report<InferenceError>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"));
    Err(InferenceError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    }
    .into())
}

async fn parse_json<T: DeserializeOwned>(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<T, Report<InferenceError>> {
    response.json::<T>().await.map_err(|e| {
        InferenceError::ResponseParseFailed {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

async fn get_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: &str,
    token: Option<&str>,
) -> Result<T, Report<InferenceError>> {
    let response = authorize(http.get(url), token)
        .send()
        .await
        .map_err(|e| request_failed(url, &e))?;
    parse_json(url, ensure_success(url, response).await?).await
}
