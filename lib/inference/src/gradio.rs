//! Gradio wire protocol.
//!
//! A space is called in two steps: `POST {prefix}/call/{api}` returns an
//! `event_id`, and `GET {prefix}/call/{api}/{event_id}` streams server-sent
//! events until a `complete` or `error` event arrives. Files travel as
//! `FileData` payloads that reference server-side paths.

use crate::error::InferenceError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Marker carried in `meta._type` of every Gradio file payload.
pub const FILE_DATA_TYPE: &str = "gradio.FileData";

/// A file reference understood by Gradio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    /// Server-side path returned by the upload endpoint.
    pub path: String,
    /// Public URL of the file, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Original client-side file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_name: Option<String>,
    /// Size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub meta: FileMeta,
}

/// Type tag attached to file payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(rename = "_type")]
    pub kind: String,
}

impl Default for FileMeta {
    fn default() -> Self {
        Self {
            kind: FILE_DATA_TYPE.to_string(),
        }
    }
}

impl FileData {
    /// Creates a payload for a freshly uploaded file.
    #[must_use]
    pub fn uploaded(path: impl Into<String>, orig_name: impl Into<String>, size: u64) -> Self {
        Self {
            path: path.into(),
            url: None,
            orig_name: Some(orig_name.into()),
            size: Some(size),
            mime_type: None,
            meta: FileMeta::default(),
        }
    }

    /// Extracts a file payload from an operation output value.
    ///
    /// Accepts a bare payload or a component update wrapping one in `value`.
    #[must_use]
    pub fn from_output(value: &JsonValue) -> Option<Self> {
        let object = value.as_object()?;
        if let Some(inner) = object.get("value").filter(|v| v.is_object()) {
            return Self::from_output(inner);
        }
        object.get("path")?.as_str()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// Returns the file name, falling back to the last path segment.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.orig_name
            .as_deref()
            .unwrap_or_else(|| self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path))
    }
}

/// Response of the Hub's space host lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct SpaceHost {
    pub host: String,
}

/// The part of a space's `/config` document the client needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpaceConfig {
    #[serde(default)]
    pub api_prefix: Option<String>,
}

/// Body of the call-start request.
#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    pub data: Vec<JsonValue>,
}

/// Response of the call-start request.
#[derive(Debug, Clone, Deserialize)]
pub struct CallStarted {
    pub event_id: String,
}

/// A server-sent event on a call's result stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Intermediate output.
    Generating(JsonValue),
    /// Final output.
    Complete(JsonValue),
    /// The operation failed, with the server's message if any.
    Error(Option<String>),
    /// Keep-alive.
    Heartbeat,
}

/// Normalizes an api name (`/shape_generation`) to its path segment.
#[must_use]
pub fn endpoint_name(api_name: &str) -> &str {
    api_name.trim_start_matches('/')
}

/// Parses a server-sent event body into events, skipping unknown kinds.
#[must_use]
pub fn parse_event_stream(body: &str) -> Vec<StreamEvent> {
    let normalized = body.replace("\r\n", "\n");
    let mut events = Vec::new();

    for block in normalized.split("\n\n") {
        let mut kind = None;
        let mut data_lines = Vec::new();
        for line in block.lines() {
            if let Some(value) = line.strip_prefix("event:") {
                kind = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                data_lines.push(value.strip_prefix(' ').unwrap_or(value));
            }
        }

        let Some(kind) = kind else { continue };
        let data = data_lines.join("\n");
        let parsed = serde_json::from_str::<JsonValue>(&data)
            .unwrap_or_else(|_| JsonValue::String(data.clone()));

        match kind.as_str() {
            "generating" => events.push(StreamEvent::Generating(parsed)),
            "complete" => events.push(StreamEvent::Complete(parsed)),
            "heartbeat" => events.push(StreamEvent::Heartbeat),
            "error" => {
                let message = match parsed {
                    JsonValue::Null => None,
                    JsonValue::String(s) if s.is_empty() => None,
                    JsonValue::String(s) => Some(s),
                    other => Some(other.to_string()),
                };
                events.push(StreamEvent::Error(message));
            }
            _ => {}
        }
    }

    events
}

/// Returns the output values of the first `complete` event.
///
/// # Errors
///
/// Returns `RemoteError` if an `error` event comes first, or
/// `StreamEndedEarly` if the stream holds neither.
pub fn completion(events: Vec<StreamEvent>, api_name: &str) -> Result<Vec<JsonValue>, InferenceError> {
    for event in events {
        match event {
            StreamEvent::Complete(JsonValue::Array(values)) => return Ok(values),
            StreamEvent::Complete(value) => return Ok(vec![value]),
            StreamEvent::Error(message) => {
                return Err(InferenceError::RemoteError {
                    api_name: api_name.to_string(),
                    message,
                });
            }
            StreamEvent::Generating(_) | StreamEvent::Heartbeat => {}
        }
    }

    Err(InferenceError::StreamEndedEarly {
        api_name: api_name.to_string(),
    })
}
