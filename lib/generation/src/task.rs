//! Task model.
//!
//! Wire types for text-to-3D tasks. Requests are tagged by `mode`; snapshots
//! carry the status, progress and, once finished, the model URLs.

use photomesh_core::TaskId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A text-to-3D submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum GenerationRequest {
    /// Generates an untextured preview mesh from a prompt.
    Preview {
        prompt: String,
        negative_prompt: String,
        art_style: String,
        should_remesh: bool,
    },
    /// Textures the mesh of a finished preview task.
    Refine { preview_task_id: TaskId },
}

impl GenerationRequest {
    /// A preview request with the `realistic` style and remeshing enabled.
    #[must_use]
    pub fn preview(prompt: impl Into<String>, negative_prompt: impl Into<String>) -> Self {
        Self::Preview {
            prompt: prompt.into(),
            negative_prompt: negative_prompt.into(),
            art_style: "realistic".to_string(),
            should_remesh: true,
        }
    }

    #[must_use]
    pub fn refine(preview_task_id: TaskId) -> Self {
        Self::Refine { preview_task_id }
    }

    /// Returns the wire value of `mode`.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Preview { .. } => "preview",
            Self::Refine { .. } => "refine",
        }
    }
}

/// Response to a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCreated {
    /// Handle of the new task.
    pub result: TaskId,
}

/// Status of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Succeeded,
    Failed,
    Canceled,
    Expired,
    /// Any value this client does not recognise; treated as still running.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Returns true if no further transition can occur.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::Expired
        )
    }

    /// Returns true for terminal statuses other than success.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && *self != Self::Succeeded
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
            Self::Expired => "EXPIRED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output model formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    #[default]
    Glb,
    Fbx,
    Obj,
    Usdz,
}

impl ModelFormat {
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Fbx => "fbx",
            Self::Obj => "obj",
            Self::Usdz => "usdz",
        }
    }
}

impl fmt::Display for ModelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for ModelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "glb" => Ok(Self::Glb),
            "fbx" => Ok(Self::Fbx),
            "obj" => Ok(Self::Obj),
            "usdz" => Ok(Self::Usdz),
            other => Err(format!("unknown model format: {other}")),
        }
    }
}

/// Download URLs of a finished task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fbx: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usdz: Option<String>,
    /// Material library accompanying `obj`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtl: Option<String>,
}

impl ModelUrls {
    #[must_use]
    pub fn get(&self, format: ModelFormat) -> Option<&str> {
        let url = match format {
            ModelFormat::Glb => &self.glb,
            ModelFormat::Fbx => &self.fbx,
            ModelFormat::Obj => &self.obj,
            ModelFormat::Usdz => &self.usdz,
        };
        url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Remote failure details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: String,
}

/// One status fetch of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub status: TaskStatus,
    /// Percentage from 0 to 100.
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub model_urls: Option<ModelUrls>,
    #[serde(default)]
    pub task_error: Option<TaskError>,
}

impl TaskSnapshot {
    /// Returns the URL of `format`, if the task produced one.
    #[must_use]
    pub fn model_url(&self, format: ModelFormat) -> Option<&str> {
        self.model_urls.as_ref()?.get(format)
    }

    /// Returns the remote error message, if a non-empty one was reported.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.task_error
            .as_ref()
            .map(|e| e.message.as_str())
            .filter(|m| !m.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preview_request_wire_shape() {
        let request = GenerationRequest::preview("a monster mask", "low quality");
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({
                "mode": "preview",
                "prompt": "a monster mask",
                "negative_prompt": "low quality",
                "art_style": "realistic",
                "should_remesh": true
            })
        );
    }

    #[test]
    fn refine_request_carries_handle() {
        let request = GenerationRequest::refine(TaskId::new("018a210d-8ba4"));
        assert_eq!(
            serde_json::to_value(&request).expect("serialize"),
            json!({"mode": "refine", "preview_task_id": "018a210d-8ba4"})
        );
        assert_eq!(request.mode(), "refine");
    }

    #[test]
    fn snapshot_parses_finished_task() {
        let snapshot: TaskSnapshot = serde_json::from_value(json!({
            "id": "018a210d",
            "status": "SUCCEEDED",
            "progress": 100,
            "model_urls": {"glb": "https://assets.example/model.glb", "fbx": ""},
            "task_error": {"message": ""},
            "thumbnail_url": "https://assets.example/preview.png"
        }))
        .expect("deserialize");

        assert_eq!(snapshot.status, TaskStatus::Succeeded);
        assert_eq!(
            snapshot.model_url(ModelFormat::Glb),
            Some("https://assets.example/model.glb")
        );
        assert_eq!(snapshot.model_url(ModelFormat::Fbx), None);
        assert_eq!(snapshot.error_message(), None);
    }

    #[test]
    fn unrecognised_status_is_unknown() {
        let status: TaskStatus = serde_json::from_value(json!("QUEUED")).expect("deserialize");
        assert_eq!(status, TaskStatus::Unknown);
        assert!(!status.is_terminal());
    }

    #[test]
    fn failure_statuses() {
        assert!(TaskStatus::Failed.is_failure());
        assert!(TaskStatus::Canceled.is_failure());
        assert!(TaskStatus::Expired.is_failure());
        assert!(!TaskStatus::Succeeded.is_failure());
        assert!(!TaskStatus::InProgress.is_failure());
    }

    #[test]
    fn format_parses_case_insensitively() {
        assert_eq!("GLB".parse::<ModelFormat>(), Ok(ModelFormat::Glb));
        assert!("stl".parse::<ModelFormat>().is_err());
    }
}
