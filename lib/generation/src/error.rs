//! Error types for the generation crate.

use crate::task::{ModelFormat, TaskStatus};
use photomesh_core::TaskId;
use std::fmt;

/// Errors that can occur while generating a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// The HTTP request could not be completed.
    RequestFailed { endpoint: String, reason: String },
    /// The service answered with a non-success status.
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The response body could not be parsed.
    ResponseParseFailed { endpoint: String, reason: String },
    /// The task reached a failure status.
    TaskFailed {
        task_id: TaskId,
        status: TaskStatus,
        message: Option<String>,
    },
    /// The task did not finish within the allowed number of status fetches.
    PollAttemptsExhausted { task_id: TaskId, attempts: u32 },
    /// The task did not finish before the polling deadline.
    PollTimedOut { task_id: TaskId, elapsed_secs: u64 },
    /// The finished task has no URL for the requested format.
    MissingModelUrl { task_id: TaskId, format: ModelFormat },
    /// The model file could not be written.
    WriteFailed { path: String, reason: String },
    /// Client configuration is invalid.
    InvalidConfig { reason: String },
    /// Context layer naming the pass that failed.
    Pass { pass: &'static str },
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestFailed { endpoint, reason } => {
                write!(f, "request to {endpoint} failed: {reason}")
            }
            Self::UnexpectedStatus {
                endpoint,
                status,
                body,
            } => write!(f, "{endpoint} returned HTTP {status}: {body}"),
            Self::ResponseParseFailed { endpoint, reason } => {
                write!(f, "failed to parse response from {endpoint}: {reason}")
            }
            Self::TaskFailed {
                task_id,
                status,
                message: Some(message),
            } => write!(f, "task {task_id} ended with {status}: {message}"),
            Self::TaskFailed {
                task_id,
                status,
                message: None,
            } => write!(f, "task {task_id} ended with {status}"),
            Self::PollAttemptsExhausted { task_id, attempts } => {
                write!(f, "task {task_id} still running after {attempts} status checks")
            }
            Self::PollTimedOut {
                task_id,
                elapsed_secs,
            } => write!(f, "task {task_id} still running after {elapsed_secs}s"),
            Self::MissingModelUrl { task_id, format } => {
                write!(f, "task {task_id} has no {format} model")
            }
            Self::WriteFailed { path, reason } => {
                write!(f, "failed to write {path}: {reason}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {reason}"),
            Self::Pass { pass } => write!(f, "{pass} pass failed"),
        }
    }
}

impl std::error::Error for GenerationError {}
