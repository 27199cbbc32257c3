//! Error types for the inference crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `InferenceError`: transport, protocol and remote failures
//! - `InferenceError::Invocation`: context wrapper naming the failed call

use photomesh_core::InvocationId;
use std::fmt;

/// Errors from inference operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// The space identifier could not be resolved to a host.
    SpaceResolutionFailed { space: String, reason: String },
    /// The HTTP request could not be sent or its body could not be read.
    RequestFailed { endpoint: String, reason: String },
    /// The server answered with a non-success status.
    UnexpectedStatus {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// A response body did not have the expected shape.
    ResponseParseFailed { endpoint: String, reason: String },
    /// A local or remote input image could not be read.
    ImageReadFailed { image: String, reason: String },
    /// The remote operation reported an error event.
    RemoteError {
        api_name: String,
        message: Option<String>,
    },
    /// The event stream closed without a `complete` event.
    StreamEndedEarly { api_name: String },
    /// The result did not contain a downloadable model file.
    NoModelOutput,
    /// Writing a downloaded file failed.
    WriteFailed { path: String, reason: String },
    /// Invalid client configuration.
    InvalidConfig { reason: String },
    /// Inference call context (use as context wrapper).
    Invocation { invocation_id: InvocationId },
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpaceResolutionFailed { space, reason } => {
                write!(f, "failed to resolve space '{space}': {reason}")
            }
            Self::RequestFailed { endpoint, reason } => {
                write!(f, "request to {endpoint} failed: {reason}")
            }
            Self::UnexpectedStatus {
                endpoint,
                status,
                body,
            } => {
                write!(f, "{endpoint} answered {status}: {body}")
            }
            Self::ResponseParseFailed { endpoint, reason } => {
                write!(f, "failed to parse response from {endpoint}: {reason}")
            }
            Self::ImageReadFailed { image, reason } => {
                write!(f, "failed to read image '{image}': {reason}")
            }
            Self::RemoteError { api_name, message } => match message {
                Some(message) => write!(f, "operation '{api_name}' failed: {message}"),
                None => write!(f, "operation '{api_name}' failed"),
            },
            Self::StreamEndedEarly { api_name } => {
                write!(f, "event stream for '{api_name}' ended before completion")
            }
            Self::NoModelOutput => write!(f, "result contains no model file"),
            Self::WriteFailed { path, reason } => {
                write!(f, "failed to write '{path}': {reason}")
            }
            Self::InvalidConfig { reason } => {
                write!(f, "invalid inference configuration: {reason}")
            }
            Self::Invocation { invocation_id } => {
                write!(f, "inference call {invocation_id} failed")
            }
        }
    }
}

impl std::error::Error for InferenceError {}
