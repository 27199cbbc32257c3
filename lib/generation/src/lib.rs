//! Text-to-3D generation for photomesh.
//!
//! This crate drives a remote task-based generation service:
//!
//! - **Task model**: requests, status values and snapshots as they appear on the wire
//! - **Client**: the `TextTo3dApi` trait and its HTTP implementation
//! - **Polling**: a bounded wait for a task to reach a terminal status
//! - **Download**: writing a finished task's model to disk
//! - **Session**: the preview pass followed by the refine pass

pub mod client;
pub mod credential;
pub mod download;
pub mod error;
pub mod poll;
pub mod session;
pub mod task;

pub use client::{MeshyClient, MeshyConfig, TextTo3dApi};
pub use credential::ApiKey;
pub use download::download_model;
pub use error::GenerationError;
pub use poll::{PollPolicy, poll_until_complete};
pub use session::{Pass, PassOutcome, SessionEvent, SessionOutcome, SessionPaths, TextTo3dSession};
pub use task::{
    GenerationRequest, ModelFormat, ModelUrls, TaskCreated, TaskError, TaskSnapshot, TaskStatus,
};
