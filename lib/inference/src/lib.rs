//! Image-to-3D inference for photomesh.
//!
//! This crate submits a single shape-generation request to a hosted Gradio
//! space and returns whatever the remote operation produces:
//!
//! - **Request model**: the fixed-shape `/shape_generation` parameters
//! - **Backend**: the `InferenceBackend` trait and its HTTP implementation
//! - **Shape generation**: upload images, invoke once, fetch the model file

pub mod backend;
pub mod error;
pub mod gradio;
pub mod request;
pub mod shape;

pub use backend::{GradioBackend, GradioConfig, InferenceBackend};
pub use error::InferenceError;
pub use gradio::{FileData, StreamEvent};
pub use request::{ImageSlot, ImageSource, ShapeArguments, ShapeGenerationRequest};
pub use shape::{ShapeGeneration, ShapeGenerationResult};
