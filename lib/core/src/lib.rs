//! Core types shared by the photomesh crates.
//!
//! This crate provides the `Result` alias used for rootcause-based error
//! propagation and the identifier types that tag runs, inference calls and
//! remote generation tasks.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{InvocationId, ParseIdError, RunId, TaskId};
