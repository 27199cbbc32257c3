//! Photogrammetry reconstruction driver for photomesh.
//!
//! This crate runs the external COLMAP tool through six fixed stages:
//!
//! - **Layout**: the workspace directories and files each stage reads and writes
//! - **Stages**: the ordered subcommands and their exact flags
//! - **Runner**: the `CommandRunner` trait and the real process runner
//! - **Pipeline**: ordered execution that stops at the first failing stage

pub mod error;
pub mod layout;
pub mod pipeline;
pub mod runner;
pub mod stage;

pub use error::{PipelineError, RunnerError};
pub use layout::{ReconstructionLayout, ensure_dir};
pub use pipeline::{PipelineReport, PipelineState, ReconstructionPipeline, StageRecord};
pub use runner::{CommandOutcome, CommandRunner, Invocation, ProcessRunner};
pub use stage::Stage;
