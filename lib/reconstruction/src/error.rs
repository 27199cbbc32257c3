//! Error types for the reconstruction crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `RunnerError`: failures to launch or wait on a process
//! - `PipelineError`: stage-level failures, naming the stage that stopped the run

use crate::stage::Stage;
use std::fmt;

/// Errors from running a single external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// The process could not be started.
    SpawnFailed { program: String, reason: String },
    /// Waiting for the process failed.
    WaitFailed { program: String, reason: String },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed { program, reason } => {
                write!(f, "failed to start '{program}': {reason}")
            }
            Self::WaitFailed { program, reason } => {
                write!(f, "failed waiting for '{program}': {reason}")
            }
        }
    }
}

impl std::error::Error for RunnerError {}

/// Errors that abort a reconstruction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A required directory could not be created.
    DirectoryCreationFailed { path: String, reason: String },
    /// A stage's process could not be started or waited on.
    RunFailed { stage: Stage },
    /// A stage exited unsuccessfully. `exit_code` is `None` when the process
    /// was terminated by a signal.
    StageFailed { stage: Stage, exit_code: Option<i32> },
}

impl PipelineError {
    /// Returns the stage that stopped the run, if any.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::DirectoryCreationFailed { .. } => None,
            Self::RunFailed { stage } | Self::StageFailed { stage, .. } => Some(*stage),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryCreationFailed { path, reason } => {
                write!(f, "failed to create directory '{path}': {reason}")
            }
            Self::RunFailed { stage } => write!(f, "stage {stage} could not be run"),
            Self::StageFailed {
                stage,
                exit_code: Some(code),
            } => write!(f, "stage {stage} exited with status {code}"),
            Self::StageFailed {
                stage,
                exit_code: None,
            } => write!(f, "stage {stage} was terminated by a signal"),
        }
    }
}

impl std::error::Error for PipelineError {}
