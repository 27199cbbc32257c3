//! Command execution.
//!
//! `CommandRunner` is the seam between the pipeline and the operating system.
//! The pipeline only needs to know whether a command exited successfully.

use crate::error::RunnerError;
use async_trait::async_trait;
use rootcause::prelude::Report;
use std::ffi::OsString;
use std::fmt;
use std::process::ExitStatus;
use tokio::process::Command;
use tracing::{debug, instrument};

/// A program together with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl Invocation {
    #[must_use]
    pub fn new(program: impl Into<OsString>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Outcome of a finished command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    /// `None` if the process was terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutcome {
    #[must_use]
    pub fn exited(code: i32) -> Self {
        Self {
            success: code == 0,
            code: Some(code),
        }
    }
}

impl From<ExitStatus> for CommandOutcome {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Trait for running external commands to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the command and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the command could not be started or awaited.
    /// A non-zero exit is not an error at this level.
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutcome, Report<RunnerError>>;
}

/// Runs commands as child processes that inherit stdout and stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    #[instrument(skip_all, fields(program = %invocation.program.to_string_lossy()))]
    async fn run(&self, invocation: &Invocation) -> Result<CommandOutcome, Report<RunnerError>> {
        let program = invocation.program.to_string_lossy().into_owned();
        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunnerError::SpawnFailed {
                program: program.clone(),
                reason: e.to_string(),
            })?;

        let status = child.wait().await.map_err(|e| RunnerError::WaitFailed {
            program,
            reason: e.to_string(),
        })?;
        debug!(?status, "process exited");
        Ok(status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_display_joins_arguments() {
        let invocation = Invocation::new(
            "colmap",
            vec!["exhaustive_matcher".into(), "--database_path".into(), "ws/database.db".into()],
        );
        assert_eq!(
            invocation.to_string(),
            "colmap exhaustive_matcher --database_path ws/database.db"
        );
    }

    #[test]
    fn exited_outcome_success_tracks_code() {
        assert!(CommandOutcome::exited(0).success);
        assert!(!CommandOutcome::exited(2).success);
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let invocation = Invocation::new("photomesh-definitely-not-a-program", vec![]);
        let err = ProcessRunner.run(&invocation).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            RunnerError::SpawnFailed { .. }
        ));
    }
}
