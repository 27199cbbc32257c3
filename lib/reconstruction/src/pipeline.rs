//! Reconstruction pipeline state machine.
//!
//! A run walks the stages in order: `Pending`, then `Running` once per stage,
//! ending in `Done`. A stage that exits non-zero moves the run to `Aborted` and
//! no later stage is started. There is no retry and no resume.

use crate::error::PipelineError;
use crate::layout::{ReconstructionLayout, ensure_dir};
use crate::runner::{CommandRunner, Invocation};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use photomesh_core::RunId;
use rootcause::prelude::*;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Program invoked when none is configured.
pub const DEFAULT_PROGRAM: &str = "colmap";

/// The state of a reconstruction run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    /// Nothing has run yet.
    Pending,
    /// The given stage is executing.
    Running { stage: Stage },
    /// The run stopped. `stage` is `None` when directory setup failed.
    Aborted { stage: Option<Stage> },
    /// Every stage succeeded.
    Done,
}

impl PipelineState {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Aborted { .. } | Self::Done)
    }
}

/// Record of a stage that completed successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    /// The command line as it was run.
    pub command: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub stages: Vec<StageRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The fused point cloud written by the last stage.
    pub output_path: PathBuf,
}

impl PipelineReport {
    /// Returns the duration of the run.
    #[must_use]
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

type StageObserver = Box<dyn Fn(Stage, &Invocation) + Send + Sync>;

/// Drives the six stages against a command runner.
pub struct ReconstructionPipeline<R> {
    runner: R,
    layout: ReconstructionLayout,
    program: OsString,
    run_id: RunId,
    state: PipelineState,
    records: Vec<StageRecord>,
    observer: Option<StageObserver>,
}

impl<R: CommandRunner> ReconstructionPipeline<R> {
    /// Creates a pending pipeline that invokes `colmap`.
    #[must_use]
    pub fn new(runner: R, layout: ReconstructionLayout) -> Self {
        Self {
            runner,
            layout,
            program: DEFAULT_PROGRAM.into(),
            run_id: RunId::new(),
            state: PipelineState::Pending,
            records: Vec::new(),
            observer: None,
        }
    }

    /// Overrides the program invoked for every stage.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<OsString>) -> Self {
        self.program = program.into();
        self
    }

    /// Registers a callback invoked just before each stage starts.
    #[must_use]
    pub fn with_observer(
        mut self,
        observer: impl Fn(Stage, &Invocation) + Send + Sync + 'static,
    ) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn layout(&self) -> &ReconstructionLayout {
        &self.layout
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Stages completed so far, in order. Still available after an abort.
    #[must_use]
    pub fn completed_stages(&self) -> &[StageRecord] {
        &self.records
    }

    /// Returns the invocations a run would execute, in order, without running them.
    #[must_use]
    pub fn plan(&self) -> Vec<(Stage, Invocation)> {
        Stage::ALL
            .into_iter()
            .map(|stage| (stage, self.invocation(stage)))
            .collect()
    }

    fn invocation(&self, stage: Stage) -> Invocation {
        Invocation::new(self.program.clone(), stage.arguments(&self.layout))
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryCreationFailed` if a required directory cannot be
    /// created, `RunFailed` if a stage's process cannot be started or waited on,
    /// and
    /// `StageFailed` for the first stage that exits unsuccessfully.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(&mut self) -> Result<PipelineReport, Report<PipelineError>> {
        let started_at = Utc::now();
        self.records.clear();

        if let Err(report) = self.execute().await {
            self.state = PipelineState::Aborted {
                stage: report.current_context().stage(),
            };
            warn!(error = %report.current_context(), "reconstruction aborted");
            return Err(report);
        }

        self.state = PipelineState::Done;
        let output_path = self.layout.fused_output_path();
        info!(output = %output_path.display(), "reconstruction completed");

        Ok(PipelineReport {
            run_id: self.run_id,
            stages: self.records.clone(),
            started_at,
            finished_at: Utc::now(),
            output_path,
        })
    }

    async fn execute(&mut self) -> Result<(), Report<PipelineError>> {
        create_dir(&self.layout.workspace_path).await?;

        for stage in Stage::ALL {
            self.state = PipelineState::Running { stage };
            if let Some(dir) = stage.required_dir(&self.layout) {
                create_dir(&dir).await?;
            }

            let invocation = self.invocation(stage);
            if let Some(observer) = &self.observer {
                observer(stage, &invocation);
            }
            info!(stage = stage.number(), command = %invocation, "running stage");

            let started_at = Utc::now();
            let outcome = self
                .runner
                .run(&invocation)
                .await
                .context(PipelineError::RunFailed { stage })?;

            if !outcome.success {
                return Err(PipelineError::StageFailed {
                    stage,
                    exit_code: outcome.code,
                }
                .into());
            }

            self.records.push(StageRecord {
                stage,
                command: invocation.to_string(),
                started_at,
                finished_at: Utc::now(),
            });
        }
        Ok(())
    }
}

async fn create_dir(path: &Path) -> Result<(), Report<PipelineError>> {
    ensure_dir(path)
        .await
        .map_err(|e| PipelineError::DirectoryCreationFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    Ok(())
}
