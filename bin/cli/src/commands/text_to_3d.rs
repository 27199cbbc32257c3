//! `photomesh text-to-3d`: preview and refine with Meshy.

use crate::cli::TextTo3dArgs;
use crate::config::{AppConfig, MESHY_API_KEY_VAR};
use crate::error::CliError;
use photomesh_generation::{
    MeshyClient, Pass, SessionEvent, SessionPaths, TaskStatus, TextTo3dSession,
};
use photomesh_core::Result;
use rootcause::prelude::*;

fn label(pass: Pass) -> &'static str {
    match pass {
        Pass::Preview => "Preview",
        Pass::Refine => "Refined",
    }
}

/// Renders a session event as a progress line.
#[must_use]
pub fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::TaskCreated { pass, task_id } => {
            format!("{} task created. Task ID: {task_id}", label(*pass))
        }
        SessionEvent::Progress {
            pass,
            status: TaskStatus::Succeeded,
            ..
        } => format!("{} task finished.", label(*pass)),
        SessionEvent::Progress {
            pass,
            status,
            progress,
        } => format!(
            "{} task status: {status} | Progress: {progress}",
            label(*pass)
        ),
        SessionEvent::Downloaded { pass, path, bytes } => format!(
            "{} model downloaded to {} ({bytes} bytes).",
            label(*pass),
            path.display()
        ),
    }
}

/// Runs the command.
///
/// # Errors
///
/// Returns an error if the key is missing, or if a submission, a poll or a
/// download fails.
pub async fn run(args: TextTo3dArgs, config: &AppConfig) -> Result<(), CliError> {
    let api_key = config.meshy.api_key().ok_or(CliError::MissingApiKey {
        variable: MESHY_API_KEY_VAR,
    })?;
    let client =
        MeshyClient::new(config.meshy.client_config(api_key)).context(CliError::TextTo3d)?;

    let mut policy = config.meshy.poll_policy();
    if args.max_poll_attempts.is_some() {
        policy = policy.with_max_attempts(args.max_poll_attempts);
    }

    let session = TextTo3dSession::new(client)
        .with_policy(policy)
        .with_format(args.format)
        .with_paths(SessionPaths::in_dir(&args.output_dir, args.format))
        .with_observer(|event| println!("{}", describe(event)));

    let outcome = if args.preview_only {
        session.run_preview(&args.prompt, &args.negative_prompt).await
    } else {
        session.run(&args.prompt, &args.negative_prompt).await
    }
    .context(CliError::TextTo3d)?;

    tracing::info!(
        run_id = %outcome.run_id,
        preview = %outcome.preview.task_id,
        refined = ?outcome.refined.as_ref().map(|r| r.task_id.to_string()),
        "text-to-3d finished"
    );
    Ok(())
}
