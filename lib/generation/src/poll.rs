//! Polling.
//!
//! Waits for a task by fetching its status once per iteration and sleeping
//! between fetches. The wait ends on a terminal status or when the policy's
//! attempt or time bound is reached.

use crate::client::TextTo3dApi;
use crate::error::GenerationError;
use crate::task::{TaskSnapshot, TaskStatus};
use photomesh_core::TaskId;
use rootcause::prelude::Report;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, instrument};

/// How long and how often to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between status fetches.
    pub interval: Duration,
    /// Maximum number of status fetches, unbounded if `None`.
    pub max_attempts: Option<u32>,
    /// Maximum total wait, unbounded if `None`.
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
            timeout: Some(Duration::from_secs(30 * 60)),
        }
    }
}

impl PollPolicy {
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Polls `task_id` until it succeeds.
///
/// `observer` is called with every fetched snapshot, including the last one.
///
/// # Errors
///
/// Returns `TaskFailed` if the task reaches a failure status,
/// `PollAttemptsExhausted` or `PollTimedOut` if the policy's bound is hit, or
/// the client's error if a fetch fails.
#[instrument(skip(api, policy, observer))]
pub async fn poll_until_complete<A, F>(
    api: &A,
    task_id: &TaskId,
    policy: &PollPolicy,
    mut observer: F,
) -> Result<TaskSnapshot, Report<GenerationError>>
where
    A: TextTo3dApi + ?Sized,
    F: FnMut(&TaskSnapshot),
{
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        let snapshot = api.get_task(task_id).await?;
        attempts += 1;
        observer(&snapshot);

        match snapshot.status {
            TaskStatus::Succeeded => {
                info!(attempts, "task succeeded");
                return Ok(snapshot);
            }
            status if status.is_failure() => {
                return Err(GenerationError::TaskFailed {
                    task_id: task_id.clone(),
                    status,
                    message: snapshot.error_message().map(str::to_string),
                }
                .into());
            }
            _ => {}
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(GenerationError::PollAttemptsExhausted {
                task_id: task_id.clone(),
                attempts,
            }
            .into());
        }
        if let Some(timeout) = policy.timeout {
            let elapsed = started.elapsed();
            if elapsed + policy.interval > timeout {
                return Err(GenerationError::PollTimedOut {
                    task_id: task_id.clone(),
                    elapsed_secs: elapsed.as_secs(),
                }
                .into());
            }
        }

        tokio::time::sleep(policy.interval).await;
    }
}
