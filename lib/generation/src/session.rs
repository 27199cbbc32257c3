//! Preview-then-refine session.
//!
//! A session runs up to two passes against the same service. Each pass
//! submits a request, polls the task to success and downloads its model. The
//! refine pass is keyed by the task handle of the preview pass.

use crate::client::TextTo3dApi;
use crate::download::download_model;
use crate::error::GenerationError;
use crate::poll::{PollPolicy, poll_until_complete};
use crate::task::{GenerationRequest, ModelFormat, TaskStatus};
use photomesh_core::{RunId, TaskId};
use rootcause::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, instrument};

/// Which pass of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    Preview,
    Refine,
}

impl Pass {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Refine => "refine",
        }
    }
}

/// Progress notifications emitted while a session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    TaskCreated { pass: Pass, task_id: TaskId },
    Progress { pass: Pass, status: TaskStatus, progress: u8 },
    Downloaded { pass: Pass, path: PathBuf, bytes: u64 },
}

/// Output files of the two passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPaths {
    pub preview: PathBuf,
    pub refined: PathBuf,
}

impl Default for SessionPaths {
    fn default() -> Self {
        Self::in_dir(".", ModelFormat::Glb)
    }
}

impl SessionPaths {
    /// `preview_model.<ext>` and `refined_model.<ext>` inside `dir`.
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>, format: ModelFormat) -> Self {
        let dir = dir.into();
        let ext = format.extension();
        Self {
            preview: dir.join(format!("preview_model.{ext}")),
            refined: dir.join(format!("refined_model.{ext}")),
        }
    }
}

/// Result of one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassOutcome {
    pub task_id: TaskId,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Result of a session. `refined` is `None` for preview-only sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionOutcome {
    pub run_id: RunId,
    pub preview: PassOutcome,
    pub refined: Option<PassOutcome>,
}

type EventObserver = Box<dyn Fn(&SessionEvent) + Send + Sync>;

/// Drives a text-to-3D session.
pub struct TextTo3dSession<A> {
    api: A,
    run_id: RunId,
    policy: PollPolicy,
    format: ModelFormat,
    paths: SessionPaths,
    observer: Option<EventObserver>,
}

impl<A: TextTo3dApi> TextTo3dSession<A> {
    #[must_use]
    pub fn new(api: A) -> Self {
        Self {
            api,
            run_id: RunId::new(),
            policy: PollPolicy::default(),
            format: ModelFormat::default(),
            paths: SessionPaths::default(),
            observer: None,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: ModelFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_paths(mut self, paths: SessionPaths) -> Self {
        self.paths = paths;
        self
    }

    #[must_use]
    pub fn with_observer(mut self, observer: impl Fn(&SessionEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    #[must_use]
    pub fn paths(&self) -> &SessionPaths {
        &self.paths
    }

    /// Runs the preview pass, then the refine pass on the preview's task.
    ///
    /// # Errors
    ///
    /// Returns the first failure of either pass, wrapped in a `Pass` context.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(
        &self,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<SessionOutcome, Report<GenerationError>> {
        let preview = self.preview_pass(prompt, negative_prompt).await?;
        let refined = self
            .pass(
                Pass::Refine,
                GenerationRequest::refine(preview.task_id.clone()),
                self.paths.refined.clone(),
            )
            .await
            .context(GenerationError::Pass {
                pass: Pass::Refine.name(),
            })?;

        Ok(SessionOutcome {
            run_id: self.run_id,
            preview,
            refined: Some(refined),
        })
    }

    /// Runs the preview pass only.
    ///
    /// # Errors
    ///
    /// Returns the pass failure, wrapped in a `Pass` context.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run_preview(
        &self,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<SessionOutcome, Report<GenerationError>> {
        let preview = self.preview_pass(prompt, negative_prompt).await?;
        Ok(SessionOutcome {
            run_id: self.run_id,
            preview,
            refined: None,
        })
    }

    async fn preview_pass(
        &self,
        prompt: &str,
        negative_prompt: &str,
    ) -> Result<PassOutcome, Report<GenerationError>> {
        self.pass(
            Pass::Preview,
            GenerationRequest::preview(prompt, negative_prompt),
            self.paths.preview.clone(),
        )
        .await
        .context(GenerationError::Pass {
            pass: Pass::Preview.name(),
        })
    }

    async fn pass(
        &self,
        pass: Pass,
        request: GenerationRequest,
        dest: PathBuf,
    ) -> Result<PassOutcome, Report<GenerationError>> {
        let task_id = self.api.create_task(&request).await?;
        info!(pass = pass.name(), %task_id, "pass started");
        self.emit(&SessionEvent::TaskCreated {
            pass,
            task_id: task_id.clone(),
        });

        let snapshot = poll_until_complete(&self.api, &task_id, &self.policy, |snapshot| {
            self.emit(&SessionEvent::Progress {
                pass,
                status: snapshot.status,
                progress: snapshot.progress,
            });
        })
        .await?;

        let bytes = download_model(&self.api, &snapshot, self.format, &dest).await?;
        self.emit(&SessionEvent::Downloaded {
            pass,
            path: dest.clone(),
            bytes,
        });

        Ok(PassOutcome {
            task_id,
            path: dest,
            bytes,
        })
    }

    fn emit(&self, event: &SessionEvent) {
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{ModelUrls, TaskSnapshot};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// In-memory service: each created task replays its own status script.
    #[derive(Default)]
    struct FakeService {
        submissions: Arc<Mutex<Vec<GenerationRequest>>>,
        scripts: Mutex<VecDeque<Vec<TaskStatus>>>,
        progress: Mutex<HashMap<TaskId, VecDeque<TaskStatus>>>,
        fetches: Mutex<HashMap<TaskId, u32>>,
        reject_refine: bool,
    }

    impl FakeService {
        fn with_scripts(scripts: Vec<Vec<TaskStatus>>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                ..Default::default()
            }
        }

        fn fetches(&self, task_id: &str) -> u32 {
            self.fetches
                .lock()
                .unwrap()
                .get(&TaskId::new(task_id))
                .copied()
                .unwrap_or(0)
        }
    }

    #[async_trait]
    impl TextTo3dApi for FakeService {
        async fn create_task(
            &self,
            request: &GenerationRequest,
        ) -> Result<TaskId, Report<GenerationError>> {
            let mut submissions = self.submissions.lock().unwrap();
            if self.reject_refine && matches!(request, GenerationRequest::Refine { .. }) {
                return Err(GenerationError::UnexpectedStatus {
                    endpoint: "/openapi/v2/text-to-3d".to_string(),
                    status: 402,
                    body: "insufficient credits".to_string(),
                }
                .into());
            }
            submissions.push(request.clone());
            let task_id = TaskId::new(format!("task-{}", submissions.len()));
            let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
            self.progress
                .lock()
                .unwrap()
                .insert(task_id.clone(), script.into());
            Ok(task_id)
        }

        async fn get_task(&self, task_id: &TaskId) -> Result<TaskSnapshot, Report<GenerationError>> {
            *self
                .fetches
                .lock()
                .unwrap()
                .entry(task_id.clone())
                .or_default() += 1;
            let mut progress = self.progress.lock().unwrap();
            let script = progress.get_mut(task_id).unwrap();
            let status = script.pop_front().unwrap_or(TaskStatus::Succeeded);
            Ok(TaskSnapshot {
                id: task_id.clone(),
                status,
                progress: if status == TaskStatus::Succeeded { 100 } else { 50 },
                model_urls: Some(ModelUrls {
                    glb: Some(format!("https://assets.example/{task_id}.glb")),
                    ..Default::default()
                }),
                task_error: None,
            })
        }

        async fn download(&self, url: &str) -> Result<Vec<u8>, Report<GenerationError>> {
            Ok(format!("bytes-of:{url}").into_bytes())
        }
    }

    fn session(api: FakeService, dir: &std::path::Path) -> TextTo3dSession<FakeService> {
        TextTo3dSession::new(api)
            .with_policy(PollPolicy::default().with_interval(Duration::ZERO))
            .with_paths(SessionPaths::in_dir(dir, ModelFormat::Glb))
    }

    #[tokio::test]
    async fn refine_uses_preview_handle_and_writes_two_files() {
        use TaskStatus::*;
        let dir = tempfile::tempdir().expect("tempdir");
        let api = FakeService::with_scripts(vec![vec![Pending, Pending, Succeeded], vec![Succeeded]]);
        let submissions = Arc::clone(&api.submissions);
        let session = session(api, dir.path());

        let outcome = session
            .run("a monster mask", "low quality")
            .await
            .expect("session succeeds");

        let submissions = submissions.lock().unwrap();
        assert_eq!(submissions.len(), 2);
        assert_eq!(
            submissions[0],
            GenerationRequest::preview("a monster mask", "low quality")
        );
        assert_eq!(
            submissions[1],
            GenerationRequest::refine(outcome.preview.task_id.clone())
        );

        assert_eq!(session.api.fetches("task-1"), 3);
        assert_eq!(session.api.fetches("task-2"), 1);

        let refined = outcome.refined.expect("refined pass");
        assert_ne!(outcome.preview.path, refined.path);
        assert!(outcome.preview.path.ends_with("preview_model.glb"));
        assert!(refined.path.ends_with("refined_model.glb"));
        assert_eq!(
            std::fs::read(&outcome.preview.path).expect("preview"),
            b"bytes-of:https://assets.example/task-1.glb"
        );
        assert_eq!(
            std::fs::read(&refined.path).expect("refined"),
            b"bytes-of:https://assets.example/task-2.glb"
        );
    }

    #[tokio::test]
    async fn preview_only_skips_refine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = FakeService::with_scripts(vec![vec![TaskStatus::Succeeded]]);
        let submissions = Arc::clone(&api.submissions);

        let outcome = session(api, dir.path())
            .run_preview("a chair", "")
            .await
            .expect("preview succeeds");

        assert!(outcome.refined.is_none());
        assert!(outcome.run_id.to_string().starts_with("run_"));
        assert_eq!(submissions.lock().unwrap().len(), 1);
        assert!(!dir.path().join("refined_model.glb").exists());
    }

    #[tokio::test]
    async fn rejected_refine_keeps_preview_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let api = FakeService {
            reject_refine: true,
            ..FakeService::with_scripts(vec![vec![TaskStatus::Succeeded]])
        };

        let err = session(api, dir.path())
            .run("a lamp", "")
            .await
            .unwrap_err();

        assert_eq!(
            err.current_context(),
            &GenerationError::Pass { pass: "refine" }
        );
        assert!(dir.path().join("preview_model.glb").exists());
        assert!(!dir.path().join("refined_model.glb").exists());
    }

    #[tokio::test]
    async fn observer_receives_progress_and_downloads() {
        use TaskStatus::*;
        let dir = tempfile::tempdir().expect("tempdir");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let session = session(
            FakeService::with_scripts(vec![vec![InProgress, Succeeded]]),
            dir.path(),
        )
        .with_observer(move |event| sink.lock().unwrap().push(event.clone()));

        session.run_preview("a vase", "").await.expect("succeeds");

        let events = events.lock().unwrap();
        assert_eq!(
            events[0],
            SessionEvent::TaskCreated {
                pass: Pass::Preview,
                task_id: TaskId::new("task-1")
            }
        );
        assert_eq!(
            events[1],
            SessionEvent::Progress {
                pass: Pass::Preview,
                status: InProgress,
                progress: 50
            }
        );
        assert!(matches!(
            events.last(),
            Some(SessionEvent::Downloaded { pass: Pass::Preview, .. })
        ));
    }
}
