//! Submission orchestrator.
//!
//! Drives one submission through the pipeline: optional remote staging
//! workflow, then the code-review push, with per-stage deadlines,
//! checkpointed log appends, and best-effort stage notifications.
//!
//! Concurrency contract: each submission's `submit` call runs as one
//! independent task and is the sole writer of that submission's record.
//! Status is monotonic (pending -> processing -> completed | failed) and the
//! terminal guard makes re-driving a finished submission an error rather
//! than a second run.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::RemoteConfig;
use crate::db::Database;
use crate::deadline::{with_deadline, DeadlineOutcome};
use crate::errors::{GerritError, OrchestratorError};
use crate::gerrit::{ChangeHandle, ChangeRequest, CodeReviewClient};
use crate::models::{Submission, SubmissionStatus, SubmissionStatusView, ValidationStatus};
use crate::notify::{Notifier, NotifyOutcome, Stage};
use crate::remote::{GitWorkflow, RemoteExecutor};

/// Caller-supplied metadata for a new submission.
#[derive(Debug, Clone, Default)]
pub struct SubmissionMeta {
    /// Overrides the upload's project when set.
    pub project: Option<String>,
    pub subject: String,
    pub description: String,
    pub branch: String,
    pub notification_emails: Vec<String>,
    pub remote_node_id: Option<String>,
    pub git_repository: Option<String>,
}

pub struct Orchestrator {
    db: Arc<Database>,
    gerrit: Arc<dyn CodeReviewClient>,
    remote_executor: Arc<dyn RemoteExecutor>,
    notifier: Arc<Notifier>,
    remote: RemoteConfig,
    push_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        db: Arc<Database>,
        gerrit: Arc<dyn CodeReviewClient>,
        remote_executor: Arc<dyn RemoteExecutor>,
        notifier: Arc<Notifier>,
        remote: RemoteConfig,
        push_timeout: Duration,
    ) -> Self {
        Self {
            db,
            gerrit,
            remote_executor,
            notifier,
            remote,
            push_timeout,
        }
    }

    // -----------------------------------------------------------------------
    // Creation
    // -----------------------------------------------------------------------

    /// Validate the referenced upload and persist a new pending submission.
    #[instrument(skip(self, meta))]
    pub fn create_submission(
        &self,
        upload_id: &str,
        meta: SubmissionMeta,
    ) -> Result<Submission, OrchestratorError> {
        let upload = self
            .db
            .get_upload(upload_id)?
            .ok_or_else(|| OrchestratorError::UploadNotFound(upload_id.to_string()))?;
        if upload.validation_status == ValidationStatus::Invalid {
            return Err(OrchestratorError::UploadInvalid {
                id: upload_id.to_string(),
                detail: upload
                    .validation_error
                    .unwrap_or_else(|| "validation failed".into()),
            });
        }
        if meta.subject.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("subject is required".into()));
        }
        if meta.branch.trim().is_empty() {
            return Err(OrchestratorError::InvalidRequest("branch is required".into()));
        }

        let now = chrono::Utc::now();
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            upload_id: upload.id,
            project: meta.project.unwrap_or(upload.project),
            subject: meta.subject,
            description: meta.description,
            branch: meta.branch,
            status: SubmissionStatus::Pending,
            change_id: None,
            change_url: None,
            error: None,
            notification_emails: meta.notification_emails,
            remote_node_id: meta.remote_node_id,
            git_repository: meta.git_repository,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_submission(&submission)?;
        info!(submission_id = %submission.id, project = %submission.project, "created submission");
        Ok(submission)
    }

    // -----------------------------------------------------------------------
    // The driving operation
    // -----------------------------------------------------------------------

    /// Drive a pending submission to a terminal state.
    ///
    /// Transitions to `processing` and persists immediately so pollers see
    /// progress before any slow work. Log lines are appended at checkpoints
    /// so a later failure never erases earlier visibility. The remote
    /// staging workflow is non-fatal; the code-review push is not.
    #[instrument(skip(self))]
    pub async fn submit(&self, submission_id: &str) -> Result<Submission, OrchestratorError> {
        let submission = self
            .db
            .get_submission(submission_id)?
            .ok_or_else(|| OrchestratorError::SubmissionNotFound(submission_id.to_string()))?;
        if submission.status.is_terminal() {
            return Err(OrchestratorError::TerminalState {
                id: submission.id,
                status: submission.status.to_string(),
            });
        }

        self.db
            .update_submission_status(submission_id, SubmissionStatus::Processing)?;
        self.db
            .append_submission_log(submission_id, "submission processing started")?;
        let submission = Submission {
            status: SubmissionStatus::Processing,
            ..submission
        };
        self.notify(&submission, Stage::Processing).await;

        match self.drive(&submission).await {
            Ok(handle) => {
                self.db
                    .complete_submission(submission_id, &handle.change_id, &handle.change_url)?;
                self.db.append_submission_log(
                    submission_id,
                    &format!("change created: {}", handle.change_url),
                )?;
                let completed = self
                    .db
                    .get_submission(submission_id)?
                    .ok_or_else(|| {
                        OrchestratorError::SubmissionNotFound(submission_id.to_string())
                    })?;
                info!(submission_id, change_id = %handle.change_id, "submission completed");
                self.notify(&completed, Stage::Completed).await;
                Ok(completed)
            }
            Err(e) => {
                warn!(submission_id, error = %e, "submission failed");
                // Reload the latest record first so the failure write does
                // not clobber log appends made during the drive. Persistence
                // failures on this path are logged, not raised over `e`.
                let latest = match self.db.get_submission(submission_id) {
                    Ok(latest) => latest,
                    Err(reload_err) => {
                        warn!(submission_id, error = %reload_err, "failed to reload submission");
                        None
                    }
                };
                let message = e.to_string();
                if let Err(persist_err) = self.db.fail_submission(submission_id, &message) {
                    warn!(submission_id, error = %persist_err, "failed to persist failure state");
                }
                let log_line =
                    format!("submission failed: {}\n{}", message, backtrace_excerpt());
                if let Err(log_err) = self.db.append_submission_log(submission_id, &log_line) {
                    warn!(submission_id, error = %log_err, "failed to append failure log");
                }
                if let Some(mut failed) = latest {
                    failed.status = SubmissionStatus::Failed;
                    failed.error = Some(message);
                    self.notify(&failed, Stage::Failed).await;
                }
                Err(e)
            }
        }
    }

    /// The fallible middle of `submit`: everything between the processing
    /// transition and the terminal write.
    async fn drive(&self, submission: &Submission) -> Result<ChangeHandle, OrchestratorError> {
        let upload = self
            .db
            .get_upload(&submission.upload_id)?
            .ok_or_else(|| OrchestratorError::UploadNotFound(submission.upload_id.clone()))?;

        if let (Some(node_id), Some(repository)) =
            (&submission.remote_node_id, &submission.git_repository)
        {
            self.stage_on_remote(submission, node_id, repository, &upload.content)
                .await?;
        }

        self.db
            .append_submission_log(&submission.id, "pushing change to code review")?;
        let request = ChangeRequest {
            project: submission.project.clone(),
            subject: submission.subject.clone(),
            description: submission.description.clone(),
            branch: submission.branch.clone(),
            patch_content: upload.content,
        };
        let handle = match with_deadline(self.push_timeout, self.gerrit.submit_change(&request))
            .await
        {
            DeadlineOutcome::Completed(result) => result?,
            DeadlineOutcome::TimedOut => {
                return Err(GerritError::Timeout {
                    timeout_secs: self.push_timeout.as_secs(),
                }
                .into())
            }
        };
        Ok(handle)
    }

    /// Run the optional remote staging workflow. Never fatal: every failure
    /// mode here is logged and absorbed, since the user may still want the
    /// patch pushed directly.
    async fn stage_on_remote(
        &self,
        submission: &Submission,
        node_id: &str,
        repository: &str,
        patch_content: &str,
    ) -> Result<(), OrchestratorError> {
        let node = match self.remote.nodes.iter().find(|n| n.id == node_id) {
            Some(node) => node.clone(),
            None => {
                warn!(node_id, "remote node not configured, skipping staging");
                self.db.append_submission_log(
                    &submission.id,
                    &format!("remote node '{}' not configured, skipping staging", node_id),
                )?;
                return Ok(());
            }
        };

        let workdir = self.resolve_workdir(&node.id, node.workdir.as_deref()).await;
        self.db.append_submission_log(
            &submission.id,
            &format!(
                "staging patch on node '{}' in {} (repo {}, branch {})",
                node.id, workdir, repository, submission.branch
            ),
        )?;

        let workflow_timeout = Duration::from_secs(self.remote.workflow_timeout_secs);
        let workflow = GitWorkflow::new(
            Arc::clone(&self.remote_executor),
            node,
            workflow_timeout,
        );
        let run = workflow.run(
            &workdir,
            repository,
            &submission.branch,
            &submission.id,
            patch_content,
        );
        match with_deadline(workflow_timeout, run).await {
            DeadlineOutcome::Completed(Ok(transcript)) => {
                for line in transcript.log_lines() {
                    self.db.append_submission_log(&submission.id, &line)?;
                }
                if !transcript.success {
                    warn!(submission_id = %submission.id, "remote workflow failed, continuing to push");
                    self.db.append_submission_log(
                        &submission.id,
                        "remote workflow failed, continuing to code-review push",
                    )?;
                }
            }
            DeadlineOutcome::Completed(Err(e)) => {
                warn!(submission_id = %submission.id, error = %e, "remote workflow error, continuing to push");
                self.db.append_submission_log(
                    &submission.id,
                    &format!("remote workflow error: {}, continuing to code-review push", e),
                )?;
            }
            DeadlineOutcome::TimedOut => {
                warn!(submission_id = %submission.id, "remote workflow timed out, continuing to push");
                self.db.append_submission_log(
                    &submission.id,
                    &format!(
                        "remote workflow timed out after {}s, continuing to code-review push",
                        self.remote.workflow_timeout_secs
                    ),
                )?;
            }
        }
        Ok(())
    }

    /// Resolve the node's working directory.
    ///
    /// Static config wins; otherwise a stored per-node setting is looked up
    /// under a short deadline, falling back to the configured default so the
    /// lookup can never block the overall flow.
    async fn resolve_workdir(&self, node_id: &str, configured: Option<&str>) -> String {
        if let Some(workdir) = configured {
            return workdir.to_string();
        }
        let db = Arc::clone(&self.db);
        let key = format!("node:{}:workdir", node_id);
        let lookup = tokio::task::spawn_blocking(move || db.get_state(&key));
        let timeout = Duration::from_secs(self.remote.metadata_timeout_secs);
        match with_deadline(timeout, lookup).await {
            DeadlineOutcome::Completed(Ok(Ok(Some(workdir)))) => workdir,
            DeadlineOutcome::Completed(Ok(Ok(None))) => self.remote.default_workdir.clone(),
            DeadlineOutcome::Completed(Ok(Err(e))) => {
                warn!(node_id, error = %e, "workdir lookup failed, using default");
                self.remote.default_workdir.clone()
            }
            DeadlineOutcome::Completed(Err(e)) => {
                warn!(node_id, error = %e, "workdir lookup task failed, using default");
                self.remote.default_workdir.clone()
            }
            DeadlineOutcome::TimedOut => {
                warn!(node_id, "workdir lookup timed out, using default");
                self.remote.default_workdir.clone()
            }
        }
    }

    async fn notify(&self, submission: &Submission, stage: Stage) {
        match self.notifier.notify_stage(submission, stage).await {
            NotifyOutcome::Failed(detail) => {
                warn!(submission_id = %submission.id, stage = %stage, detail, "notification failed");
                let _ = self.db.append_submission_log(
                    &submission.id,
                    &format!("{} notification failed: {}", stage, detail),
                );
            }
            NotifyOutcome::Delivered | NotifyOutcome::Skipped => {}
        }
    }

    // -----------------------------------------------------------------------
    // Read-only projections
    // -----------------------------------------------------------------------

    pub fn get_submission(&self, id: &str) -> Result<Option<Submission>, OrchestratorError> {
        Ok(self.db.get_submission(id)?)
    }

    /// Status projection for pollers, including the rendered log lines.
    pub fn get_submission_status(
        &self,
        id: &str,
    ) -> Result<SubmissionStatusView, OrchestratorError> {
        let submission = self
            .db
            .get_submission(id)?
            .ok_or_else(|| OrchestratorError::SubmissionNotFound(id.to_string()))?;
        let logs = self
            .db
            .get_submission_logs(id)?
            .iter()
            .map(|l| l.render())
            .collect();
        Ok(SubmissionStatusView {
            status: submission.status,
            change_id: submission.change_id,
            change_url: submission.change_url,
            created_at: submission.created_at,
            error: submission.error,
            logs,
        })
    }
}

/// First few frames of a captured backtrace, for the failure log line.
fn backtrace_excerpt() -> String {
    let backtrace = std::backtrace::Backtrace::force_capture().to_string();
    backtrace
        .lines()
        .take(8)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NotificationConfig;
    use crate::errors::RemoteError;
    use crate::models::Upload;
    use crate::remote::{CommandOutcome, CommandRequest};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeGerrit {
        fail: bool,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FakeGerrit {
        fn ok() -> Self {
            Self {
                fail: false,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn stuck() -> Self {
            Self {
                fail: false,
                delay: Duration::from_secs(3600),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CodeReviewClient for FakeGerrit {
        async fn submit_change(
            &self,
            request: &ChangeRequest,
        ) -> Result<ChangeHandle, GerritError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(GerritError::ApiError {
                    status: 500,
                    body: "internal error".into(),
                });
            }
            Ok(ChangeHandle {
                change_id: "I123abc".into(),
                change_url: format!("https://review.example.com/c/{}/+/1", request.project),
            })
        }
    }

    struct FakeRemote {
        fail: bool,
    }

    #[async_trait]
    impl RemoteExecutor for FakeRemote {
        async fn execute(&self, _request: &CommandRequest) -> Result<CommandOutcome, RemoteError> {
            if self.fail {
                return Err(RemoteError::NodeUnavailable {
                    node: "build1".into(),
                    detail: "connection refused".into(),
                });
            }
            Ok(CommandOutcome {
                success: true,
                output: String::new(),
                error: None,
            })
        }
    }

    fn orchestrator_with(
        gerrit: FakeGerrit,
        remote_fail: bool,
        push_timeout: Duration,
    ) -> (Orchestrator, Arc<Database>) {
        let db = Arc::new(Database::in_memory().unwrap());
        db.initialize().unwrap();
        let orchestrator = Orchestrator::new(
            Arc::clone(&db),
            Arc::new(gerrit),
            Arc::new(FakeRemote { fail: remote_fail }),
            Arc::new(Notifier::new(&NotificationConfig::default())),
            RemoteConfig::default(),
            push_timeout,
        );
        (orchestrator, db)
    }

    fn valid_upload(db: &Database) -> Upload {
        let upload = Upload::new(
            "fix.patch",
            "--- a/f\n+++ b/f\n@@ -1,1 +1,2 @@\n-old\n+new\n+new2\n",
            "tools/widget",
            None,
        );
        db.insert_upload(&upload).unwrap();
        upload
    }

    fn meta() -> SubmissionMeta {
        SubmissionMeta {
            subject: "Fix the widget".into(),
            description: "details".into(),
            branch: "main".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_happy_path_completes_with_change_url() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();
        assert_eq!(submission.status, SubmissionStatus::Pending);

        let done = orchestrator.submit(&submission.id).await.unwrap();
        assert_eq!(done.status, SubmissionStatus::Completed);
        assert_eq!(done.change_id.as_deref(), Some("I123abc"));
        assert!(done.change_url.as_deref().unwrap().contains("tools/widget"));

        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert!(logs.iter().any(|l| l.message.contains("processing started")));
        assert!(logs.iter().any(|l| l.message.contains("change created")));
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_submission() {
        let db = Arc::new(Database::in_memory().unwrap());
        db.initialize().unwrap();
        // Webhook on a closed local port so every delivery attempt fails
        // without leaving the host.
        let notifications = NotificationConfig {
            slack_webhook_url: Some("http://127.0.0.1:9/hooks/dead".into()),
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(
            Arc::clone(&db),
            Arc::new(FakeGerrit::ok()),
            Arc::new(FakeRemote { fail: false }),
            Arc::new(Notifier::new(&notifications)),
            RemoteConfig::default(),
            Duration::from_secs(180),
        );
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();

        let done = orchestrator.submit(&submission.id).await.unwrap();
        assert_eq!(done.status, SubmissionStatus::Completed);

        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert!(logs.iter().any(|l| l.message.contains("notification failed")));
        assert!(logs.iter().any(|l| l.message.contains("change created")));
    }

    #[tokio::test]
    async fn test_gerrit_failure_marks_failed_with_logs() {
        let (orchestrator, db) =
            orchestrator_with(FakeGerrit::failing(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();

        let err = orchestrator.submit(&submission.id).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::GerritError(_)));

        let stored = db.get_submission(&submission.id).unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Failed);
        assert!(stored.error.as_deref().unwrap().contains("500"));
        // Earlier checkpointed logs survive the failure write.
        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert!(logs.iter().any(|l| l.message.contains("processing started")));
        assert!(logs.iter().any(|l| l.message.contains("submission failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gerrit_timeout_is_fatal() {
        let (orchestrator, db) =
            orchestrator_with(FakeGerrit::stuck(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();

        let err = orchestrator.submit(&submission.id).await.unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::GerritError(GerritError::Timeout { timeout_secs: 180 })
        ));
        let stored = db.get_submission(&submission.id).unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Failed);
        assert!(stored.error.as_deref().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_unconfigured_remote_node_is_non_fatal() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let mut meta = meta();
        meta.remote_node_id = Some("nope".into());
        meta.git_repository = Some("git@host:proj.git".into());
        let submission = orchestrator.create_submission(&upload.id, meta).unwrap();

        let done = orchestrator.submit(&submission.id).await.unwrap();
        assert_eq!(done.status, SubmissionStatus::Completed);
        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert!(logs.iter().any(|l| l.message.contains("not configured")));
    }

    #[tokio::test]
    async fn test_remote_workflow_failure_still_pushes() {
        let (mut orchestrator, db) =
            orchestrator_with(FakeGerrit::ok(), true, Duration::from_secs(180));
        orchestrator.remote.nodes.push(crate::config::RemoteNodeConfig {
            id: "build1".into(),
            host: "build1.example.com".into(),
            port: 22,
            username: "ci".into(),
            auth_type: "key".into(),
            credential_env: "KEY".into(),
            workdir: Some("/srv/stage".into()),
            credential: Some("/home/ci/.ssh/id_ed25519".into()),
        });
        let upload = valid_upload(&db);
        let mut meta = meta();
        meta.remote_node_id = Some("build1".into());
        meta.git_repository = Some("git@host:proj.git".into());
        let submission = orchestrator.create_submission(&upload.id, meta).unwrap();

        let done = orchestrator.submit(&submission.id).await.unwrap();
        assert_eq!(done.status, SubmissionStatus::Completed);
        let logs = db.get_submission_logs(&submission.id).unwrap();
        assert!(logs
            .iter()
            .any(|l| l.message.contains("continuing to code-review push")));
    }

    #[tokio::test]
    async fn test_terminal_submission_cannot_be_redriven() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();
        orchestrator.submit(&submission.id).await.unwrap();

        let err = orchestrator.submit(&submission.id).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::TerminalState { .. }));
        // The fake saw exactly one push.
        let stored = db.get_submission(&submission.id).unwrap().unwrap();
        assert_eq!(stored.status, SubmissionStatus::Completed);
    }

    #[tokio::test]
    async fn test_submit_unknown_id_fails_fast() {
        let (orchestrator, _db) =
            orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let err = orchestrator.submit("missing").await.unwrap_err();
        assert!(matches!(err, OrchestratorError::SubmissionNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_submission_rejects_invalid_upload() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = Upload::new(
            "bad.patch",
            "not a diff",
            "tools/widget",
            Some("missing file headers".into()),
        );
        db.insert_upload(&upload).unwrap();

        let err = orchestrator.create_submission(&upload.id, meta()).unwrap_err();
        assert!(matches!(err, OrchestratorError::UploadInvalid { .. }));

        let err = orchestrator.create_submission("missing", meta()).unwrap_err();
        assert!(matches!(err, OrchestratorError::UploadNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_submission_requires_subject_and_branch() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let mut m = meta();
        m.subject = "  ".into();
        assert!(matches!(
            orchestrator.create_submission(&upload.id, m).unwrap_err(),
            OrchestratorError::InvalidRequest(_)
        ));
        let mut m = meta();
        m.branch = String::new();
        assert!(matches!(
            orchestrator.create_submission(&upload.id, m).unwrap_err(),
            OrchestratorError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn test_status_projection_includes_rendered_logs() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        let upload = valid_upload(&db);
        let submission = orchestrator.create_submission(&upload.id, meta()).unwrap();
        orchestrator.submit(&submission.id).await.unwrap();

        let view = orchestrator.get_submission_status(&submission.id).unwrap();
        assert_eq!(view.status, SubmissionStatus::Completed);
        assert!(view.change_url.is_some());
        assert!(view.logs.iter().any(|l| l.contains("change created")));
        assert!(view.logs[0].starts_with('['));

        assert!(matches!(
            orchestrator.get_submission_status("missing").unwrap_err(),
            OrchestratorError::SubmissionNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_workdir_lookup_prefers_stored_setting() {
        let (orchestrator, db) = orchestrator_with(FakeGerrit::ok(), false, Duration::from_secs(180));
        db.set_state("node:build1:workdir", "/srv/custom").unwrap();
        let workdir = orchestrator.resolve_workdir("build1", None).await;
        assert_eq!(workdir, "/srv/custom");

        let workdir = orchestrator.resolve_workdir("other", None).await;
        assert_eq!(workdir, orchestrator.remote.default_workdir);

        let workdir = orchestrator.resolve_workdir("build1", Some("/static")).await;
        assert_eq!(workdir, "/static");
    }
}
