//! Remote git staging workflow.

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use tracing::{info, instrument, warn};

use crate::config::RemoteNodeConfig;
use crate::errors::RemoteError;

use super::{CommandOutcome, CommandRequest, RemoteAuth, RemoteExecutor};

/// One executed workflow step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: &'static str,
    pub success: bool,
    pub detail: String,
}

/// Ordered record of the steps a workflow ran.
///
/// `success` is true only when every step succeeded; a failed step is the
/// last entry (the workflow stops there).
#[derive(Debug, Clone, Default)]
pub struct WorkflowTranscript {
    pub steps: Vec<StepRecord>,
    pub success: bool,
}

impl WorkflowTranscript {
    /// Human-readable lines for the submission log.
    pub fn log_lines(&self) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| {
                if s.success {
                    format!("remote {}: ok", s.name)
                } else {
                    format!("remote {}: FAILED: {}", s.name, s.detail)
                }
            })
            .collect()
    }
}

/// Drives clone, checkout, apply, status on a remote node.
pub struct GitWorkflow {
    executor: Arc<dyn RemoteExecutor>,
    node: RemoteNodeConfig,
    step_timeout: Duration,
}

impl GitWorkflow {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        node: RemoteNodeConfig,
        step_timeout: Duration,
    ) -> Self {
        Self {
            executor,
            node,
            step_timeout,
        }
    }

    fn auth(&self) -> Result<RemoteAuth, RemoteError> {
        match self.node.auth_type.as_str() {
            "key" => Ok(RemoteAuth::Key(
                self.node.credential.clone().unwrap_or_default(),
            )),
            other => Err(RemoteError::UnsupportedAuth {
                node: self.node.id.clone(),
                auth_type: other.to_string(),
            }),
        }
    }

    async fn run_step(
        &self,
        name: &'static str,
        command: String,
    ) -> Result<(StepRecord, CommandOutcome), RemoteError> {
        let request = CommandRequest {
            host: self.node.host.clone(),
            port: self.node.port,
            username: self.node.username.clone(),
            auth: self.auth()?,
            command,
            timeout: self.step_timeout,
        };
        let outcome = self.executor.execute(&request).await?;
        let record = StepRecord {
            name,
            success: outcome.success,
            detail: if outcome.success {
                String::new()
            } else {
                outcome.error.clone().unwrap_or_else(|| "unknown".into())
            },
        };
        Ok((record, outcome))
    }

    /// Stage the patch on the remote node.
    ///
    /// Runs clone, checkout, apply, status in order, stopping at the first
    /// failed step. Transport-level errors (unreachable node, ssh missing,
    /// per-command timeout) are returned as `Err`; a step merely exiting
    /// non-zero is recorded in the transcript instead.
    #[instrument(skip(self, patch_content), fields(node = %self.node.id, repo = repository, branch))]
    pub async fn run(
        &self,
        workdir: &str,
        repository: &str,
        branch: &str,
        job_id: &str,
        patch_content: &str,
    ) -> Result<WorkflowTranscript, RemoteError> {
        let checkout_dir = format!("{}/patchgate-{}", workdir.trim_end_matches('/'), job_id);
        let mut transcript = WorkflowTranscript::default();

        let steps: Vec<(&'static str, String)> = vec![
            (
                "clone",
                format!(
                    "rm -rf '{dir}' && git clone '{repo}' '{dir}'",
                    dir = checkout_dir,
                    repo = repository
                ),
            ),
            (
                "checkout",
                format!(
                    "cd '{dir}' && git checkout '{branch}'",
                    dir = checkout_dir,
                    branch = branch
                ),
            ),
            (
                "apply",
                // The patch rides over the wire base64-encoded so quoting
                // and line endings survive the shell intact.
                format!(
                    "cd '{dir}' && echo '{b64}' | base64 -d | git apply --whitespace=nowarn -",
                    dir = checkout_dir,
                    b64 = BASE64.encode(patch_content)
                ),
            ),
            (
                "status",
                format!("cd '{dir}' && git status --short", dir = checkout_dir),
            ),
        ];

        for (name, command) in steps {
            let (record, outcome) = self.run_step(name, command).await?;
            let ok = record.success;
            if ok {
                info!(step = name, "workflow step completed");
            } else {
                warn!(step = name, error = ?outcome.error, "workflow step failed");
            }
            transcript.steps.push(record);
            if !ok {
                transcript.success = false;
                return Ok(transcript);
            }
        }

        transcript.success = true;
        Ok(transcript)
    }
}
