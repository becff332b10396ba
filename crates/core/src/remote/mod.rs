//! Remote node command execution.
//!
//! Remote hosts are reachable only through the abstract [`RemoteExecutor`]
//! API; the concrete [`SshExecutor`] shells out to the `ssh` binary. The
//! [`GitWorkflow`] on top drives the staging sequence (clone, checkout,
//! apply, status) and records a per-step transcript for the submission log.

pub mod client;
pub mod workflow;

use async_trait::async_trait;
use std::time::Duration;

use crate::errors::RemoteError;

pub use client::SshExecutor;
pub use workflow::{GitWorkflow, StepRecord, WorkflowTranscript};

/// How to authenticate against a remote node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteAuth {
    /// SSH identity file at the given path.
    Key(String),
    Password,
}

/// One command to run on a remote host.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub auth: RemoteAuth,
    pub command: String,
    pub timeout: Duration,
}

/// Result of one remote command.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

/// Abstract command-execution API for remote nodes.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutcome, RemoteError>;
}
