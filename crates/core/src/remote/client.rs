//! SSH-backed remote executor.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::deadline::with_deadline;
use crate::errors::RemoteError;

use super::{CommandOutcome, CommandRequest, RemoteAuth, RemoteExecutor};

/// Executes remote commands by shelling out to the `ssh` binary.
///
/// Only key-based auth is supported; password auth would require a pty or
/// sshpass and is rejected up front.
#[derive(Debug, Clone, Default)]
pub struct SshExecutor;

impl SshExecutor {
    pub fn new() -> Self {
        Self
    }

    fn build_command(request: &CommandRequest) -> Result<Command, RemoteError> {
        let identity = match &request.auth {
            RemoteAuth::Key(path) => path.clone(),
            RemoteAuth::Password => {
                return Err(RemoteError::UnsupportedAuth {
                    node: request.host.clone(),
                    auth_type: "password".into(),
                })
            }
        };
        let mut cmd = Command::new("ssh");
        cmd.arg("-i")
            .arg(identity)
            .arg("-p")
            .arg(request.port.to_string())
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("StrictHostKeyChecking=accept-new")
            .arg("-o")
            .arg(format!(
                "ConnectTimeout={}",
                request.timeout.as_secs().clamp(1, 30)
            ))
            .arg(format!("{}@{}", request.username, request.host))
            .arg(&request.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        Ok(cmd)
    }
}

#[async_trait::async_trait]
impl RemoteExecutor for SshExecutor {
    async fn execute(&self, request: &CommandRequest) -> Result<CommandOutcome, RemoteError> {
        let mut cmd = Self::build_command(request)?;
        debug!(host = %request.host, command = %request.command, "running remote command");

        let output = with_deadline(request.timeout, cmd.output())
            .await
            .or_timeout(|| {
                warn!(host = %request.host, "remote command timed out");
                RemoteError::Timeout {
                    timeout_secs: request.timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    RemoteError::NodeUnavailable {
                        node: request.host.clone(),
                        detail: "ssh binary not found".into(),
                    }
                } else {
                    RemoteError::IoError(e)
                }
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        if output.status.success() {
            Ok(CommandOutcome {
                success: true,
                output: stdout,
                error: None,
            })
        } else {
            // ssh exits 255 when the connection itself failed, as opposed to
            // the remote command exiting non-zero.
            if output.status.code() == Some(255) {
                return Err(RemoteError::NodeUnavailable {
                    node: request.host.clone(),
                    detail: stderr.trim().to_string(),
                });
            }
            warn!(
                host = %request.host,
                exit_code = output.status.code().unwrap_or(-1),
                "remote command exited non-zero"
            );
            Ok(CommandOutcome {
                success: false,
                output: stdout,
                error: Some(stderr.trim().to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request(auth: RemoteAuth) -> CommandRequest {
        CommandRequest {
            host: "build1.example.com".into(),
            port: 22,
            username: "ci".into(),
            auth,
            command: "git status".into(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_password_auth_rejected() {
        let err = SshExecutor::build_command(&request(RemoteAuth::Password)).unwrap_err();
        assert!(matches!(err, RemoteError::UnsupportedAuth { .. }));
    }

    #[test]
    fn test_key_auth_builds_command() {
        let cmd = SshExecutor::build_command(&request(RemoteAuth::Key(
            "/home/ci/.ssh/id_ed25519".into(),
        )))
        .unwrap();
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(args.contains(&"ci@build1.example.com".to_string()));
        assert!(args.contains(&"git status".to_string()));
        assert!(args.contains(&"/home/ci/.ssh/id_ed25519".to_string()));
    }
}
