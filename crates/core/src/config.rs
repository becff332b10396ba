//! TOML-based configuration system for PatchGate.
//!
//! All sensitive values (passwords, tokens, API keys) are stored as `_env`
//! fields that reference environment variable names. The actual secrets are
//! resolved at runtime via [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Daemon settings.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Gerrit code-review service settings.
    pub gerrit: GerritConfig,

    /// Remote build node settings.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// AI-assist provider settings.
    #[serde(default)]
    pub ai: AiConfig,

    /// Notification settings (Slack, email).
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Web server settings.
    #[serde(default)]
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (database).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/patchgate")
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Gerrit
// ---------------------------------------------------------------------------

/// Gerrit connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GerritConfig {
    /// Gerrit base URL (e.g. `https://review.example.com`).
    pub base_url: String,

    /// HTTP username for the REST API.
    pub username: String,

    /// Environment variable holding the HTTP password / token.
    pub password_env: String,

    /// Deadline for the code-review push, in seconds (default 180).
    #[serde(default = "default_push_timeout")]
    pub push_timeout_secs: u64,

    /// Resolved password (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub password: Option<String>,
}

fn default_push_timeout() -> u64 {
    180
}

// ---------------------------------------------------------------------------
// Remote nodes
// ---------------------------------------------------------------------------

/// Remote build node pool and git-workflow deadlines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Configured build nodes, addressable by id from submissions.
    #[serde(default)]
    pub nodes: Vec<RemoteNodeConfig>,

    /// Deadline for the entire remote git workflow, in seconds (default 600).
    #[serde(default = "default_workflow_timeout")]
    pub workflow_timeout_secs: u64,

    /// Deadline for the node working-directory metadata lookup, in seconds
    /// (default 2).
    #[serde(default = "default_metadata_timeout")]
    pub metadata_timeout_secs: u64,

    /// Working directory used when a node's own setting cannot be resolved.
    #[serde(default = "default_workdir")]
    pub default_workdir: String,
}

fn default_workflow_timeout() -> u64 {
    600
}
fn default_metadata_timeout() -> u64 {
    2
}
fn default_workdir() -> String {
    "/tmp/patchgate".into()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            workflow_timeout_secs: default_workflow_timeout(),
            metadata_timeout_secs: default_metadata_timeout(),
            default_workdir: default_workdir(),
        }
    }
}

/// A single remote build node reachable over SSH.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteNodeConfig {
    /// Identifier referenced by submission requests.
    pub id: String,

    pub host: String,

    #[serde(default = "default_ssh_port")]
    pub port: u16,

    pub username: String,

    /// `key` (identity file path in `credential_env`) or `password`.
    #[serde(default = "default_auth_type")]
    pub auth_type: String,

    /// Environment variable holding the credential (key path or password).
    pub credential_env: String,

    /// Preferred working directory on this node, if configured statically.
    #[serde(default)]
    pub workdir: Option<String>,

    /// Resolved credential (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub credential: Option<String>,
}

fn default_ssh_port() -> u16 {
    22
}
fn default_auth_type() -> String {
    "key".into()
}

// ---------------------------------------------------------------------------
// AI providers
// ---------------------------------------------------------------------------

/// AI-assist configuration: an ordered list of providers.
///
/// Provider order matters: the multi-provider fan-out breaks confidence ties
/// by declaration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// Master switch for AI-assisted conflict resolution.
    #[serde(default)]
    pub enabled: bool,

    /// Deadline per provider call, in seconds (default 60).
    #[serde(default = "default_ai_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

fn default_ai_timeout() -> u64 {
    60
}

/// One AI provider endpoint (chat-completions style API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name referenced by resolve requests (e.g. `openai`).
    pub name: String,

    /// Chat-completions endpoint URL.
    pub api_url: String,

    /// Model identifier sent with each request.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Resolved API key (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Notification channel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Slack incoming-webhook URL.
    #[serde(default)]
    pub slack_webhook_url: Option<String>,

    /// SMTP server as `host:port`.
    #[serde(default)]
    pub email_smtp: Option<String>,

    /// From address for notification emails.
    #[serde(default)]
    pub email_from: Option<String>,
}

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Maximum upload body size in bytes (default 10 MiB).
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}
fn default_max_upload() -> usize {
    10 * 1024 * 1024
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading / resolution / validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let text = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `_env` secret references into their runtime values.
    ///
    /// Missing variables for optional subsystems (AI providers, remote nodes)
    /// produce a warning and disable that entry; the Gerrit password is
    /// required.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        self.gerrit.password = Some(std::env::var(&self.gerrit.password_env).map_err(|_| {
            ConfigError::EnvVarMissing {
                var: self.gerrit.password_env.clone(),
                field: "gerrit.password_env".into(),
            }
        })?);

        for node in &mut self.remote.nodes {
            match std::env::var(&node.credential_env) {
                Ok(v) => node.credential = Some(v),
                Err(_) => {
                    warn!(
                        node = %node.id,
                        var = %node.credential_env,
                        "remote node credential variable not set; node disabled"
                    );
                }
            }
        }

        for provider in &mut self.ai.providers {
            match std::env::var(&provider.api_key_env) {
                Ok(v) => provider.api_key = Some(v),
                Err(_) => {
                    warn!(
                        provider = %provider.name,
                        var = %provider.api_key_env,
                        "provider API key variable not set; provider disabled"
                    );
                }
            }
        }

        Ok(())
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gerrit.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "gerrit.base_url".into(),
                detail: "must not be empty".into(),
            });
        }
        if !self.gerrit.base_url.starts_with("http://")
            && !self.gerrit.base_url.starts_with("https://")
        {
            return Err(ConfigError::InvalidValue {
                field: "gerrit.base_url".into(),
                detail: "must be an http(s) URL".into(),
            });
        }
        if self.gerrit.push_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "gerrit.push_timeout_secs".into(),
                detail: "must be greater than zero".into(),
            });
        }

        let mut seen = std::collections::HashSet::new();
        for node in &self.remote.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "remote.nodes".into(),
                    detail: format!("duplicate node id '{}'", node.id),
                });
            }
            if node.auth_type != "key" && node.auth_type != "password" {
                return Err(ConfigError::InvalidValue {
                    field: format!("remote.nodes[{}].auth_type", node.id),
                    detail: format!("'{}' is not 'key' or 'password'", node.auth_type),
                });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for provider in &self.ai.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "ai.providers".into(),
                    detail: format!("duplicate provider name '{}'", provider.name),
                });
            }
        }

        Ok(())
    }

    /// Look up a configured remote node by id.
    pub fn remote_node(&self, id: &str) -> Option<&RemoteNodeConfig> {
        self.remote.nodes.iter().find(|n| n.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [gerrit]
            base_url = "https://review.example.com"
            username = "bot"
            password_env = "GERRIT_PASSWORD"
        "#
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: AppConfig = toml::from_str(minimal_toml()).unwrap();
        assert_eq!(config.gerrit.username, "bot");
        assert_eq!(config.gerrit.push_timeout_secs, 180);
        assert_eq!(config.remote.workflow_timeout_secs, 600);
        assert_eq!(config.remote.metadata_timeout_secs, 2);
        assert_eq!(config.web.listen, "0.0.0.0:8080");
        assert!(!config.ai.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_text = r#"
            [daemon]
            log_level = "debug"
            data_dir = "/tmp/pg"

            [gerrit]
            base_url = "https://review.example.com"
            username = "bot"
            password_env = "GERRIT_PASSWORD"
            push_timeout_secs = 60

            [remote]
            workflow_timeout_secs = 120
            default_workdir = "/srv/stage"

            [[remote.nodes]]
            id = "build-1"
            host = "build1.example.com"
            username = "ci"
            credential_env = "BUILD1_KEY"
            workdir = "/srv/build1"

            [ai]
            enabled = true
            request_timeout_secs = 30

            [[ai.providers]]
            name = "openai"
            api_url = "https://api.openai.com/v1/chat/completions"
            model = "gpt-4o"
            api_key_env = "OPENAI_API_KEY"

            [[ai.providers]]
            name = "anthropic"
            api_url = "https://api.anthropic.com/v1/chat/completions"
            model = "claude-sonnet"
            api_key_env = "ANTHROPIC_API_KEY"

            [notifications]
            slack_webhook_url = "https://hooks.slack.com/services/X"

            [web]
            listen = "127.0.0.1:9090"
        "#;
        let config: AppConfig = toml::from_str(toml_text).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.remote.nodes.len(), 1);
        assert_eq!(config.remote.nodes[0].port, 22);
        assert_eq!(config.remote.nodes[0].auth_type, "key");
        assert_eq!(config.ai.providers.len(), 2);
        assert_eq!(config.ai.providers[0].name, "openai");
        assert!(config.remote_node("build-1").is_some());
        assert!(config.remote_node("nope").is_none());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config: AppConfig = toml::from_str(minimal_toml()).unwrap();
        config.gerrit.base_url = "review.example.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_provider() {
        let mut config: AppConfig = toml::from_str(minimal_toml()).unwrap();
        for _ in 0..2 {
            config.ai.providers.push(ProviderConfig {
                name: "openai".into(),
                api_url: "https://x".into(),
                model: "m".into(),
                api_key_env: "K".into(),
                api_key: None,
            });
        }
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_auth_type() {
        let mut config: AppConfig = toml::from_str(minimal_toml()).unwrap();
        config.remote.nodes.push(RemoteNodeConfig {
            id: "n1".into(),
            host: "h".into(),
            port: 22,
            username: "u".into(),
            auth_type: "kerberos".into(),
            credential_env: "C".into(),
            workdir: None,
            credential: None,
        });
        assert!(config.validate().is_err());
    }
}
