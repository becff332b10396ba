//! Comprehensive error types for the PatchGate core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Gerrit(#[from] GerritError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Notification(#[from] NotificationError),
}

// ---------------------------------------------------------------------------
// Patch validation errors
// ---------------------------------------------------------------------------

/// Errors from unified-diff validation.
///
/// These are user-input errors: they are never retried and must be corrected
/// by the submitter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// The text lacks the `---` / `+++` file header pair.
    #[error("invalid patch: missing '---'/'+++' file header lines")]
    MissingFileHeaders,

    /// No `@@` hunk header was found anywhere in the patch.
    #[error("invalid patch: no hunk headers ('@@ -a,b +c,d @@') found")]
    NoHunks,

    /// A hunk header line does not match the unified-diff grammar.
    #[error("invalid hunk header at line {line}: '{text}'")]
    MalformedHunkHeader { line: usize, text: String },

    /// A line inside a hunk does not start with ' ', '+', '-', or '\'.
    #[error("invalid hunk content at line {line}: '{text}'")]
    MalformedHunkLine { line: usize, text: String },

    /// A hunk contains no added or removed lines.
    #[error("no-op hunk at line {line}: hunk contains no '+' or '-' lines")]
    NoOpHunk { line: usize },
}

// ---------------------------------------------------------------------------
// AI provider errors
// ---------------------------------------------------------------------------

/// Errors from AI-assist provider calls.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider with the requested name is configured.
    #[error("unknown AI provider: {0}")]
    UnknownProvider(String),

    /// No providers are configured at all.
    #[error("no AI providers are configured")]
    NoneConfigured,

    /// HTTP-level transport error (network, TLS, etc.).
    #[error("provider HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The provider API returned a non-success status code.
    #[error("provider '{provider}' API error (HTTP {status}): {body}")]
    ApiError {
        provider: String,
        status: u16,
        body: String,
    },

    /// The provider response could not be decoded.
    #[error("provider '{provider}' response parse error: {detail}")]
    ParseError { provider: String, detail: String },

    /// The call exceeded its deadline.
    #[error("provider '{provider}' timed out after {timeout_secs}s")]
    Timeout { provider: String, timeout_secs: u64 },
}

// ---------------------------------------------------------------------------
// Code-review (Gerrit) errors
// ---------------------------------------------------------------------------

/// Errors from the Gerrit REST client.
#[derive(Debug, Error)]
pub enum GerritError {
    /// HTTP-level transport error.
    #[error("Gerrit HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The API returned a non-success status code.
    #[error("Gerrit API error (HTTP {status}): {body}")]
    ApiError { status: u16, body: String },

    /// Credentials were rejected.
    #[error("Gerrit authentication failed: {0}")]
    AuthenticationFailed(String),

    /// JSON deserialization failure (after XSSI prefix stripping).
    #[error("Gerrit response parse error: {0}")]
    ParseError(String),

    /// The push exceeded its deadline. Terminal for the submission.
    #[error("Gerrit push timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

// ---------------------------------------------------------------------------
// Remote execution errors
// ---------------------------------------------------------------------------

/// Errors from the remote command-execution subsystem.
///
/// All of these are absorbed by the orchestrator: a failed or timed-out
/// remote git workflow is logged and the submission proceeds to the
/// code-review push regardless.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Could not reach or authenticate against the remote node.
    #[error("remote node '{node}' unavailable: {detail}")]
    NodeUnavailable { node: String, detail: String },

    /// A remote command exited with a non-zero status.
    #[error("remote command failed on step '{step}': {detail}")]
    StepFailed { step: String, detail: String },

    /// The requested node id is not configured.
    #[error("remote node not configured: {0}")]
    NodeNotConfigured(String),

    /// The auth mechanism requested for the node is not supported.
    #[error("unsupported auth type '{auth_type}' for node '{node}'")]
    UnsupportedAuth { node: String, auth_type: String },

    /// The workflow exceeded its deadline.
    #[error("remote git workflow timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Generic I/O wrapper (spawning ssh, etc.).
    #[error("remote I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Orchestrator errors
// ---------------------------------------------------------------------------

/// Errors from the submission orchestrator.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The submission id does not exist.
    #[error("submission not found: {0}")]
    SubmissionNotFound(String),

    /// The referenced upload does not exist.
    #[error("upload not found: {0}")]
    UploadNotFound(String),

    /// The referenced upload failed validation and cannot be submitted.
    #[error("upload {id} is invalid: {detail}")]
    UploadInvalid { id: String, detail: String },

    /// A state-mutating call was made against a terminal submission.
    #[error("submission {id} is already {status} and cannot transition")]
    TerminalState { id: String, status: String },

    /// A required submission field was missing or empty.
    #[error("invalid submission request: {0}")]
    InvalidRequest(String),

    /// Gerrit push failure (including timeout). Terminal.
    #[error("code-review push failed: {0}")]
    GerritError(#[from] GerritError),

    /// Database error during orchestration.
    #[error("orchestrator database error: {0}")]
    DatabaseError(#[from] DatabaseError),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (referenced by config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed { version: u32, detail: String },

    /// A record was not found.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A stored column could not be decoded into its model type.
    #[error("corrupt {entity} record {id}: {detail}")]
    CorruptRecord {
        entity: String,
        id: String,
        detail: String,
    },

    /// Generic I/O error (e.g. file permissions).
    #[error("database I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Notification errors
// ---------------------------------------------------------------------------

/// Errors from the notification subsystem (Slack, email).
///
/// Notification is advisory: these errors never propagate out of the
/// orchestrator, they are only recorded.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// Slack webhook delivery failed.
    #[error("Slack notification failed: {0}")]
    SlackError(String),

    /// Email delivery failed.
    #[error("email notification failed: {0}")]
    EmailError(String),

    /// HTTP error during notification delivery.
    #[error("notification HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}
