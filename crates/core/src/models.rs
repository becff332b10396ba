//! Domain model types used throughout PatchGate.
//!
//! These types bridge the orchestrator, database layer, and web API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// Validation outcome recorded on an upload.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

impl ValidationStatus {
    /// Parse a stored status string.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "valid" => Self::Valid,
            _ => Self::Invalid,
        }
    }
}

impl std::fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "valid"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// A validated (or rejected) patch file body.
///
/// Immutable once the validation status is set: uploads are created once and
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Upload {
    pub id: String,
    pub filename: String,
    /// Raw unified-diff text.
    pub content: String,
    pub project: String,
    pub validation_status: ValidationStatus,
    pub validation_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Upload {
    /// Create a new upload with a fresh UUID and the given validation outcome.
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<String>,
        project: impl Into<String>,
        validation_error: Option<String>,
    ) -> Self {
        let status = if validation_error.is_none() {
            ValidationStatus::Valid
        } else {
            ValidationStatus::Invalid
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            content: content.into(),
            project: project.into(),
            validation_status: status,
            validation_error,
            created_at: Utc::now(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validation_status == ValidationStatus::Valid
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Lifecycle status of a submission.
///
/// Transitions are monotonic: pending -> processing -> completed | failed.
/// Terminal states are final.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl SubmissionStatus {
    /// Whether the status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Parse a stored status string.
    pub fn from_str_val(s: &str) -> Self {
        match s {
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// The stateful record tracking one attempt to land a patch.
///
/// Mutated only by the orchestrator task that owns its id (single-writer
/// discipline; see the orchestrator docs). Log lines live in a separate
/// append-only table and are not part of this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub upload_id: String,
    pub project: String,
    pub subject: String,
    pub description: String,
    pub branch: String,
    pub status: SubmissionStatus,
    pub change_id: Option<String>,
    pub change_url: Option<String>,
    pub error: Option<String>,
    pub notification_emails: Vec<String>,
    /// Remote node to stage the patch on, if any.
    pub remote_node_id: Option<String>,
    /// Git repository URL for the remote staging workflow.
    pub git_repository: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single timestamped log line attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionLogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl SubmissionLogLine {
    /// Render as the `[ts] message` form used in status responses.
    pub fn render(&self) -> String {
        format!("[{}] {}", self.timestamp.to_rfc3339(), self.message)
    }
}

/// Read-only projection of a submission for status pollers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionStatusView {
    pub status: SubmissionStatus,
    pub change_id: Option<String>,
    pub change_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub error: Option<String>,
    pub logs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Conflict resolution
// ---------------------------------------------------------------------------

/// A candidate merged file body plus metadata from an AI-assist provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub resolved_code: String,
    pub explanation: String,
    /// Always clamped to [0, 1].
    pub confidence: f64,
    pub suggestions: Vec<String>,
    pub requires_manual_review: bool,
}

impl Resolution {
    /// Build a resolution, clamping confidence into [0, 1].
    pub fn new(
        resolved_code: String,
        explanation: String,
        confidence: f64,
        suggestions: Vec<String>,
        requires_manual_review: bool,
    ) -> Self {
        Self {
            resolved_code,
            explanation,
            confidence: confidence.clamp(0.0, 1.0),
            suggestions,
            requires_manual_review,
        }
    }

    /// Synthesized resolution for a failed provider call.
    ///
    /// Carries zero confidence and a manual-review flag; the provider's
    /// failure reason goes in the suggestions so a human can see what
    /// happened.
    pub fn manual_fallback(reason: impl std::fmt::Display) -> Self {
        Self {
            resolved_code: String::new(),
            explanation: "automatic resolution unavailable".to_string(),
            confidence: 0.0,
            suggestions: vec![format!(
                "resolve the conflict manually ({})",
                reason
            )],
            requires_manual_review: true,
        }
    }
}

/// A resolution paired with the provider that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResolution {
    pub provider: String,
    pub resolution: Resolution,
}

/// Outcome of a multi-provider fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionPick {
    pub best_resolution: Resolution,
    pub recommended_provider: String,
    /// Every provider's result, in provider enumeration order.
    pub candidates: Vec<ProviderResolution>,
}

/// Result of the post-hoc resolution quality check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionCheck {
    pub valid: bool,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Result of probing one provider's connectivity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderProbe {
    pub provider: String,
    pub success: bool,
    pub latency_ms: u64,
    pub error: Option<String>,
}
