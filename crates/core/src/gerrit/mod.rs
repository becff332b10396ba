//! Code-review service integration.
//!
//! The orchestrator only sees the [`CodeReviewClient`] trait; the concrete
//! [`GerritClient`] speaks Gerrit's REST dialect.

pub mod client;

use async_trait::async_trait;

use crate::errors::GerritError;

pub use client::GerritClient;

/// Everything needed to create one change on the review service.
#[derive(Debug, Clone)]
pub struct ChangeRequest {
    pub project: String,
    pub subject: String,
    pub description: String,
    pub branch: String,
    /// Raw unified-diff body to attach to the change.
    pub patch_content: String,
}

/// Identifier and browse URL of a created change.
#[derive(Debug, Clone)]
pub struct ChangeHandle {
    pub change_id: String,
    pub change_url: String,
}

/// Abstract "create change" API of the review service.
#[async_trait]
pub trait CodeReviewClient: Send + Sync {
    async fn submit_change(&self, request: &ChangeRequest) -> Result<ChangeHandle, GerritError>;
}
