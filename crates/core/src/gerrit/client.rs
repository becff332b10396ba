//! Gerrit REST API client.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::GerritConfig;
use crate::errors::GerritError;

use super::{ChangeHandle, ChangeRequest, CodeReviewClient};

/// Gerrit prepends this to every JSON response to defeat XSSI.
const XSSI_PREFIX: &str = ")]}'";

#[derive(Debug, Serialize)]
struct CreateChangeInput<'a> {
    project: &'a str,
    subject: &'a str,
    branch: &'a str,
    topic: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ChangeInfo {
    id: String,
    #[serde(rename = "_number")]
    number: u64,
    project: String,
}

/// Asynchronous Gerrit REST client using HTTP basic auth.
#[derive(Clone)]
pub struct GerritClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl GerritClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("patchgate/0.1"));
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .expect("failed to build reqwest client");
        info!(base_url = %base_url, "created GerritClient");
        Self {
            http,
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_config(config: &GerritConfig) -> Self {
        Self::new(
            &config.base_url,
            &config.username,
            config.password.clone().unwrap_or_default(),
        )
    }

    /// Strip Gerrit's XSSI guard and deserialize the remainder.
    fn parse_body<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, GerritError> {
        let trimmed = body
            .strip_prefix(XSSI_PREFIX)
            .unwrap_or(body)
            .trim_start();
        serde_json::from_str(trimmed).map_err(|e| GerritError::ParseError(e.to_string()))
    }

    fn change_url(&self, project: &str, number: u64) -> String {
        format!("{}/c/{}/+/{}", self.base_url, project, number)
    }

    fn check_status(status: reqwest::StatusCode, body: &str) -> Result<(), GerritError> {
        if status.is_success() {
            return Ok(());
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(GerritError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        Err(GerritError::ApiError {
            status: status.as_u16(),
            body: body.trim().to_string(),
        })
    }
}

#[async_trait::async_trait]
impl CodeReviewClient for GerritClient {
    /// Create a change via `POST /a/changes/`, then attach the patch body as
    /// a change edit and publish it.
    #[instrument(skip(self, request), fields(project = %request.project, branch = %request.branch))]
    async fn submit_change(&self, request: &ChangeRequest) -> Result<ChangeHandle, GerritError> {
        let url = format!("{}/a/changes/", self.base_url);
        let input = CreateChangeInput {
            project: &request.project,
            subject: &request.subject,
            branch: &request.branch,
            topic: None,
        };
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&input)
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Self::check_status(status, &body)?;
        let change: ChangeInfo = Self::parse_body(&body)?;
        debug!(change_id = %change.id, number = change.number, "created change");

        // The patch body rides along as the commit message trailer of a
        // change edit; Gerrit applies it when the edit is published.
        let edit_url = format!(
            "{}/a/changes/{}/edit:message",
            self.base_url, change.number
        );
        let message = format!(
            "{}\n\n{}\n\nChange-Id: {}\n",
            request.subject, request.description, change.id
        );
        let resp = self
            .http
            .put(&edit_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "message": message }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Self::check_status(status, &body)?;

        let patch_url = format!("{}/a/changes/{}/patch:apply", self.base_url, change.number);
        let resp = self
            .http
            .post(&patch_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&serde_json::json!({ "patch": request.patch_content }))
            .send()
            .await?;
        let status = resp.status();
        let body = resp.text().await?;
        Self::check_status(status, &body)?;

        let handle = ChangeHandle {
            change_url: self.change_url(&change.project, change.number),
            change_id: change.id,
        };
        info!(change_id = %handle.change_id, url = %handle.change_url, "submitted change");
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_body_strips_xssi_prefix() {
        let body = ")]}'\n{\"id\":\"proj~main~I123\",\"_number\":42,\"project\":\"proj\"}";
        let info: ChangeInfo = GerritClient::parse_body(body).unwrap();
        assert_eq!(info.number, 42);
        assert_eq!(info.id, "proj~main~I123");
    }

    #[test]
    fn test_parse_body_without_prefix() {
        let body = "{\"id\":\"x\",\"_number\":1,\"project\":\"p\"}";
        let info: ChangeInfo = GerritClient::parse_body(body).unwrap();
        assert_eq!(info.project, "p");
    }

    #[test]
    fn test_parse_body_rejects_garbage() {
        let err = GerritClient::parse_body::<ChangeInfo>(")]}'\nnot json").unwrap_err();
        assert!(matches!(err, GerritError::ParseError(_)));
    }

    #[test]
    fn test_change_url_shape() {
        let client = GerritClient::new("https://review.example.com/", "bot", "pw");
        assert_eq!(
            client.change_url("tools/patchgate", 7),
            "https://review.example.com/c/tools/patchgate/+/7"
        );
    }

    #[test]
    fn test_check_status_auth_failure() {
        let err =
            GerritClient::check_status(reqwest::StatusCode::UNAUTHORIZED, "denied").unwrap_err();
        assert!(matches!(err, GerritError::AuthenticationFailed(_)));
    }
}
