//! HTTP client for chat-completions style AI provider APIs.
//!
//! The provider is asked to return a strict JSON object describing the
//! proposed resolution. Responses are decoded into typed structs once, at
//! this boundary; nothing loosely-shaped leaks into the engine. A reply the
//! model failed to format as JSON is still usable: the raw text becomes the
//! resolved body with reduced confidence and a manual-review suggestion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::{ProviderClient, ResolveRequest};
use crate::config::ProviderConfig;
use crate::errors::ProviderError;
use crate::models::Resolution;

const SYSTEM_PROMPT: &str = r#"You are a merge-conflict resolution assistant.
You are given three versions of one file: ORIGINAL (common base), INCOMING
(patch side), and CURRENT (working tree side). Produce a single merged file
body that preserves the intent of both sides.

Respond with ONLY a JSON object of this exact shape, no markdown fences:
{
  "resolved_code": "<the full merged file body>",
  "explanation": "<one or two sentences on how the sides were combined>",
  "confidence": <number between 0 and 1>,
  "suggestions": ["<optional follow-up advice>"]
}"#;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageContent,
}

#[derive(Deserialize)]
struct ChatMessageContent {
    content: String,
}

/// The JSON payload the model is instructed to return.
#[derive(Deserialize)]
struct ResolutionPayload {
    resolved_code: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    suggestions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// One provider endpoint speaking the chat-completions protocol.
pub struct HttpProviderClient {
    name: String,
    http: reqwest::Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl HttpProviderClient {
    /// Build a client from config; returns `None` when the API key did not
    /// resolve (the provider is then skipped by the registry).
    pub fn from_config(config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        Some(Self {
            name: config.name.clone(),
            http: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    async fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                provider: self.name.clone(),
                status,
                body,
            });
        }

        let chat: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ParseError {
                    provider: self.name.clone(),
                    detail: e.to_string(),
                })?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::ParseError {
                provider: self.name.clone(),
                detail: "response contained no choices".into(),
            })
    }

    /// Decode the model's reply into a [`Resolution`].
    fn decode_reply(&self, reply: &str) -> Resolution {
        let trimmed = strip_code_fences(reply);
        match serde_json::from_str::<ResolutionPayload>(trimmed) {
            Ok(payload) => Resolution::new(
                payload.resolved_code,
                payload.explanation,
                payload.confidence,
                payload.suggestions,
                false,
            ),
            Err(e) => {
                warn!(provider = %self.name, error = %e, "provider reply was not valid JSON");
                Resolution::new(
                    trimmed.to_string(),
                    "provider returned unstructured text".into(),
                    0.5,
                    vec!["review the unstructured provider output manually".into()],
                    true,
                )
            }
        }
    }
}

/// Strip a single surrounding markdown code fence, if present.
fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the fence line.
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(skip(self, request), fields(provider = %self.name, path = %request.file_path))]
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ProviderError> {
        let user_prompt = format!(
            "File: {}\n\n<<<<<<< ORIGINAL\n{}\n||||||| INCOMING\n{}\n>>>>>>> CURRENT\n{}\n",
            request.file_path, request.original, request.incoming, request.current
        );

        debug!(bytes = user_prompt.len(), "sending resolve request");
        let reply = self.chat(SYSTEM_PROMPT, &user_prompt, 8192).await?;
        Ok(self.decode_reply(&reply))
    }

    async fn probe(&self) -> Result<(), ProviderError> {
        // A minimal one-token request; any well-formed reply counts.
        self.chat("Reply with the single word: ok", "ping", 8)
            .await
            .map(|_| ())
    }
}
