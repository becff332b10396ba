//! AI-assisted conflict resolution engine.
//!
//! Wraps the provider registry with the pipeline's resolution policy:
//! single-provider calls never fail outward (failures synthesize a
//! zero-confidence manual-review resolution), the multi-provider fan-out
//! isolates every call and joins all of them before picking a winner, and
//! [`ResolutionEngine::validate_resolution`] offers a non-blocking post-hoc
//! quality check.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::deadline::{with_deadline, DeadlineOutcome};
use crate::errors::ProviderError;
use crate::models::{ProviderResolution, Resolution, ResolutionCheck, ResolutionPick};
use crate::providers::{ProviderClient, ProviderRegistry, ResolveRequest};

/// Fraction of original lines that must survive into the resolved body
/// before the quality check stops suggesting a manual review.
const CONTENT_PRESERVATION_THRESHOLD: f64 = 0.5;

/// Conflict resolution engine over the configured provider registry.
pub struct ResolutionEngine {
    providers: Arc<ProviderRegistry>,
    request_timeout: Duration,
}

impl ResolutionEngine {
    pub fn new(providers: Arc<ProviderRegistry>, request_timeout: Duration) -> Self {
        Self {
            providers,
            request_timeout,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.providers
    }

    // -----------------------------------------------------------------------
    // Single provider
    // -----------------------------------------------------------------------

    /// Ask one named provider for a resolution.
    ///
    /// This never fails outward: an unknown provider, a provider error, or a
    /// deadline expiry all synthesize a zero-confidence resolution flagged
    /// for manual review, with the reason in the suggestions.
    #[instrument(skip(self, request), fields(provider = provider_name, path = %request.file_path))]
    pub async fn resolve_with_provider(
        &self,
        provider_name: &str,
        request: &ResolveRequest,
    ) -> Resolution {
        let client = match self.providers.get(provider_name) {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "provider lookup failed");
                return Resolution::manual_fallback(e);
            }
        };
        call_provider(client, request.clone(), self.request_timeout).await
    }

    // -----------------------------------------------------------------------
    // Multi-provider fan-out
    // -----------------------------------------------------------------------

    /// Fan out to every configured provider concurrently and pick a winner.
    ///
    /// Each call runs in its own task with its own deadline; one provider's
    /// failure or timeout never cancels the others, and all calls are joined
    /// before selection (a fast reply is not necessarily a confident one).
    ///
    /// Selection: highest confidence among resolutions not flagged for
    /// manual review, ties broken by provider configuration order. When no
    /// candidate qualifies, the first provider's result is returned so the
    /// caller still gets the failure explanation.
    pub async fn resolve_with_multiple_providers(
        &self,
        request: &ResolveRequest,
    ) -> Result<ResolutionPick, ProviderError> {
        let clients = self.providers.clients();
        if clients.is_empty() {
            return Err(ProviderError::NoneConfigured);
        }

        info!(
            providers = clients.len(),
            path = %request.file_path,
            "fanning out conflict resolution"
        );

        let mut handles = Vec::with_capacity(clients.len());
        for client in clients {
            let client = Arc::clone(client);
            let request = request.clone();
            let timeout = self.request_timeout;
            let name = client.name().to_string();
            handles.push((
                name,
                tokio::spawn(async move { call_provider(client, request, timeout).await }),
            ));
        }

        // Join in configuration order so the tie-break below is stable.
        let mut candidates = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            let resolution = match handle.await {
                Ok(resolution) => resolution,
                Err(e) => {
                    warn!(provider = %name, error = %e, "provider task aborted");
                    Resolution::manual_fallback(format!("provider task failed: {}", e))
                }
            };
            candidates.push(ProviderResolution {
                provider: name,
                resolution,
            });
        }

        let pick = select_best(&candidates);
        debug!(
            recommended = %pick.recommended_provider,
            confidence = pick.best_resolution.confidence,
            "selected resolution"
        );
        Ok(pick)
    }

    // -----------------------------------------------------------------------
    // Post-hoc quality check
    // -----------------------------------------------------------------------

    /// Heuristic check of a resolved body against the original.
    ///
    /// Only an empty result is invalid. Unbalanced brackets become issues,
    /// poor content preservation becomes a manual-review suggestion; neither
    /// refuses the resolution.
    pub fn validate_resolution(&self, resolved: &str, original: &str) -> ResolutionCheck {
        let mut issues = Vec::new();
        let mut suggestions = Vec::new();

        if resolved.trim().is_empty() {
            return ResolutionCheck {
                valid: false,
                issues: vec!["resolved code is empty".into()],
                suggestions: vec!["resolve the conflict manually".into()],
            };
        }

        for (open, close, label) in [('{', '}', "braces"), ('(', ')', "parentheses"), ('[', ']', "brackets")] {
            let opens = resolved.matches(open).count();
            let closes = resolved.matches(close).count();
            if opens != closes {
                issues.push(format!(
                    "unbalanced {}: {} opening vs {} closing",
                    label, opens, closes
                ));
            }
        }

        if content_preservation(resolved, original) < CONTENT_PRESERVATION_THRESHOLD {
            suggestions.push(
                "less than half of the original content survived; review the resolution manually"
                    .into(),
            );
        }

        ResolutionCheck {
            valid: true,
            issues,
            suggestions,
        }
    }
}

/// Call one provider under a deadline, mapping every failure mode into a
/// synthesized manual-review resolution.
async fn call_provider(
    client: Arc<dyn ProviderClient>,
    request: ResolveRequest,
    timeout: Duration,
) -> Resolution {
    let name = client.name().to_string();
    match with_deadline(timeout, client.resolve(&request)).await {
        DeadlineOutcome::Completed(Ok(resolution)) => {
            // Re-clamp: trait implementations are not obliged to use the
            // clamping constructor.
            Resolution::new(
                resolution.resolved_code,
                resolution.explanation,
                resolution.confidence,
                resolution.suggestions,
                resolution.requires_manual_review,
            )
        }
        DeadlineOutcome::Completed(Err(e)) => {
            warn!(provider = %name, error = %e, "provider call failed");
            Resolution::manual_fallback(e)
        }
        DeadlineOutcome::TimedOut => {
            let e = ProviderError::Timeout {
                provider: name.clone(),
                timeout_secs: timeout.as_secs(),
            };
            warn!(provider = %name, "provider call timed out");
            Resolution::manual_fallback(e)
        }
    }
}

/// Apply the selection rule over candidates in provider order.
fn select_best(candidates: &[ProviderResolution]) -> ResolutionPick {
    let mut best: Option<&ProviderResolution> = None;
    for candidate in candidates {
        if candidate.resolution.requires_manual_review {
            continue;
        }
        // Strict comparison keeps the first-seen candidate on ties.
        match best {
            Some(current) if candidate.resolution.confidence <= current.resolution.confidence => {}
            _ => best = Some(candidate),
        }
    }

    let chosen = best.unwrap_or(&candidates[0]);
    ResolutionPick {
        best_resolution: chosen.resolution.clone(),
        recommended_provider: chosen.provider.clone(),
        candidates: candidates.to_vec(),
    }
}

/// Fraction of the original's non-blank lines whose trimmed text appears
/// somewhere in the resolved body.
fn content_preservation(resolved: &str, original: &str) -> f64 {
    let lines: Vec<&str> = original
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return 1.0;
    }
    let preserved = lines.iter().filter(|l| resolved.contains(**l)).count();
    preserved as f64 / lines.len() as f64
}
