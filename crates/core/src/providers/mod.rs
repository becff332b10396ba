//! AI-assist provider clients.
//!
//! Each configured provider is an [`ProviderClient`] trait object so the
//! resolution engine can be tested against mocks. The concrete
//! [`HttpProviderClient`] speaks a chat-completions style JSON API.
//! Providers are held in a [`ProviderRegistry`] that preserves configuration
//! order; the fan-out tie-break depends on it.

pub mod http;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::AiConfig;
use crate::errors::ProviderError;
use crate::models::{ProviderProbe, Resolution};

/// Everything a provider needs to propose a merged file body.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub file_path: String,
    /// Base version of the file.
    pub original: String,
    /// Patch-side version.
    pub incoming: String,
    /// Working-tree version.
    pub current: String,
}

/// One AI-assist provider.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Configured provider name (used in selection results and logs).
    fn name(&self) -> &str;

    /// Ask the provider for a resolved file body.
    async fn resolve(&self, request: &ResolveRequest) -> Result<Resolution, ProviderError>;

    /// Cheap connectivity check.
    async fn probe(&self) -> Result<(), ProviderError>;
}

impl std::fmt::Debug for dyn ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("name", &self.name())
            .finish()
    }
}

/// Ordered collection of configured providers.
pub struct ProviderRegistry {
    clients: Vec<Arc<dyn ProviderClient>>,
    enabled: bool,
}

impl ProviderRegistry {
    /// Build the registry from configuration, skipping providers whose API
    /// key did not resolve.
    pub fn from_config(config: &AiConfig) -> Self {
        let mut clients: Vec<Arc<dyn ProviderClient>> = Vec::new();
        for provider in &config.providers {
            match http::HttpProviderClient::from_config(provider) {
                Some(client) => {
                    info!(provider = %provider.name, "registered AI provider");
                    clients.push(Arc::new(client));
                }
                None => {
                    warn!(provider = %provider.name, "skipping provider without API key");
                }
            }
        }
        Self {
            clients,
            enabled: config.enabled,
        }
    }

    /// Build a registry directly from client instances (used by tests and
    /// the resolution engine's constructor).
    pub fn new(clients: Vec<Arc<dyn ProviderClient>>, enabled: bool) -> Self {
        Self { clients, enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.clients.is_empty()
    }

    /// Provider names in configuration order.
    pub fn names(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.name().to_string()).collect()
    }

    /// All clients in configuration order.
    pub fn clients(&self) -> &[Arc<dyn ProviderClient>] {
        &self.clients
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ProviderClient>, ProviderError> {
        if self.clients.is_empty() {
            return Err(ProviderError::NoneConfigured);
        }
        self.clients
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
    }

    /// Probe every provider sequentially, measuring per-provider latency.
    pub async fn test_all(&self) -> Vec<ProviderProbe> {
        let mut results = Vec::with_capacity(self.clients.len());
        for client in &self.clients {
            let started = Instant::now();
            let outcome = client.probe().await;
            let latency_ms = started.elapsed().as_millis() as u64;
            results.push(match outcome {
                Ok(()) => ProviderProbe {
                    provider: client.name().to_string(),
                    success: true,
                    latency_ms,
                    error: None,
                },
                Err(e) => ProviderProbe {
                    provider: client.name().to_string(),
                    success: false,
                    latency_ms,
                    error: Some(e.to_string()),
                },
            });
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        name: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl ProviderClient for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        async fn resolve(&self, _request: &ResolveRequest) -> Result<Resolution, ProviderError> {
            Ok(Resolution::new("x".into(), "e".into(), 0.5, vec![], false))
        }

        async fn probe(&self) -> Result<(), ProviderError> {
            if self.fail {
                Err(ProviderError::UnknownProvider(self.name.into()))
            } else {
                Ok(())
            }
        }
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(
            vec![
                Arc::new(FakeProvider {
                    name: "alpha",
                    fail: false,
                }),
                Arc::new(FakeProvider {
                    name: "beta",
                    fail: true,
                }),
            ],
            true,
        )
    }

    #[test]
    fn test_names_preserve_order() {
        assert_eq!(registry().names(), vec!["alpha", "beta"]);
    }

    #[test]
    fn test_get_unknown_provider() {
        let err = registry().get("gamma").unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider(_)));
    }

    #[test]
    fn test_empty_registry_is_none_configured() {
        let empty = ProviderRegistry::new(vec![], true);
        assert!(!empty.is_enabled());
        assert!(matches!(
            empty.get("alpha").unwrap_err(),
            ProviderError::NoneConfigured
        ));
    }

    #[tokio::test]
    async fn test_probe_reports_per_provider_outcome() {
        let probes = registry().test_all().await;
        assert_eq!(probes.len(), 2);
        assert!(probes[0].success);
        assert!(!probes[1].success);
        assert!(probes[1].error.is_some());
    }
}
