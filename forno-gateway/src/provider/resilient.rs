//! Resilient provider wrapper with retry and fallback support.
//!
//! Wraps an ordered chain of providers. A failed request is retried with
//! exponential backoff; once retries are exhausted the next provider in the
//! chain takes over. Cold Hugging Face models (503 while loading) recover
//! through exactly this path.

use super::{Generation, GenerationRequest, Provider, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for resilient provider behavior.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    /// Maximum number of retries per provider before falling back.
    pub max_retries: u32,
    /// Base backoff delay in milliseconds (doubles with each retry).
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// A provider chain with retry and fallback behavior.
///
/// The first provider is the primary, subsequent providers are fallbacks.
pub struct ResilientProvider {
    providers: Vec<Arc<dyn Provider>>,
    config: ResilienceConfig,
}

impl ResilientProvider {
    /// Create a new resilient provider with the given chain and configuration.
    pub fn new(providers: Vec<Arc<dyn Provider>>, config: ResilienceConfig) -> Self {
        Self { providers, config }
    }

    /// Create a new resilient provider with default configuration.
    pub fn with_defaults(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self::new(providers, ResilienceConfig::default())
    }

    /// Create from a single provider with retry support (no fallbacks).
    pub fn single(provider: Arc<dyn Provider>, config: ResilienceConfig) -> Self {
        Self::new(vec![provider], config)
    }

    /// Names of the wrapped providers, primary first.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Calculate backoff delay for a given attempt.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .config
            .base_backoff_ms
            .saturating_mul(2_u64.saturating_pow(attempt))
            .min(self.config.max_backoff_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
impl Provider for ResilientProvider {
    fn name(&self) -> &str {
        "resilient"
    }

    fn model(&self) -> &str {
        self.providers.first().map_or("none", |p| p.model())
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let mut all_errors = Vec::new();

        for (provider_idx, provider) in self.providers.iter().enumerate() {
            let provider_name = provider.name();

            for attempt in 0..=self.config.max_retries {
                match provider.generate(request.clone()).await {
                    Ok(response) => {
                        if attempt > 0 {
                            tracing::info!(
                                provider = provider_name,
                                attempt = attempt + 1,
                                "Provider recovered after retries"
                            );
                        }
                        return Ok(response);
                    }
                    Err(e) => {
                        let error_msg = format!(
                            "{} attempt {}/{}: {}",
                            provider_name,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        all_errors.push(error_msg);

                        // Only sleep if there are more retries to attempt
                        if attempt < self.config.max_retries {
                            let delay = self.backoff_delay(attempt);
                            tracing::warn!(
                                provider = provider_name,
                                attempt = attempt + 1,
                                max_retries = self.config.max_retries,
                                delay_ms = delay.as_millis() as u64,
                                "Provider call failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                        }
                    }
                }
            }

            // Log fallback if there are more providers
            if provider_idx + 1 < self.providers.len() {
                let next_provider = self.providers[provider_idx + 1].name();
                tracing::warn!(
                    failed_provider = provider_name,
                    next_provider = next_provider,
                    "Switching to fallback provider"
                );
            }
        }

        // All providers failed
        Err(ProviderError {
            provider: "resilient".to_string(),
            model: self.model().to_string(),
            message: format!("All providers failed. Attempts:\n{}", all_errors.join("\n")),
            status_code: None,
        })
    }
}
