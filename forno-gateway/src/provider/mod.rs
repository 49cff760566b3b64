//! Multi-provider abstraction for hosted LLM APIs.
//!
//! Provides a unified interface for the model backends Forno generates
//! replies with, using consistent request/response formats.

mod compatible;
mod huggingface;
mod resilient;

pub use compatible::CompatibleProvider;
pub use huggingface::HuggingFaceProvider;
pub use resilient::{ResilienceConfig, ResilientProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use forno_common::config::ProvidersConfig;

// ============================================================================
// Provider Trait
// ============================================================================

/// Unified interface for text-generation providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Get the model this provider is bound to.
    fn model(&self) -> &str;

    /// Generate a completion.
    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError>;
}

/// Error from a provider.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub provider: String,
    pub model: String,
    pub message: String,
    pub status_code: Option<u16>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}:{}] {}", self.provider, self.model, self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Unified generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// System prompt, sent as a separate message where the API supports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// User prompt (conversation context plus the latest message).
    pub prompt: String,
    /// Maximum tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    /// Request with just a prompt, defaults for everything else.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Unified generation response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Generation {
    /// Provider that produced the text.
    pub provider: String,
    /// Model used.
    pub model: String,
    /// Generated text.
    pub text: String,
    /// Response latency in milliseconds.
    pub latency_ms: u64,
}

// ============================================================================
// Chain construction
// ============================================================================

/// Build the provider fallback chain from configuration.
///
/// `config.order` decides which providers are tried and in which order.
/// Entries without credentials are skipped; unknown names are logged and
/// skipped. Fails when no provider ends up configured.
pub fn build_chain(config: &ProvidersConfig) -> anyhow::Result<ResilientProvider> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    for entry in &config.order {
        match entry.as_str() {
            "groq" => {
                if let Some(key) = config.groq_api_key.as_deref().filter(|k| !k.is_empty()) {
                    providers.push(Arc::new(CompatibleProvider::groq(
                        key,
                        &config.groq_model,
                        config.request_timeout_secs,
                    )));
                }
            }
            "huggingface" => {
                if let Some(token) = config.hf_token.as_deref().filter(|t| !t.is_empty()) {
                    providers.push(Arc::new(HuggingFaceProvider::new(
                        token,
                        &config.hf_model,
                        config.request_timeout_secs,
                    )));
                }
            }
            other => {
                tracing::warn!(provider = other, "Unknown provider in order list, skipping");
            }
        }
    }

    anyhow::ensure!(
        !providers.is_empty(),
        "no LLM provider configured; set GROQ_API_KEY or HF_TOKEN"
    );

    Ok(ResilientProvider::new(
        providers,
        ResilienceConfig {
            max_retries: config.max_retries,
            ..ResilienceConfig::default()
        },
    ))
}
