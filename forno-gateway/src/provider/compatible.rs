//! Generic OpenAI-compatible chat-completions provider.
//!
//! Groq (and most hosted LLM APIs) speak the same `/v1/chat/completions`
//! format, so one implementation covers them all. Each instance is bound to
//! a single configured model.

use super::{Generation, GenerationRequest, Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// A provider that speaks the OpenAI-compatible chat completions API.
pub struct CompatibleProvider {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct CompatibleRequest {
    model: String,
    messages: Vec<CompatibleMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct CompatibleMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponse {
    choices: Vec<CompatibleChoice>,
}

#[derive(Debug, Deserialize)]
struct CompatibleChoice {
    message: CompatibleResponseMessage,
}

#[derive(Debug, Deserialize)]
struct CompatibleResponseMessage {
    content: String,
}

impl CompatibleProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(name: &str, base_url: &str, api_key: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Create a Groq provider.
    pub fn groq(api_key: &str, model: &str, timeout_secs: u64) -> Self {
        Self::new("groq", "https://api.groq.com/openai", api_key, model, timeout_secs)
    }

    /// Create a provider for any custom OpenAI-compatible endpoint.
    pub fn custom(name: &str, base_url: &str, api_key: &str, model: &str) -> Self {
        Self::new(name, base_url, api_key, model, 120)
    }

    fn error(&self, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: self.name.clone(),
            model: self.model.clone(),
            message,
            status_code,
        }
    }
}

#[async_trait]
impl Provider for CompatibleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(CompatibleMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(CompatibleMessage {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        let compatible_request = CompatibleRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&compatible_request)
            .send()
            .await
            .map_err(|e| self.error(format!("Request failed: {e}"), None))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(self.error(
                format!("API error ({}): {error_text}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let result: CompatibleResponse = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {e}"), None))?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| self.error(format!("No response from {}", self.name), None))?;

        Ok(Generation {
            provider: self.name.clone(),
            model: self.model.clone(),
            text: choice.message.content.trim().to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}
