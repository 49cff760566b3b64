//! Hugging Face Inference API provider.
//!
//! Talks to the hosted text-generation endpoint at
//! `https://api-inference.huggingface.co/models/{model}`. The endpoint
//! returns 503 while a cold model is loading; that surfaces as a retryable
//! error so the resilient wrapper backs off and tries again.

use super::{Generation, GenerationRequest, Provider, ProviderError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co";

/// Provider backed by the Hugging Face Inference API.
pub struct HuggingFaceProvider {
    api_token: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct HfRequest {
    inputs: String,
    parameters: HfParameters,
}

#[derive(Debug, Serialize)]
struct HfParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    return_full_text: bool,
}

#[derive(Debug, Deserialize)]
struct HfGeneration {
    #[serde(default)]
    generated_text: String,
}

impl HuggingFaceProvider {
    /// Create a provider bound to one model.
    pub fn new(api_token: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            api_token: api_token.to_string(),
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    /// Point the provider at a different endpoint.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn error(&self, message: String, status_code: Option<u16>) -> ProviderError {
        ProviderError {
            provider: self.name().to_string(),
            model: self.model.clone(),
            message,
            status_code,
        }
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<Generation, ProviderError> {
        let start = Instant::now();

        // The inference endpoint takes one flat string; the hosted model's
        // chat template handles the rest.
        let inputs = match request.system {
            Some(ref system) => format!("{system}\n\n{}", request.prompt),
            None => request.prompt.clone(),
        };

        let hf_request = HfRequest {
            inputs,
            parameters: HfParameters {
                max_new_tokens: request.max_tokens,
                temperature: request.temperature,
                return_full_text: false,
            },
        };

        let url = format!("{}/models/{}", self.base_url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .json(&hf_request)
            .send()
            .await
            .map_err(|e| self.error(format!("Request failed: {e}"), None))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = if status.as_u16() == 503 {
                format!("Model is loading: {error_text}")
            } else {
                format!("API error ({}): {error_text}", status.as_u16())
            };
            return Err(self.error(message, Some(status.as_u16())));
        }

        let result: Vec<HfGeneration> = response
            .json()
            .await
            .map_err(|e| self.error(format!("Failed to parse response: {e}"), None))?;

        let generated = result
            .into_iter()
            .next()
            .ok_or_else(|| self.error("Empty response from inference API".into(), None))?;

        Ok(Generation {
            provider: self.name().to_string(),
            model: self.model.clone(),
            text: generated.generated_text.trim().to_string(),
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn provider_creation() {
        let provider = HuggingFaceProvider::new("hf_test", "mistralai/Mistral-7B-Instruct-v0.2", 30);
        assert_eq!(provider.name(), "huggingface");
        assert_eq!(provider.model(), "mistralai/Mistral-7B-Instruct-v0.2");
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
    }

    #[tokio::test]
    async fn generates_and_trims_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .and(header("Authorization", "Bearer hf_test"))
            .and(body_partial_json(
                serde_json::json!({"parameters": {"return_full_text": false}}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!([{"generated_text": "  Here is our menu!  "}]),
            ))
            .mount(&server)
            .await;

        let provider =
            HuggingFaceProvider::new("hf_test", "test-model", 5).with_base_url(&server.uri());
        let result = provider
            .generate(GenerationRequest::from_prompt("show menu"))
            .await
            .unwrap();

        assert_eq!(result.text, "Here is our menu!");
        assert_eq!(result.provider, "huggingface");
        assert_eq!(result.model, "test-model");
    }

    #[tokio::test]
    async fn model_loading_surfaces_status_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .respond_with(ResponseTemplate::new(503).set_body_json(
                serde_json::json!({"error": "Model test-model is currently loading"}),
            ))
            .mount(&server)
            .await;

        let provider =
            HuggingFaceProvider::new("hf_test", "test-model", 5).with_base_url(&server.uri());
        let err = provider
            .generate(GenerationRequest::from_prompt("hi"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code, Some(503));
        assert!(err.message.contains("loading"));
    }

    #[tokio::test]
    async fn system_prompt_is_flattened_into_inputs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model"))
            .and(body_partial_json(
                serde_json::json!({"inputs": "Be helpful.\n\nhi"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{"generated_text": "hello"}])),
            )
            .mount(&server)
            .await;

        let provider =
            HuggingFaceProvider::new("hf_test", "test-model", 5).with_base_url(&server.uri());
        let request = GenerationRequest {
            system: Some("Be helpful.".into()),
            prompt: "hi".into(),
            max_tokens: None,
            temperature: None,
        };

        assert_eq!(provider.generate(request).await.unwrap().text, "hello");
    }
}
