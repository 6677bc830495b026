//! Ollama generation provider with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::llm::{GenerationProvider, GenerationRequest};

/// Ollama `/api/generate` client with automatic retry
pub struct OllamaGenerator {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    /// Create a new Ollama generator
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Generation request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::generation("Unknown error")))
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn generate(&self, chunk: &str, request: &GenerationRequest) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let prompt = PromptBuilder::build(request.flavor, chunk, &request.options);
        let model = self.config.generate_model.clone();
        let temperature = self.config.temperature;
        let client = self.client.clone();

        tracing::debug!(
            "Generating {} with model {} ({} chars of input)",
            request.flavor,
            model,
            chunk.chars().count()
        );

        self.retry_request(|| {
            let url = url.clone();
            let prompt = prompt.clone();
            let model = model.clone();
            let client = client.clone();

            async move {
                let request = GenerateRequest {
                    model,
                    prompt,
                    stream: false,
                    options: GenerateOptions { temperature },
                };

                let response = client
                    .post(&url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::generation(format!(
                        "Generation failed: HTTP {} - {}",
                        status, body
                    )));
                }

                let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                    Error::generation(format!("Failed to parse generation response: {}", e))
                })?;

                Ok(generate_response.response)
            }
        })
        .await
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.generate_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn generator(max_retries: u32) -> OllamaGenerator {
        OllamaGenerator::new(&LlmConfig {
            max_retries,
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_until_success() {
        let generator = generator(2);
        let attempts = AtomicU32::new(0);

        let result = generator
            .retry_request(|| {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err(Error::generation("busy"))
                    } else {
                        Ok("Q: a\nA: b".to_string())
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, "Q: a\nA: b");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let generator = generator(1);
        let attempts = AtomicU32::new(0);

        let result: Result<String> = generator
            .retry_request(|| {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err(Error::generation("model not loaded")) }
            })
            .await;

        assert!(matches!(result, Err(Error::Generation(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3.2:3b".to_string(),
            prompt: "hi".to_string(),
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        })
        .unwrap();
        assert_eq!(body["stream"], serde_json::json!(false));
        assert_eq!(body["options"]["temperature"], serde_json::json!(0.0));
    }
}
