use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use studyhall_core::{Generator, GeneratorError};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Generation via a hosted OpenAI-style chat-completions endpoint.
pub struct HostedChatGenerator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HostedChatGenerator {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let model = model.into();
        info!("Hosted chat generator initialized (model: {model})");
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            model,
        }
    }

    async fn try_send(&self, request: &serde_json::Value) -> Result<String, GeneratorError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    GeneratorError::Connection(format!(
                        "chat backend unreachable at {}: {e}",
                        self.base_url
                    ))
                } else {
                    GeneratorError::Backend(e.into())
                }
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GeneratorError::ModelNotFound(self.model.clone()));
        }

        let body = response
            .error_for_status()
            .map_err(|e| GeneratorError::Backend(e.into()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| GeneratorError::Backend(e.into()))?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                GeneratorError::Backend(anyhow::anyhow!(
                    "invalid response format: missing content"
                ))
            })
    }
}

#[async_trait]
impl Generator for HostedChatGenerator {
    async fn generate(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let mut messages = Vec::new();
        if let Some(system) = system_prompt {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": prompt}));

        let request = json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
        });

        debug!("Sending chat request to hosted backend (model: {})", self.model);

        // Transient failures get two retries; a missing model never will.
        let delays = [2_u64, 4];
        let mut attempt = 0;
        loop {
            match self.try_send(&request).await {
                Ok(content) => return Ok(content),
                Err(e @ GeneratorError::ModelNotFound(_)) => return Err(e),
                Err(e) if attempt < delays.len() => {
                    warn!(
                        "Chat request failed (attempt {}/{}): {e}. Retrying after {}s...",
                        attempt + 1,
                        delays.len() + 1,
                        delays[attempt]
                    );
                    sleep(Duration::from_secs(delays[attempt])).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
