use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use studyhall_core::{Generator, GeneratorError};
use tracing::{debug, info};

/// Generation backed by a local Ollama model server.
///
/// Connectivity failures and a missing model are surfaced as distinct
/// [`GeneratorError`] variants so the engine can degrade gracefully.
pub struct OllamaGenerator {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerator {
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let model = model.into();
        info!("Ollama generator initialized (model: {model}, url: {base_url})");
        Self {
            client: Client::new(),
            base_url,
            model,
        }
    }

    /// Whether the server is reachable and the configured model is pulled.
    pub async fn health_check(&self) -> bool {
        let Ok(response) = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        else {
            return false;
        };
        let Ok(body) = response.json::<serde_json::Value>().await else {
            return false;
        };
        body["models"]
            .as_array()
            .is_some_and(|models| {
                models
                    .iter()
                    .any(|m| m["name"].as_str() == Some(self.model.as_str()))
            })
    }

    fn map_send_error(&self, err: reqwest::Error) -> GeneratorError {
        if err.is_connect() || err.is_timeout() {
            GeneratorError::Connection(format!(
                "Ollama is not reachable at {}: {err}",
                self.base_url
            ))
        } else {
            GeneratorError::Backend(err.into())
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
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
            "stream": false,
            "options": {
                "temperature": temperature,
                "num_predict": max_tokens,
            },
        });

        debug!("Sending chat request to Ollama (model: {})", self.model);

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GeneratorError::ModelNotFound(self.model.clone()));
        }

        let body = response
            .error_for_status()
            .map_err(|e| GeneratorError::Backend(e.into()))?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| GeneratorError::Backend(e.into()))?;

        let content = body["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                GeneratorError::Backend(anyhow::anyhow!(
                    "invalid response format: missing message content"
                ))
            })?
            .trim()
            .to_string();

        Ok(content)
    }
}
