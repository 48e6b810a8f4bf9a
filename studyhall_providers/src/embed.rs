use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use studyhall_core::Embedder;
use tracing::info;

use crate::retry::retry_with_backoff;

/// Embeddings from a local Ollama server.
pub struct OllamaEmbedder {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbedder {
    /// Convert f64 to f32 for embedding values.
    /// Precision loss is acceptable for similarity search.
    #[expect(clippy::cast_possible_truncation, reason = "embeddings use f32")]
    const fn f64_to_f32(x: f64) -> f32 {
        x as f32
    }

    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        info!("Ollama embedder initialized (model: {model})");
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            model,
        }
    }

    async fn try_embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&json!({
                "model": self.model,
                "prompt": text,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        response["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("invalid response format: missing embedding"))?
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(Self::f64_to_f32)
                    .ok_or_else(|| anyhow::anyhow!("invalid embedding value"))
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        retry_with_backoff(|| self.try_embed(text), &[1, 2]).await
    }
}
