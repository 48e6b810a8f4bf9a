use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use studyhall_core::{RetrievedPassage, Retriever, ScoreConvention};
use tracing::{error, info};

/// Retrieval via a hosted semantic-search REST service.
///
/// Scores arrive on the provider's 0-10
/// [`ScoreConvention::SearchRank`] scale. Any transport or decode
/// failure degrades to an empty result; retrieval never errors.
pub struct HostedSearchRetriever {
    client: Client,
    endpoint: String,
    index_name: String,
    api_key: String,
}

impl HostedSearchRetriever {
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        index_name: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let index_name = index_name.into();
        info!("Hosted search retriever initialized (index: {index_name})");
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            index_name,
            api_key: api_key.into(),
        }
    }

    async fn try_search(
        &self,
        query: &str,
        top_k: usize,
        language: &str,
    ) -> anyhow::Result<Vec<RetrievedPassage>> {
        let response = self
            .client
            .post(format!(
                "{}/indexes/{}/docs/search?api-version=2024-07-01",
                self.endpoint, self.index_name
            ))
            .header("api-key", &self.api_key)
            .json(&json!({
                "search": query,
                "queryType": "semantic",
                "queryLanguage": query_language(language),
                "semanticConfiguration": "default",
                "top": top_k,
            }))
            .send()
            .await?
            .error_for_status()?
            .json::<serde_json::Value>()
            .await?;

        let hits = response["value"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("invalid response format: missing value array"))?;

        Ok(hits
            .iter()
            .map(|hit| {
                let metadata = hit
                    .as_object()
                    .map(|obj| {
                        obj.iter()
                            .filter(|(k, _)| !k.starts_with('@'))
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect()
                    })
                    .unwrap_or_default();
                RetrievedPassage {
                    content: hit["content"].as_str().unwrap_or("").to_string(),
                    title: hit["title"].as_str().map(str::to_string),
                    source: hit["source"].as_str().unwrap_or("").to_string(),
                    score: hit["@search.score"].as_f64().unwrap_or(0.0),
                    metadata,
                }
            })
            .collect())
    }
}

#[async_trait]
impl Retriever for HostedSearchRetriever {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f64,
        language: &str,
    ) -> Vec<RetrievedPassage> {
        match self.try_search(query, top_k, language).await {
            Ok(mut passages) => {
                passages.retain(|p| p.score >= min_score);
                passages.sort_by(|a, b| b.score.total_cmp(&a.score));
                info!("Retrieved {} relevant documents for query", passages.len());
                passages
            }
            Err(e) => {
                error!("Hosted search error: {e}");
                Vec::new()
            }
        }
    }

    fn score_convention(&self) -> ScoreConvention {
        ScoreConvention::SearchRank
    }
}

/// Map a supported language code to the search service's query-language
/// tag. Unmapped codes fall back to US English.
fn query_language(code: &str) -> &'static str {
    match code {
        "es" => "es-es",
        "fr" => "fr-fr",
        "de" => "de-de",
        "it" => "it-it",
        "pt" => "pt-br",
        "zh" => "zh-cn",
        "ja" => "ja-jp",
        "ko" => "ko-kr",
        _ => "en-us",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_mapping_falls_back_to_english() {
        assert_eq!(query_language("es"), "es-es");
        assert_eq!(query_language("ja"), "ja-jp");
        assert_eq!(query_language("hi"), "en-us");
        assert_eq!(query_language("xx"), "en-us");
    }

    #[tokio::test]
    async fn unreachable_backend_degrades_to_empty() {
        let retriever =
            HostedSearchRetriever::new("http://127.0.0.1:9", "handbook", "test-key");
        let results = retriever.search("housing", 5, 0.5, "en").await;
        assert!(results.is_empty());
    }
}
