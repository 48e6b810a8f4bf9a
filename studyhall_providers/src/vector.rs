use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use studyhall_core::{Embedder, RetrievedPassage, Retriever, ScoreConvention};
use tracing::{info, warn};

/// A knowledge-base passage as loaded from an ingested document file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgePassage {
    pub content: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: String,
}

struct IndexedPassage {
    passage: KnowledgePassage,
    embedding: Vec<f32>,
}

/// Embedding-similarity retrieval over an in-memory index.
///
/// Scores are `1 - cosine distance`, clamped at zero, on the
/// [`ScoreConvention::Similarity`] scale. Any embedder failure during
/// search degrades to an empty result.
pub struct VectorIndexRetriever {
    embedder: Arc<dyn Embedder>,
    index: Vec<IndexedPassage>,
}

impl VectorIndexRetriever {
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            index: Vec::new(),
        }
    }

    /// Embed and index a batch of passages.
    ///
    /// Call during composition, before the retriever is shared.
    pub async fn add_documents(&mut self, passages: Vec<KnowledgePassage>) -> anyhow::Result<()> {
        let count = passages.len();
        for passage in passages {
            let embedding = self.embedder.embed(&passage.content).await?;
            self.index.push(IndexedPassage { passage, embedding });
        }
        info!("Indexed {count} passages ({} total)", self.index.len());
        Ok(())
    }

    /// Number of indexed passages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[async_trait]
impl Retriever for VectorIndexRetriever {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f64,
        _language: &str,
    ) -> Vec<RetrievedPassage> {
        if self.index.is_empty() {
            return Vec::new();
        }

        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!("Query embedding failed, returning no results: {e}");
                return Vec::new();
            }
        };

        let mut scored: Vec<RetrievedPassage> = self
            .index
            .iter()
            .map(|indexed| {
                let score = cosine_similarity(&query_embedding, &indexed.embedding).max(0.0);
                RetrievedPassage {
                    content: indexed.passage.content.clone(),
                    title: indexed.passage.title.clone(),
                    source: indexed.passage.source.clone(),
                    score,
                    metadata: serde_json::Map::new(),
                }
            })
            .filter(|passage| passage.score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);

        info!("Vector search found {} results for query", scored.len());
        scored
    }

    fn score_convention(&self) -> ScoreConvention {
        ScoreConvention::Similarity
    }
}

/// Cosine similarity between two embedding vectors.
///
/// Returns 0.0 for mismatched lengths or zero-magnitude vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f64;
    let mut mag_a = 0.0_f64;
    let mut mag_b = 0.0_f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }

    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}
