#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Shared domain types and capability contracts for the studyhall
//! question-answering pipeline.
//!
//! The engine crate composes these pieces; the providers crate supplies
//! concrete `Retriever`/`Generator`/`Embedder` backends.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod confidence;
pub mod language;

pub use language::LanguageResolver;

/// Who authored a conversation message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when formatting a conversation transcript.
    #[must_use]
    pub const fn transcript_label(self) -> &'static str {
        match self {
            Self::User => "Student",
            Self::Assistant => "Assistant",
        }
    }
}

/// A single immutable conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Informational only (e.g. confidence, source list); never consulted
    /// when the history is read back.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    /// Create a message stamped with the current time.
    #[must_use]
    pub fn new(
        role: Role,
        content: String,
        metadata: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Self {
        Self {
            role,
            content,
            timestamp: Utc::now(),
            metadata: metadata.unwrap_or_default(),
        }
    }
}

/// Scale a retrieval backend reports its relevance scores on.
///
/// The convention is a fixed property of the backend, never inferred
/// from the score values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreConvention {
    /// Embedding-similarity scores in `0.0..=1.0` (`1 - cosine distance`).
    Similarity,
    /// Hosted search-service scores, conventionally `0.0..=10.0`.
    SearchRank,
}

/// A ranked passage returned by a [`Retriever`]. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub content: String,
    pub title: Option<String>,
    /// Source document identifier; may be empty when the backend has none.
    pub source: String,
    /// Non-negative, on the backend's [`ScoreConvention`] scale.
    pub score: f64,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// How a query call terminated. Carried in the per-call log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered,
    NoResults,
    GenerationError,
    PipelineError,
}

impl QueryOutcome {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::NoResults => "no_results",
            Self::GenerationError => "generation_error",
            Self::PipelineError => "pipeline_error",
        }
    }
}

/// The answer produced for one query call.
///
/// Every call produces exactly one of these; degraded conditions are
/// expressed through `confidence` (0.0 means "no reliable answer") and
/// the response text, never through an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub response: String,
    /// Resolved language code (e.g. `en`).
    pub language: String,
    /// In `0.0..=1.0`, rounded to two decimals.
    pub confidence: f64,
    /// Source identifiers in retrieval rank order; duplicates allowed,
    /// empty identifiers excluded.
    pub sources: Vec<String>,
    /// Fresh unique identifier for this call.
    pub query_id: String,
    pub conversation_id: Option<String>,
}

/// Errors a [`Generator`] backend can surface. All variants are
/// recoverable by the caller; the engine converts them into a fixed
/// apology answer.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("cannot reach generation backend: {0}")]
    Connection(String),

    #[error("model '{0}' not found on backend")]
    ModelNotFound(String),

    #[error("generation backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Ranked passage retrieval over a fixed knowledge base.
///
/// Implementations must never error: backend unavailability and zero
/// matches both degrade to an empty list, which the engine treats as a
/// first-class "no knowledge" outcome.
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` passages with score >= `min_score`, ordered
    /// by descending relevance.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        min_score: f64,
        language: &str,
    ) -> Vec<RetrievedPassage>;

    /// Scale this backend's scores are reported on.
    fn score_convention(&self) -> ScoreConvention;
}

/// Grounded text generation.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: Option<&str>,
        prompt: &str,
        max_tokens: usize,
        temperature: f32,
    ) -> Result<String, GeneratorError>;
}

/// Text-to-vector embedding, consumed by the vector-index retriever.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn role_transcript_labels() {
        assert_eq!(Role::User.transcript_label(), "Student");
        assert_eq!(Role::Assistant.transcript_label(), "Assistant");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, "\"user\"");
    }

    #[test]
    fn message_defaults_empty_metadata() {
        let msg = Message::new(Role::User, "hi".to_string(), None);
        assert!(msg.metadata.is_empty());
        assert!(msg.timestamp <= Utc::now());
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(QueryOutcome::Answered.as_str(), "answered");
        assert_eq!(QueryOutcome::NoResults.as_str(), "no_results");
        assert_eq!(QueryOutcome::GenerationError.as_str(), "generation_error");
        assert_eq!(QueryOutcome::PipelineError.as_str(), "pipeline_error");
    }
}
