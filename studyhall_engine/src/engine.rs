//! Orchestration of one query from inbound text to grounded answer.

use std::sync::Arc;

use studyhall_conversation::ConversationStore;
use studyhall_core::confidence::score_confidence;
use studyhall_core::language::FALLBACK_LANGUAGE;
use studyhall_core::{
    Generator, LanguageResolver, QueryOutcome, QueryResult, Retriever, RetrievedPassage, Role,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::prompt::{self, ERROR_RESPONSE, NO_KNOWLEDGE_RESPONSE};

/// Sampling temperature for grounded answers. Fixed, not caller-tunable.
const GENERATION_TEMPERATURE: f32 = 0.3;

/// Queries longer than this are truncated, never rejected.
const MAX_QUERY_CHARS: usize = 2000;

/// Generations shorter than this are treated as failures.
const MIN_RESPONSE_CHARS: usize = 10;

/// Sentinel language code requesting detection.
const AUTO_LANGUAGE: &str = "auto";

/// Engine tunables, fixed at construction.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Messages of prior context included per turn.
    pub max_history: usize,
    /// Character cap on generated answers.
    pub max_response_length: usize,
    /// Candidates requested per retrieval.
    pub top_k: usize,
    /// Score threshold on the active backend's own scale.
    pub min_score: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_history: 10,
            max_response_length: 1000,
            top_k: 5,
            min_score: 0.5,
        }
    }
}

/// One inbound query call.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    /// Language code, or `auto` (default) for detection.
    pub language: Option<String>,
    pub student_id: Option<String>,
    /// Conversation to continue; absent starts a new one.
    pub conversation_id: Option<String>,
}

impl QueryRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            language: None,
            student_id: None,
            conversation_id: None,
        }
    }

    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[must_use]
    pub fn with_student_id(mut self, student_id: impl Into<String>) -> Self {
        self.student_id = Some(student_id.into());
        self
    }

    #[must_use]
    pub fn with_conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }
}

/// The query-processing pipeline.
///
/// Holds the conversation store, the language resolver, and one
/// retriever/generator pair selected at composition time. Safe to share
/// across concurrent calls; per-conversation state lives entirely in
/// the store.
pub struct QueryEngine {
    store: Arc<ConversationStore>,
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    resolver: LanguageResolver,
    config: EngineConfig,
}

impl QueryEngine {
    #[must_use]
    pub fn new(
        store: Arc<ConversationStore>,
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        config: EngineConfig,
    ) -> Self {
        info!(
            "Query engine initialized (top_k={}, min_score={}, max_response_length={})",
            config.top_k, config.min_score, config.max_response_length
        );
        Self {
            store,
            retriever,
            generator,
            resolver: LanguageResolver::new(),
            config,
        }
    }

    /// Process one query end to end.
    ///
    /// Infallible: every call, including internal failures, yields a
    /// [`QueryResult`] whose confidence communicates trust. Degraded
    /// outcomes carry confidence 0.0 and a fixed apology text.
    pub async fn process_query(&self, request: QueryRequest) -> QueryResult {
        let query = Self::sanitize_query(&request.query);

        // Resolve (or create) the conversation and record the user turn
        // before reading the transcript, so follow-up context always
        // includes the current question.
        let conversation_id = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| self.store.create(request.student_id.as_deref()));
        self.store
            .add_message(&conversation_id, Role::User, &query, None);
        let conversation_context = self
            .store
            .get_context_string(&conversation_id, Some(self.config.max_history));

        let language = self.resolve_language(request.language.as_deref(), &query);

        let (result, outcome) = match self
            .answer(&query, &conversation_id, &conversation_context, &language)
            .await
        {
            Ok(answered) => answered,
            Err(e) => {
                error!("Error processing query: {e:#}");
                let result =
                    self.degraded_result(ERROR_RESPONSE, &language, Some(conversation_id));
                // Best-effort: the failed turn still belongs in history.
                if let Some(id) = result.conversation_id.as_deref() {
                    self.store.add_message(
                        id,
                        Role::Assistant,
                        ERROR_RESPONSE,
                        Some(Self::turn_metadata(0.0, &[])),
                    );
                }
                (result, QueryOutcome::PipelineError)
            }
        };

        info!(
            query_id = %result.query_id,
            conversation_id = result.conversation_id.as_deref().unwrap_or(""),
            language = %result.language,
            confidence = result.confidence,
            source_count = result.sources.len(),
            outcome = outcome.as_str(),
            "query processed"
        );
        result
    }

    /// Retrieval through persistence. Any error here is converted to the
    /// apology result at the `process_query` boundary.
    async fn answer(
        &self,
        query: &str,
        conversation_id: &str,
        conversation_context: &str,
        language: &str,
    ) -> anyhow::Result<(QueryResult, QueryOutcome)> {
        let passages = self
            .retriever
            .search(query, self.config.top_k, self.config.min_score, language)
            .await;

        if passages.is_empty() {
            warn!("No relevant documents found in knowledge base");
            self.store.add_message(
                conversation_id,
                Role::Assistant,
                NO_KNOWLEDGE_RESPONSE,
                Some(Self::turn_metadata(0.0, &[])),
            );
            let result = self.degraded_result(
                NO_KNOWLEDGE_RESPONSE,
                language,
                Some(conversation_id.to_string()),
            );
            return Ok((result, QueryOutcome::NoResults));
        }

        let context = build_context(&passages, conversation_context);
        let max_score = passages.iter().map(|p| p.score).fold(0.0, f64::max);
        let confidence = score_confidence(
            max_score,
            passages.len(),
            self.retriever.score_convention(),
        );

        let system = prompt::system_prompt(
            self.config.max_response_length,
            self.resolver.display_name(language),
        );
        let user = prompt::user_prompt(&context, query);

        let (response, confidence, sources, outcome) = match self
            .generator
            .generate(
                Some(&system),
                &user,
                self.config.max_response_length,
                GENERATION_TEMPERATURE,
            )
            .await
        {
            Ok(raw) => {
                let guarded = self.apply_guardrails(&raw);
                (guarded, confidence, source_ids(&passages), QueryOutcome::Answered)
            }
            Err(e) => {
                error!("Error generating response: {e}");
                (ERROR_RESPONSE.to_string(), 0.0, Vec::new(), QueryOutcome::GenerationError)
            }
        };

        self.store.add_message(
            conversation_id,
            Role::Assistant,
            &response,
            Some(Self::turn_metadata(confidence, &sources)),
        );

        let result = QueryResult {
            response,
            language: language.to_string(),
            confidence,
            sources,
            query_id: Uuid::now_v7().to_string(),
            conversation_id: Some(conversation_id.to_string()),
        };
        Ok((result, outcome))
    }

    /// Use the caller's language when it is a supported non-sentinel
    /// code; otherwise detect, falling back to English.
    fn resolve_language(&self, requested: Option<&str>, query: &str) -> String {
        if let Some(code) = requested {
            if code != AUTO_LANGUAGE && self.resolver.is_supported(code) {
                return code.to_string();
            }
        }
        let detected = self.resolver.detect(query);
        if self.resolver.is_supported(&detected) {
            detected
        } else {
            FALLBACK_LANGUAGE.to_string()
        }
    }

    /// Length cap plus rejection of near-empty generations.
    fn apply_guardrails(&self, response: &str) -> String {
        let mut out = response.to_string();
        if out.chars().count() > self.config.max_response_length {
            out = out
                .chars()
                .take(self.config.max_response_length)
                .collect::<String>()
                + "...";
        }
        if out.trim().chars().count() < MIN_RESPONSE_CHARS {
            return NO_KNOWLEDGE_RESPONSE.to_string();
        }
        out
    }

    fn degraded_result(
        &self,
        response: &str,
        language: &str,
        conversation_id: Option<String>,
    ) -> QueryResult {
        QueryResult {
            response: response.to_string(),
            language: language.to_string(),
            confidence: 0.0,
            sources: Vec::new(),
            query_id: Uuid::now_v7().to_string(),
            conversation_id,
        }
    }

    fn turn_metadata(
        confidence: f64,
        sources: &[String],
    ) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::from_iter([
            ("confidence".to_string(), serde_json::json!(confidence)),
            ("sources".to_string(), serde_json::json!(sources)),
        ])
    }

    fn sanitize_query(query: &str) -> String {
        if query.chars().count() > MAX_QUERY_CHARS {
            warn!("Query exceeds {MAX_QUERY_CHARS} characters, truncating");
            query.chars().take(MAX_QUERY_CHARS).collect()
        } else {
            query.to_string()
        }
    }
}

/// Concatenate passages in rank order, prefixed by any prior-turn
/// transcript.
fn build_context(passages: &[RetrievedPassage], conversation_context: &str) -> String {
    let blocks: Vec<String> = passages
        .iter()
        .enumerate()
        .map(|(i, passage)| {
            let title = passage
                .title
                .as_deref()
                .filter(|t| !t.is_empty())
                .map_or_else(|| format!("Document {}", i + 1), str::to_string);
            format!("[{title}]\n{}\n", passage.content)
        })
        .collect();
    let joined = blocks.join("\n---\n");

    if conversation_context.is_empty() {
        joined
    } else {
        format!("{conversation_context}\n\n{joined}")
    }
}

/// Source identifiers in retrieval order, duplicates kept, empty ids
/// dropped.
fn source_ids(passages: &[RetrievedPassage]) -> Vec<String> {
    passages
        .iter()
        .filter(|p| !p.source.is_empty())
        .map(|p| p.source.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(title: Option<&str>, content: &str, source: &str, score: f64) -> RetrievedPassage {
        RetrievedPassage {
            content: content.to_string(),
            title: title.map(str::to_string),
            source: source.to_string(),
            score,
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn context_joins_passages_with_separator() {
        let passages = vec![
            passage(Some("Fees"), "Tuition is $15,000.", "a.pdf", 0.9),
            passage(None, "Housing opens in April.", "b.pdf", 0.8),
        ];
        let context = build_context(&passages, "");
        assert_eq!(
            context,
            "[Fees]\nTuition is $15,000.\n\n---\n[Document 2]\nHousing opens in April.\n"
        );
    }

    #[test]
    fn empty_title_falls_back_to_document_rank() {
        let passages = vec![passage(Some(""), "content", "a.pdf", 0.9)];
        let context = build_context(&passages, "");
        assert!(context.starts_with("[Document 1]"));
    }

    #[test]
    fn prior_transcript_is_prepended() {
        let passages = vec![passage(Some("Fees"), "facts", "a.pdf", 0.9)];
        let context = build_context(&passages, "Previous conversation:\nStudent: hi");
        assert!(context.starts_with("Previous conversation:\nStudent: hi\n\n[Fees]"));
    }

    #[test]
    fn source_ids_keep_rank_order_and_duplicates() {
        let passages = vec![
            passage(None, "a", "x.pdf", 0.9),
            passage(None, "b", "", 0.8),
            passage(None, "c", "y.pdf", 0.7),
            passage(None, "d", "x.pdf", 0.6),
        ];
        assert_eq!(source_ids(&passages), vec!["x.pdf", "y.pdf", "x.pdf"]);
    }

    #[test]
    fn sanitize_truncates_oversized_queries() {
        let long = "q".repeat(3000);
        assert_eq!(QueryEngine::sanitize_query(&long).chars().count(), 2000);
        assert_eq!(QueryEngine::sanitize_query("short"), "short");
    }
}
