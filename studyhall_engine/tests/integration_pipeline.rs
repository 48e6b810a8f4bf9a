//! End-to-end pipeline behavior with scripted retrieval and generation.

use std::sync::Arc;

use async_trait::async_trait;
use studyhall_conversation::ConversationStore;
use studyhall_core::{
    Generator, GeneratorError, RetrievedPassage, Retriever, Role, ScoreConvention,
};
use studyhall_engine::{EngineConfig, NO_KNOWLEDGE_RESPONSE, QueryEngine, QueryRequest};

/// Retriever returning a fixed candidate list.
struct FixedRetriever {
    passages: Vec<RetrievedPassage>,
    convention: ScoreConvention,
}

impl FixedRetriever {
    fn similarity(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            convention: ScoreConvention::Similarity,
        }
    }

    fn empty() -> Self {
        Self::similarity(Vec::new())
    }
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn search(
        &self,
        _query: &str,
        top_k: usize,
        _min_score: f64,
        _language: &str,
    ) -> Vec<RetrievedPassage> {
        self.passages.iter().take(top_k).cloned().collect()
    }

    fn score_convention(&self) -> ScoreConvention {
        self.convention
    }
}

/// Generator returning a fixed reply.
struct FixedGenerator {
    reply: String,
}

#[async_trait]
impl Generator for FixedGenerator {
    async fn generate(
        &self,
        _system_prompt: Option<&str>,
        _prompt: &str,
        _max_tokens: usize,
        _temperature: f32,
    ) -> Result<String, GeneratorError> {
        Ok(self.reply.clone())
    }
}

/// Generator that always fails with a connectivity error.
struct UnreachableGenerator;

#[async_trait]
impl Generator for UnreachableGenerator {
    async fn generate(
        &self,
        _system_prompt: Option<&str>,
        _prompt: &str,
        _max_tokens: usize,
        _temperature: f32,
    ) -> Result<String, GeneratorError> {
        Err(GeneratorError::Connection(
            "backend offline".to_string(),
        ))
    }
}

/// Generator that echoes the user prompt back, for transcript checks.
struct EchoGenerator;

#[async_trait]
impl Generator for EchoGenerator {
    async fn generate(
        &self,
        _system_prompt: Option<&str>,
        prompt: &str,
        _max_tokens: usize,
        _temperature: f32,
    ) -> Result<String, GeneratorError> {
        Ok(prompt.to_string())
    }
}

fn passage(title: &str, content: &str, source: &str, score: f64) -> RetrievedPassage {
    RetrievedPassage {
        content: content.to_string(),
        title: Some(title.to_string()),
        source: source.to_string(),
        score,
        metadata: serde_json::Map::new(),
    }
}

fn engine_with(
    store: &Arc<ConversationStore>,
    retriever: impl Retriever + 'static,
    generator: impl Generator + 'static,
    config: EngineConfig,
) -> QueryEngine {
    QueryEngine::new(
        Arc::clone(store),
        Arc::new(retriever),
        Arc::new(generator),
        config,
    )
}

#[tokio::test]
async fn end_to_end_single_passage() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever = FixedRetriever::similarity(vec![passage(
        "Enrolment Requirements",
        "Students need a valid visa, insurance, and funds for onward travel.",
        "enrolment-guide.pdf",
        0.95,
    )]);
    let generator = FixedGenerator {
        reply: "To enrol you need a valid visa, suitable insurance, and onward funds.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let result = engine
        .process_query(
            QueryRequest::new("What are the enrolment requirements?").with_language("auto"),
        )
        .await;

    assert_eq!(result.language, "en");
    // Band formula: 0.7 + (0.95 - 0.7) * 0.5 = 0.825, rounded -> 0.83.
    assert!((result.confidence - 0.83).abs() < f64::EPSILON);
    assert_eq!(result.sources, vec!["enrolment-guide.pdf"]);
    assert!(result.response.contains("visa"));
    assert!(!result.query_id.is_empty());

    let conversation_id = result.conversation_id.expect("conversation id");
    assert!(!conversation_id.is_empty());
    assert!(store.contains(&conversation_id));
}

#[tokio::test]
async fn no_results_is_a_terminal_answer() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let engine = engine_with(
        &store,
        FixedRetriever::empty(),
        FixedGenerator {
            reply: "should never be called".to_string(),
        },
        EngineConfig::default(),
    );

    let result = engine
        .process_query(QueryRequest::new("Completely unknown topic"))
        .await;

    assert_eq!(result.response, NO_KNOWLEDGE_RESPONSE);
    assert!(result.confidence.abs() < f64::EPSILON);
    assert!(result.sources.is_empty());

    // The degraded turn is still persisted.
    let conversation_id = result.conversation_id.expect("conversation id");
    let history = store.get_history(&conversation_id, None);
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[1].content, NO_KNOWLEDGE_RESPONSE);
}

#[tokio::test]
async fn generation_failure_yields_apology_and_persists() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever = FixedRetriever::similarity(vec![passage(
        "Fees",
        "Tuition is $15,000.",
        "tuition.pdf",
        0.9,
    )]);
    let engine = engine_with(
        &store,
        retriever,
        UnreachableGenerator,
        EngineConfig::default(),
    );

    let result = engine.process_query(QueryRequest::new("How much is tuition?")).await;

    assert!(result.response.contains("I apologize"));
    assert!(result.confidence.abs() < f64::EPSILON);
    assert!(result.sources.is_empty());

    let conversation_id = result.conversation_id.expect("conversation id");
    let history = store.get_history(&conversation_id, None);
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, result.response);
}

#[tokio::test]
async fn long_generation_is_truncated_with_ellipsis() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever =
        FixedRetriever::similarity(vec![passage("Doc", "content", "doc.pdf", 0.9)]);
    let generator = FixedGenerator {
        reply: "x".repeat(200),
    };
    let config = EngineConfig {
        max_response_length: 50,
        ..EngineConfig::default()
    };
    let engine = engine_with(&store, retriever, generator, config);

    let result = engine.process_query(QueryRequest::new("question")).await;

    assert!(result.response.chars().count() <= 53);
    assert!(result.response.ends_with("..."));
}

#[tokio::test]
async fn near_empty_generation_is_replaced() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever =
        FixedRetriever::similarity(vec![passage("Doc", "content", "doc.pdf", 0.9)]);
    let generator = FixedGenerator {
        reply: "ok.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let result = engine.process_query(QueryRequest::new("question")).await;

    assert_eq!(result.response, NO_KNOWLEDGE_RESPONSE);
}

#[tokio::test]
async fn search_rank_scores_normalize_by_ten() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever = FixedRetriever {
        passages: vec![
            passage("A", "first", "a.pdf", 8.0),
            passage("B", "second", "b.pdf", 6.0),
        ],
        convention: ScoreConvention::SearchRank,
    };
    let generator = FixedGenerator {
        reply: "An answer grounded in the context.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let result = engine.process_query(QueryRequest::new("question")).await;

    // 8.0 / 10 = 0.8, two results boost 1.08 -> 0.864 -> 0.86.
    assert!((result.confidence - 0.86).abs() < f64::EPSILON);
    assert_eq!(result.sources, vec!["a.pdf", "b.pdf"]);
}

#[tokio::test]
async fn duplicate_and_empty_sources_are_handled() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever = FixedRetriever::similarity(vec![
        passage("A", "first", "handbook.pdf", 0.9),
        passage("B", "second", "", 0.8),
        passage("C", "third", "handbook.pdf", 0.7),
    ]);
    let generator = FixedGenerator {
        reply: "An answer grounded in the context.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let result = engine.process_query(QueryRequest::new("question")).await;

    assert_eq!(result.sources, vec!["handbook.pdf", "handbook.pdf"]);
}

#[tokio::test]
async fn reused_conversation_id_appends_to_one_history() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever =
        FixedRetriever::similarity(vec![passage("Doc", "content", "doc.pdf", 0.9)]);
    let generator = FixedGenerator {
        reply: "An answer grounded in the context.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let first = engine
        .process_query(QueryRequest::new("What are the enrolment requirements?"))
        .await;
    let conversation_id = first.conversation_id.expect("conversation id");

    let second = engine
        .process_query(
            QueryRequest::new("Do I need insurance?")
                .with_conversation_id(conversation_id.clone()),
        )
        .await;

    assert_eq!(second.conversation_id.as_deref(), Some(conversation_id.as_str()));
    assert_eq!(store.len(), 1);

    let history = store.get_history(&conversation_id, Some(100));
    assert_eq!(history.len(), 4);
    assert_eq!(history[0].content, "What are the enrolment requirements?");
    assert_eq!(history[1].role, Role::Assistant);
    assert_eq!(history[2].content, "Do I need insurance?");
    assert_eq!(history[3].role, Role::Assistant);
}

#[tokio::test]
async fn follow_up_prompt_carries_prior_transcript() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever =
        FixedRetriever::similarity(vec![passage("Doc", "content", "doc.pdf", 0.9)]);
    let engine = engine_with(&store, retriever, EchoGenerator, EngineConfig::default());

    let first = engine
        .process_query(QueryRequest::new("What are the enrolment requirements?"))
        .await;
    let conversation_id = first.conversation_id.expect("conversation id");

    let context = store.get_context_string(&conversation_id, None);
    assert!(context.contains("Student: What are the enrolment requirements?"));

    let second = engine
        .process_query(
            QueryRequest::new("Do I need insurance?")
                .with_conversation_id(conversation_id.clone()),
        )
        .await;

    // The echoed prompt shows the prior turns ahead of the new question.
    let prior_pos = second
        .response
        .find("Student: What are the enrolment requirements?")
        .expect("prior user turn in prompt");
    let new_pos = second
        .response
        .find("Student's question: Do I need insurance?")
        .expect("new question in prompt");
    assert!(prior_pos < new_pos);
}

#[tokio::test]
async fn supplied_supported_language_is_honored() {
    let store = Arc::new(ConversationStore::new(10, 24));
    let retriever =
        FixedRetriever::similarity(vec![passage("Doc", "content", "doc.pdf", 0.9)]);
    let generator = FixedGenerator {
        reply: "Una respuesta basada en el contexto proporcionado.".to_string(),
    };
    let engine = engine_with(&store, retriever, generator, EngineConfig::default());

    let result = engine
        .process_query(QueryRequest::new("question").with_language("es"))
        .await;
    assert_eq!(result.language, "es");

    // Unsupported codes fall through to detection.
    let result = engine
        .process_query(QueryRequest::new("What are the office hours?").with_language("xx"))
        .await;
    assert_eq!(result.language, "en");
}
