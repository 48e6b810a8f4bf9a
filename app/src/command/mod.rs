//! Static strategy pattern for CLI commands.
//!
//! Each command is a separate strategy with its own input type, dispatched
//! statically from `main`. Shared composition logic (picking the retriever
//! and generator pair for the configured mode) lives here.

use std::sync::Arc;

use studyhall_config::{Config, Mode};
use studyhall_conversation::ConversationStore;
use studyhall_core::{Generator, QueryResult, Retriever};
use studyhall_engine::{EngineConfig, QueryEngine};
use studyhall_providers::{
    HostedChatGenerator, HostedSearchRetriever, KeywordRetriever, KnowledgePassage,
    OllamaEmbedder, OllamaGenerator, StubGenerator, VectorIndexRetriever,
};
use tracing::{info, warn};

mod ask;
mod chat;
mod init;
mod version;

pub use ask::{AskInput, AskStrategy};
pub use chat::{ChatInput, ChatStrategy};
pub use init::InitStrategy;
pub use version::VersionStrategy;

/// Contract for all command strategies.
///
/// Each strategy defines its own input type, so parameters pass through
/// without boxing and every call site is monomorphized.
pub trait CommandStrategy: Send + Sync + 'static {
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Everything a query-serving command needs.
pub struct ServiceComponents {
    pub config: Config,
    pub store: Arc<ConversationStore>,
    pub engine: QueryEngine,
}

/// Load configuration and compose the engine for the configured mode.
pub async fn init_service_components() -> anyhow::Result<ServiceComponents> {
    let config = Config::load()?;
    info!("Loaded config from ~/.studyhall/config.json");

    let store = Arc::new(ConversationStore::new(
        config.service.max_history,
        config.service.ttl_hours,
    ));

    let (retriever, generator) = build_backends(&config).await?;

    let engine_config = EngineConfig {
        max_history: config.service.max_history,
        max_response_length: config.service.max_response_length,
        top_k: config.retrieval.top_k,
        min_score: config
            .retrieval
            .min_score
            .unwrap_or_else(|| default_min_score(config.mode)),
    };
    let engine = QueryEngine::new(Arc::clone(&store), retriever, generator, engine_config);

    Ok(ServiceComponents {
        config,
        store,
        engine,
    })
}

/// Score threshold matching the scale the mode's retriever reports on:
/// 0.3 for 0-1 similarity scores, 0.5 for 0-10 search-rank scores.
const fn default_min_score(mode: Mode) -> f64 {
    match mode {
        Mode::Local => 0.3,
        Mode::Hosted | Mode::Demo => 0.5,
    }
}

async fn build_backends(
    config: &Config,
) -> anyhow::Result<(Arc<dyn Retriever>, Arc<dyn Generator>)> {
    match config.mode {
        Mode::Demo => {
            info!("Demo mode: built-in keyword index and canned answers");
            Ok((
                Arc::new(KeywordRetriever::with_sample_handbook()),
                Arc::new(StubGenerator::new()),
            ))
        }
        Mode::Local => {
            let embedder = Arc::new(OllamaEmbedder::new(
                config.embedding.base_url.clone(),
                config.embedding.model.clone(),
            ));
            let mut retriever = VectorIndexRetriever::new(embedder);
            if let Some(path) = &config.retrieval.knowledge_path {
                let content = std::fs::read_to_string(path)?;
                let passages: Vec<KnowledgePassage> = serde_json::from_str(&content)?;
                retriever.add_documents(passages).await?;
            } else {
                warn!("No knowledge_path configured; local index starts empty");
            }

            let ollama = OllamaGenerator::new(
                config.generator.base_url.clone(),
                config.generator.model.clone(),
            );
            let generator: Arc<dyn Generator> = if ollama.health_check().await {
                Arc::new(ollama)
            } else {
                warn!(
                    "Ollama is not reachable at {} (model {}); using canned answers",
                    config.generator.base_url, config.generator.model
                );
                Arc::new(StubGenerator::new())
            };

            Ok((Arc::new(retriever), generator))
        }
        Mode::Hosted => {
            let search = config
                .hosted_search
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("hosted mode requires a hosted_search section"))?;
            let api_key = config
                .generator
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("hosted mode requires generator.api_key"))?;

            Ok((
                Arc::new(HostedSearchRetriever::new(
                    search.endpoint.clone(),
                    search.index_name.clone(),
                    search.api_key.clone(),
                )),
                Arc::new(HostedChatGenerator::new(
                    config.generator.base_url.clone(),
                    api_key.clone(),
                    config.generator.model.clone(),
                )),
            ))
        }
    }
}

/// Print an answer, flagging low-trust responses.
pub fn print_result(result: &QueryResult, min_confidence: f64) {
    println!("\n{}\n", result.response);

    if !result.sources.is_empty() {
        println!("Sources: {}", result.sources.join(", "));
    }
    println!(
        "Confidence: {:.2} | Language: {}",
        result.confidence, result.language
    );

    if result.confidence < min_confidence {
        warn!(
            "Low confidence answer ({:.2} < {:.2}); verify with support staff",
            result.confidence, min_confidence
        );
    }
}
