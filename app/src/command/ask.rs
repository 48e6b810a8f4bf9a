use studyhall_engine::QueryRequest;
use tracing::info;

use super::{init_service_components, print_result};

/// Input parameters for the Ask command strategy.
#[derive(Debug, Clone)]
pub struct AskInput {
    /// The question text.
    pub message: String,
    /// Conversation to continue (a new one is created if absent).
    pub conversation_id: Option<String>,
    /// Language code, or `auto` to detect.
    pub language: Option<String>,
}

/// Strategy for answering a single question.
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let components = init_service_components().await?;

        let mut request = QueryRequest::new(input.message);
        if let Some(id) = input.conversation_id {
            request = request.with_conversation_id(id);
        }
        if let Some(language) = input.language {
            request = request.with_language(language);
        }

        let result = components.engine.process_query(request).await;
        print_result(&result, components.config.service.min_confidence_score);

        if let Some(id) = result.conversation_id {
            info!("Conversation: {id} (pass --conversation {id} to follow up)");
        }

        Ok(())
    }
}
