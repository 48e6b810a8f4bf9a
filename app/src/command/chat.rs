//! Multi-turn interactive session.
//!
//! Unlike `ask`, this keeps the conversation id across turns so follow-up
//! questions see prior context.

use std::io::Write as _;

use studyhall_engine::QueryRequest;
use tracing::info;

use super::{init_service_components, print_result};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Conversation to resume (a new one starts on the first turn).
    pub conversation_id: Option<String>,
    /// Language code, or `auto` to detect.
    pub language: Option<String>,
}

/// Strategy for running an interactive session.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl super::CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let components = init_service_components().await?;

        let removed = components.store.clear_expired();
        if removed > 0 {
            info!("Removed {removed} expired conversations");
        }

        println!("=== studyhall chat ===");
        println!("Type 'exit', 'quit', or Ctrl+C to end the session.\n");

        let mut conversation_id = input.conversation_id;
        let mut turns = 0_usize;

        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if std::io::stdin().read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();

            if matches!(line, "exit" | "quit" | "q") {
                break;
            }

            if line.is_empty() {
                continue;
            }

            let mut request = QueryRequest::new(line);
            if let Some(id) = &conversation_id {
                request = request.with_conversation_id(id.clone());
            }
            if let Some(language) = &input.language {
                request = request.with_language(language.clone());
            }

            let result = components.engine.process_query(request).await;
            print_result(&result, components.config.service.min_confidence_score);

            conversation_id = result.conversation_id;
            turns += 1;
        }

        println!("\nSession ended. Total turns: {turns}");
        if let Some(id) = conversation_id {
            info!("Conversation: {id}");
        }

        Ok(())
    }
}
