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

use clap::{Parser, Subcommand};
use command::{AskInput, AskStrategy, ChatInput, ChatStrategy, CommandStrategy, InitStrategy,
              VersionStrategy};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod command;

#[derive(Parser)]
#[command(name = "studyhall")]
#[command(about = "studyhall student support assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question
    Ask {
        /// The question to ask
        message: String,

        /// Conversation to continue
        #[arg(short, long)]
        conversation: Option<String>,

        /// Language code ('auto' to detect)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Multi-turn interactive session
    Chat {
        /// Conversation to resume
        #[arg(short, long)]
        conversation: Option<String>,

        /// Language code ('auto' to detect)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Ask {
            message,
            conversation,
            language,
        } => {
            AskStrategy
                .execute(AskInput {
                    message,
                    conversation_id: conversation,
                    language,
                })
                .await
        }
        Commands::Chat {
            conversation,
            language,
        } => {
            ChatStrategy
                .execute(ChatInput {
                    conversation_id: conversation,
                    language,
                })
                .await
        }
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
