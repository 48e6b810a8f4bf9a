#![warn(
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

//! Concrete retrieval, generation, and embedding backends.
//!
//! Every backend implements a capability trait from `studyhall_core`;
//! the composition root picks variants once at startup based on the
//! configured mode.

mod embed;
mod hosted_chat;
mod hosted_search;
mod keyword;
mod ollama;
mod retry;
mod stub;
mod vector;

pub use embed::OllamaEmbedder;
pub use hosted_chat::HostedChatGenerator;
pub use hosted_search::HostedSearchRetriever;
pub use keyword::{KeywordDocument, KeywordRetriever};
pub use ollama::OllamaGenerator;
pub use retry::retry_with_backoff;
pub use stub::StubGenerator;
pub use vector::{KnowledgePassage, VectorIndexRetriever};
