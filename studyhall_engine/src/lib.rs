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

//! The query-processing pipeline.
//!
//! [`QueryEngine`] turns one inbound student query into a grounded
//! answer: it resolves the conversation and language, retrieves
//! candidate passages, assembles grounding context, scores confidence,
//! generates, applies guardrails, and records the turn. Every call
//! produces exactly one [`studyhall_core::QueryResult`]; no error ever
//! escapes to the caller.

mod engine;
mod prompt;

pub use engine::{EngineConfig, QueryEngine, QueryRequest};
pub use prompt::{ERROR_RESPONSE, NO_KNOWLEDGE_RESPONSE};
