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

//! Bounded, TTL-expiring conversation history for follow-up questions.
//!
//! The store is constructed once by the composition root and shared
//! behind an `Arc`; it holds all conversational state so the query
//! engine only ever carries conversation ids.

mod store;

pub use store::{ConversationStore, ConversationSummary};
