#![warn(clippy::all, clippy::nursery, clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

//! On-disk configuration for the studyhall service.

pub mod schema;

pub use schema::{
    Config, EmbeddingConfig, GeneratorConfig, HostedSearchConfig, Mode, RetrievalConfig,
    ServiceConfig,
};
