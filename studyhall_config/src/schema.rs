use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which retriever/generator pair the service composes at startup.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Ollama embeddings, in-process vector index, Ollama chat model.
    Local,
    /// Managed search index and an OpenAI-style chat endpoint.
    Hosted,
    /// Built-in keyword index and canned answers; no external services.
    Demo,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "Config::default_mode")]
    pub mode: Mode,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosted_search: Option<HostedSearchConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    #[serde(default = "ServiceConfig::default_max_history")]
    pub max_history: usize,
    #[serde(default = "ServiceConfig::default_ttl_hours")]
    pub ttl_hours: i64,
    #[serde(default = "ServiceConfig::default_max_response_length")]
    pub max_response_length: usize,
    /// Answers below this confidence get a low-trust warning in the CLI.
    #[serde(default = "ServiceConfig::default_min_confidence_score")]
    pub min_confidence_score: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_history: Self::default_max_history(),
            ttl_hours: Self::default_ttl_hours(),
            max_response_length: Self::default_max_response_length(),
            min_confidence_score: Self::default_min_confidence_score(),
        }
    }
}

impl ServiceConfig {
    const fn default_max_history() -> usize {
        10
    }

    const fn default_ttl_hours() -> i64 {
        24
    }

    const fn default_max_response_length() -> usize {
        1000
    }

    const fn default_min_confidence_score() -> f64 {
        0.7
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "RetrievalConfig::default_top_k")]
    pub top_k: usize,
    /// Threshold on the active backend's own score scale. When absent,
    /// a per-mode default applies (0.3 for similarity scores, 0.5 for
    /// search-rank scores).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f64>,
    /// Knowledge base file for the local vector index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_path: Option<PathBuf>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: Self::default_top_k(),
            min_score: None,
            knowledge_path: None,
        }
    }
}

impl RetrievalConfig {
    const fn default_top_k() -> usize {
        5
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GeneratorConfig {
    #[serde(default = "GeneratorConfig::default_model")]
    pub model: String,
    #[serde(default = "GeneratorConfig::default_base_url")]
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            base_url: Self::default_base_url(),
            api_key: None,
        }
    }
}

impl GeneratorConfig {
    fn default_model() -> String {
        "llama3.2".to_string()
    }

    fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "EmbeddingConfig::default_model")]
    pub model: String,
    #[serde(default = "EmbeddingConfig::default_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: Self::default_model(),
            base_url: Self::default_base_url(),
        }
    }
}

impl EmbeddingConfig {
    fn default_model() -> String {
        "nomic-embed-text".to_string()
    }

    fn default_base_url() -> String {
        "http://localhost:11434".to_string()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HostedSearchConfig {
    pub endpoint: String,
    pub index_name: String,
    pub api_key: String,
}

impl Config {
    const fn default_mode() -> Mode {
        Mode::Demo
    }

    pub fn load() -> anyhow::Result<Self> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(".studyhall");

        let config_path = config_dir.join("config.json");

        if !config_path.exists() {
            anyhow::bail!(
                "Config file not found at: {}. Please run 'studyhall init' to create config.",
                config_path.display()
            );
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn ensure_config_dir() -> anyhow::Result<PathBuf> {
        let config_dir = dirs::home_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?
            .join(".studyhall");

        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }

    pub fn create_config() -> anyhow::Result<()> {
        let config_dir = Self::ensure_config_dir()?;
        let config_path = config_dir.join("config.json");

        if config_path.exists() {
            anyhow::bail!(
                "Config file already exists at: {}. Please edit it directly.",
                config_path.display()
            );
        }

        let config_template = r#"{
  "mode": "demo",
  "service": {
    "max_history": 10,
    "ttl_hours": 24,
    "max_response_length": 1000,
    "min_confidence_score": 0.7
  },
  "retrieval": {
    "top_k": 5
  },
  "generator": {
    "model": "llama3.2",
    "base_url": "http://localhost:11434"
  },
  "embedding": {
    "model": "nomic-embed-text",
    "base_url": "http://localhost:11434"
  }
}"#;

        std::fs::write(&config_path, config_template)?;

        println!("Created config file at: {}", config_path.display());
        println!();
        println!("Next steps:");
        println!("   1. Pick a mode: demo (no services), local (Ollama), or hosted");
        println!("   2. For local mode, set retrieval.knowledge_path to a passages JSON file");
        println!("   3. For hosted mode, add a hosted_search section and generator.api_key");
        println!("   4. Run 'studyhall chat' to start asking questions");
        println!();
        Ok(())
    }
}
