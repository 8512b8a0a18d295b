//! TOML configuration.
//!
//! Every section is optional and falls back to the defaults below, so a
//! minimal config only needs to point `[knowledge].root` at a directory of
//! markdown files. [`load_config`] parses and then validates.
//!
//! ```toml
//! [knowledge]
//! root = "./knowledge"
//! index_path = "./data/knowledge-index.json"
//!
//! [embedding]
//! provider = "voyage"
//! model = "voyage-3"
//!
//! [model]
//! generate = "claude-sonnet-4-20250514"
//! thinking_budget = 4000
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! ```
//!
//! API keys are read from the environment (`ANTHROPIC_API_KEY`,
//! `VOYAGE_API_KEY`, `OPENAI_API_KEY`), never from the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use agent_architect_core::chunk::DEFAULT_DELIMITER;
use agent_architect_core::guardrails::GuardrailLimits;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_root")]
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default = "default_delimiter")]
    pub heading_delimiter: String,
    /// Where `architect index` writes the embedded index. When the file
    /// exists, `serve` and `generate` load it instead of re-embedding.
    #[serde(default)]
    pub index_path: Option<PathBuf>,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            root: default_knowledge_root(),
            include_globs: default_include_globs(),
            exclude_globs: Vec::new(),
            heading_delimiter: default_delimiter(),
            index_path: None,
        }
    }
}

fn default_knowledge_root() -> PathBuf {
    PathBuf::from("./knowledge")
}
fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string()]
}
fn default_delimiter() -> String {
    DEFAULT_DELIMITER.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Override the provider's endpoint URL.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            url: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Model used for the `validate_agent_idea` step.
    #[serde(default = "default_validate_model")]
    pub validate: String,
    /// Model used for `generate_spec`.
    #[serde(default = "default_generate_model")]
    pub generate: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Enables extended thinking for generation when set.
    #[serde(default)]
    pub thinking_budget: Option<u32>,
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_model_max_retries")]
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            validate: default_validate_model(),
            generate: default_generate_model(),
            max_tokens: default_max_tokens(),
            thinking_budget: None,
            timeout_secs: default_model_timeout_secs(),
            max_retries: default_model_max_retries(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_validate_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}
fn default_generate_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    8192
}
fn default_model_timeout_secs() -> u64 {
    300
}
fn default_model_max_retries() -> u32 {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardrailsConfig {
    #[serde(default = "default_min_query_chars")]
    pub min_query_chars: usize,
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
    #[serde(default = "default_min_spec_chars")]
    pub min_spec_chars: usize,
}

impl Default for GuardrailsConfig {
    fn default() -> Self {
        let limits = GuardrailLimits::default();
        Self {
            min_query_chars: limits.min_query_chars,
            max_query_chars: limits.max_query_chars,
            min_spec_chars: limits.min_spec_chars,
        }
    }
}

fn default_min_query_chars() -> usize {
    GuardrailLimits::default().min_query_chars
}
fn default_max_query_chars() -> usize {
    GuardrailLimits::default().max_query_chars
}
fn default_min_spec_chars() -> usize {
    GuardrailLimits::default().min_spec_chars
}

impl GuardrailsConfig {
    pub fn limits(&self) -> GuardrailLimits {
        GuardrailLimits {
            min_query_chars: self.min_query_chars,
            max_query_chars: self.max_query_chars,
            min_spec_chars: self.min_spec_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.retrieval.top_k == 0 {
        bail!("retrieval.top_k must be >= 1");
    }

    if config.embedding.batch_size == 0 {
        bail!("embedding.batch_size must be > 0");
    }

    match config.embedding.provider.as_str() {
        "disabled" | "voyage" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled, voyage, or openai.",
            other
        ),
    }

    let g = &config.guardrails;
    if g.min_query_chars > g.max_query_chars {
        bail!("guardrails.min_query_chars must not exceed guardrails.max_query_chars");
    }

    if config.model.max_tokens == 0 {
        bail!("model.max_tokens must be > 0");
    }
    if let Some(budget) = config.model.thinking_budget {
        // The API requires budget_tokens >= 1024 and below max_tokens.
        if budget < 1024 || budget >= config.model.max_tokens {
            bail!(
                "model.thinking_budget must be >= 1024 and < model.max_tokens ({})",
                config.model.max_tokens
            );
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.retrieval.top_k, 3);
        assert_eq!(cfg.server.bind, "127.0.0.1:8000");
        assert!(!cfg.embedding.is_enabled());
        assert_eq!(cfg.guardrails.limits(), GuardrailLimits::default());
        assert_eq!(cfg.knowledge.heading_delimiter, "##");
        assert_eq!(cfg.model.max_tokens, 8192);
    }

    #[test]
    fn test_partial_sections() {
        let cfg = parse_config(
            r#"
[knowledge]
root = "/srv/knowledge"

[embedding]
provider = "voyage"
model = "voyage-3"

[guardrails]
max_query_chars = 1200
"#,
        )
        .unwrap();
        assert_eq!(cfg.knowledge.root, PathBuf::from("/srv/knowledge"));
        assert_eq!(cfg.knowledge.include_globs, vec!["**/*.md".to_string()]);
        assert_eq!(cfg.embedding.batch_size, 64);
        assert_eq!(cfg.guardrails.max_query_chars, 1200);
        assert_eq!(cfg.guardrails.min_query_chars, 10);
    }

    #[test]
    fn test_rejects_unknown_provider() {
        let err = parse_config("[embedding]\nprovider = \"magic\"").unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_rejects_zero_top_k() {
        assert!(parse_config("[retrieval]\ntop_k = 0").is_err());
    }

    #[test]
    fn test_thinking_budget_bounds() {
        assert!(parse_config("[model]\nthinking_budget = 512").is_err());
        assert!(parse_config("[model]\nthinking_budget = 9000").is_err());
        assert!(parse_config("[model]\nthinking_budget = 4000").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/architect.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
