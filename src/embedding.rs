//! Embedding providers.
//!
//! Concrete [`Embedder`] implementations selected by `[embedding].provider`:
//! - **[`DisabledEmbedder`]**: returns errors; used when embeddings are not configured.
//! - **[`HttpEmbedder`]**: calls the Voyage or OpenAI embeddings API with
//!   batching, retry, and backoff (see [`crate::http`]).
//!
//! Both upstream APIs accept `{"model", "input": [...]}` and answer with
//! `{"data": [{"embedding": [...]}, ...]}`, so a single client covers them.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use agent_architect::config::EmbeddingConfig;
//! # use agent_architect::embedding::create_embedder;
//! let config = EmbeddingConfig::default(); // provider = "disabled"
//! let embedder = create_embedder(&config).unwrap();
//! assert_eq!(embedder.model_name(), "disabled");
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use agent_architect_core::embedding::Embedder;

use crate::config::EmbeddingConfig;
use crate::http::send_with_retry;

// ============ Disabled Provider ============

/// An embedder that always fails.
///
/// Used when `embedding.provider = "disabled"`. Retrieval-backed commands
/// report the error instead of silently returning nothing.
pub struct DisabledEmbedder;

#[async_trait]
impl Embedder for DisabledEmbedder {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        bail!("Embedding provider is disabled. Set [embedding].provider to voyage or openai.")
    }
}

// ============ HTTP Providers ============

/// Which embeddings API an [`HttpEmbedder`] talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Voyage,
    OpenAI,
}

impl Provider {
    fn label(self) -> &'static str {
        match self {
            Provider::Voyage => "Voyage",
            Provider::OpenAI => "OpenAI",
        }
    }

    fn key_var(self) -> &'static str {
        match self {
            Provider::Voyage => "VOYAGE_API_KEY",
            Provider::OpenAI => "OPENAI_API_KEY",
        }
    }

    fn default_url(self) -> &'static str {
        match self {
            Provider::Voyage => "https://api.voyageai.com/v1/embeddings",
            Provider::OpenAI => "https://api.openai.com/v1/embeddings",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Provider::Voyage => "voyage-3",
            Provider::OpenAI => "text-embedding-3-small",
        }
    }
}

/// Embedder backed by a remote `POST /v1/embeddings` endpoint.
pub struct HttpEmbedder {
    provider: Provider,
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
    max_retries: u32,
}

impl HttpEmbedder {
    /// Build an embedder, reading the API key from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's API key variable is not set.
    pub fn new(provider: Provider, config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var(provider.key_var())
            .map_err(|_| anyhow::anyhow!("{} environment variable not set", provider.key_var()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            provider,
            client,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| provider.default_url().to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| provider.default_model().to_string()),
            api_key,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = send_with_retry(self.provider.label(), self.max_retries, || {
            self.client
                .post(&self.url)
                .bearer_auth(&self.api_key)
                .json(&body)
        })
        .await?;

        let json: serde_json::Value = response.json().await?;
        let vectors = parse_embeddings_response(&json)?;
        tracing::debug!(
            provider = self.provider.label(),
            count = vectors.len(),
            "embedded batch"
        );
        Ok(vectors)
    }
}

/// Parse an embeddings response, returning `data[].embedding` in order.
///
/// Items carrying an `index` are placed at that position.
pub fn parse_embeddings_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());

    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, vec));
    }

    indexed.sort_by_key(|(i, _)| *i);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Create the embedder named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown provider names or a missing API key.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledEmbedder)),
        "voyage" => Ok(Arc::new(HttpEmbedder::new(Provider::Voyage, config)?)),
        "openai" => Ok(Arc::new(HttpEmbedder::new(Provider::OpenAI, config)?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}
