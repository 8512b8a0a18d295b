//! Knowledge store abstraction.
//!
//! The [`KnowledgeStore`] trait is the seam between indexing/retrieval and
//! wherever the vectors live. The only backend today is
//! [`memory::InMemoryStore`]; it is owned by the application and shared
//! by `Arc`, never through a global.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{KnowledgeChunk, ScoredChunk};

/// Append-only store of embedded knowledge chunks.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](KnowledgeStore::add) | Store a chunk with its vector |
/// | [`search`](KnowledgeStore::search) | Rank chunks by cosine similarity |
/// | [`len`](KnowledgeStore::len) | Number of stored chunks |
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Store a chunk and its embedding.
    ///
    /// Returns `false` without storing anything if a chunk with the same
    /// content hash is already present.
    async fn add(&self, chunk: KnowledgeChunk, vector: Vec<f32>) -> Result<bool>;

    /// Return the `top_k` chunks most similar to `query_vec`, best first.
    async fn search(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;

    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}
