//! Knowledge retrieval.
//!
//! Operates entirely through the [`KnowledgeStore`] and [`Embedder`]
//! traits. The calling application chooses the backends and `top_k`.

use anyhow::Result;

use crate::embedding::{embed_one, Embedder};
use crate::models::ScoredChunk;
use crate::store::KnowledgeStore;

/// Embed `query` and return the `top_k` most similar knowledge chunks.
///
/// A blank query or `top_k == 0` returns nothing without calling the
/// embedder.
pub async fn retrieve<S: KnowledgeStore + ?Sized>(
    store: &S,
    embedder: &dyn Embedder,
    query: &str,
    top_k: usize,
) -> Result<Vec<ScoredChunk>> {
    if query.trim().is_empty() || top_k == 0 {
        return Ok(Vec::new());
    }
    let query_vec = embed_one(embedder, query).await?;
    store.search(&query_vec, top_k).await
}
