//! Batch indexing of knowledge chunks.

use anyhow::{bail, Result};

use crate::embedding::Embedder;
use crate::models::KnowledgeChunk;
use crate::store::KnowledgeStore;

/// Counts from an [`index_chunks`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexReport {
    pub embedded: usize,
    pub added: usize,
    pub duplicates: usize,
}

/// Embed `chunks` in batches of `batch_size` and add them to `store`.
///
/// Fails if the embedder returns a different number of vectors than it
/// was given texts.
pub async fn index_chunks<S: KnowledgeStore + ?Sized>(
    store: &S,
    embedder: &dyn Embedder,
    chunks: Vec<KnowledgeChunk>,
    batch_size: usize,
) -> Result<IndexReport> {
    let batch_size = batch_size.max(1);
    let mut report = IndexReport::default();
    let mut pending = chunks.into_iter().peekable();

    while pending.peek().is_some() {
        let batch: Vec<KnowledgeChunk> = pending.by_ref().take(batch_size).collect();
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            bail!(
                "embedding provider returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            );
        }
        report.embedded += batch.len();
        for (chunk, vector) in batch.into_iter().zip(vectors) {
            if store.add(chunk, vector).await? {
                report.added += 1;
            } else {
                report.duplicates += 1;
            }
        }
    }

    Ok(report)
}
