//! In-memory [`KnowledgeStore`] implementation.
//!
//! Uses a `Vec` behind `std::sync::RwLock` for thread safety. Search is
//! brute-force cosine similarity over all stored vectors, which is plenty
//! for a knowledge base of a few hundred sections.
//!
//! The contents can be captured as an [`IndexSnapshot`] and restored later,
//! so an index built once can be reused without re-embedding.

use std::collections::HashSet;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::models::{KnowledgeChunk, ScoredChunk};

use super::KnowledgeStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVector {
    pub chunk: KnowledgeChunk,
    pub vector: Vec<f32>,
}

/// Serializable copy of a store's contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Embedding model that produced the vectors.
    pub model: String,
    pub entries: Vec<StoredVector>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<StoredVector>,
    hashes: HashSet<String>,
}

/// In-memory knowledge store.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from a snapshot, dropping duplicate hashes.
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Self {
        let mut inner = Inner::default();
        for entry in snapshot.entries {
            if inner.hashes.insert(entry.chunk.hash.clone()) {
                inner.entries.push(entry);
            }
        }
        Self {
            inner: RwLock::new(inner),
        }
    }

    pub fn snapshot(&self, model: &str) -> Result<IndexSnapshot> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow!("knowledge store lock poisoned"))?;
        Ok(IndexSnapshot {
            model: model.to_string(),
            entries: inner.entries.clone(),
        })
    }
}

#[async_trait]
impl KnowledgeStore for InMemoryStore {
    async fn add(&self, chunk: KnowledgeChunk, vector: Vec<f32>) -> Result<bool> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow!("knowledge store lock poisoned"))?;
        if !inner.hashes.insert(chunk.hash.clone()) {
            return Ok(false);
        }
        inner.entries.push(StoredVector { chunk, vector });
        Ok(true)
    }

    async fn search(&self, query_vec: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow!("knowledge store lock poisoned"))?;
        let mut scored: Vec<ScoredChunk> = inner
            .entries
            .iter()
            .map(|sv| ScoredChunk {
                chunk: sv.chunk.clone(),
                score: cosine_similarity(query_vec, &sv.vector),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn len(&self) -> Result<usize> {
        let inner = self
            .inner
            .read()
            .map_err(|_| anyhow!("knowledge store lock poisoned"))?;
        Ok(inner.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::chunk_markdown;

    fn chunk(text: &str) -> KnowledgeChunk {
        chunk_markdown("k.md", text, "##").remove(0)
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = InMemoryStore::new();
        store.add(chunk("east"), vec![1.0, 0.0]).await.unwrap();
        store.add(chunk("north"), vec![0.0, 1.0]).await.unwrap();
        store.add(chunk("northeast"), vec![0.7, 0.7]).await.unwrap();

        let hits = store.search(&[0.1, 1.0], 2).await.unwrap();
        let texts: Vec<&str> = hits.iter().map(|h| h.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["north", "northeast"]);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejected() {
        let store = InMemoryStore::new();
        assert!(store.add(chunk("same"), vec![1.0]).await.unwrap());
        assert!(!store.add(chunk("same"), vec![0.5]).await.unwrap());
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_top_k_larger_than_store() {
        let store = InMemoryStore::new();
        assert!(store.is_empty().await.unwrap());
        store.add(chunk("only"), vec![1.0]).await.unwrap();
        assert_eq!(store.search(&[1.0], 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_roundtrip() {
        let store = InMemoryStore::new();
        store.add(chunk("a"), vec![1.0, 0.0]).await.unwrap();
        store.add(chunk("b"), vec![0.0, 1.0]).await.unwrap();

        let snap = store.snapshot("test-model").unwrap();
        let json = serde_json::to_string(&snap).unwrap();
        let restored: IndexSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.model, "test-model");

        let store2 = InMemoryStore::from_snapshot(restored);
        assert_eq!(store2.len().await.unwrap(), 2);
        let hits = store2.search(&[0.0, 1.0], 1).await.unwrap();
        assert_eq!(hits[0].chunk.text, "b");
    }
}
