//! Knowledge-base data types shared by chunking, the store, and retrieval.

use serde::{Deserialize, Serialize};

/// One section of a knowledge file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    pub id: String,
    /// File the chunk was read from, relative to the knowledge root.
    pub source: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

/// A chunk ranked against a query vector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: KnowledgeChunk,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub score: f32,
}
