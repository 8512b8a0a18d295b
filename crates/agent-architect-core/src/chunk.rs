//! Heading-boundary chunker for knowledge files.
//!
//! Knowledge files are markdown documents whose sections are introduced
//! by a heading marker (`##` by default). Each section becomes one
//! [`KnowledgeChunk`], so a retrieved chunk is a self-contained topic.
//!
//! Every chunk gets a fresh UUID plus a SHA-256 hash of its text. The hash
//! lets the store skip sections that appear verbatim in more than one file.
//!
//! # Example
//!
//! ```rust
//! use agent_architect_core::chunk::chunk_markdown;
//!
//! let chunks = chunk_markdown(
//!     "patterns.md",
//!     "# Patterns\n## Router\nSend each task to one handler.\n## Pipeline\nChain steps.",
//!     "##",
//! );
//! assert_eq!(chunks.len(), 3);
//! assert_eq!(chunks[1].text, "Router\nSend each task to one handler.");
//! ```

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::KnowledgeChunk;

pub const DEFAULT_DELIMITER: &str = "##";

/// Split `text` on `delimiter`, keeping trimmed, non-empty sections.
///
/// Indices are contiguous from 0. Text with no non-blank content yields
/// no chunks. An empty delimiter keeps the whole text as one chunk.
pub fn chunk_markdown(source: &str, text: &str, delimiter: &str) -> Vec<KnowledgeChunk> {
    let sections: Vec<&str> = if delimiter.is_empty() {
        vec![text]
    } else {
        text.split(delimiter).collect()
    };

    sections
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, s)| make_chunk(source, i as i64, s))
        .collect()
}

/// Hex-encoded SHA-256 of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn make_chunk(source: &str, index: i64, text: &str) -> KnowledgeChunk {
    KnowledgeChunk {
        id: Uuid::new_v4().to_string(),
        source: source.to_string(),
        chunk_index: index,
        text: text.to_string(),
        hash: content_hash(text),
    }
}
