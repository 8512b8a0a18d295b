//! Embedding trait and vector similarity.
//!
//! Defines the [`Embedder`] trait that all embedding backends implement,
//! plus [`cosine_similarity`] used by the knowledge store.
//!
//! Concrete HTTP providers (Voyage, OpenAI) live in the `agent-architect`
//! app crate.

use anyhow::Result;
use async_trait::async_trait;

/// A batch text embedder.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"voyage-3"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Embed a single text.
pub async fn embed_one(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>> {
    embedder
        .embed(&[text.to_string()])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
}

/// Cosine similarity of two vectors, in `[-1.0, 1.0]`.
///
/// Empty vectors, vectors of different lengths, and zero vectors score
/// `0.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, sq_a, sq_b) = a
        .iter()
        .zip(b)
        .fold((0.0f32, 0.0f32, 0.0f32), |(dot, sq_a, sq_b), (x, y)| {
            (dot + x * y, sq_a + x * x, sq_b + y * y)
        });

    let norms = (sq_a * sq_b).sqrt();
    if norms < f32::EPSILON {
        0.0
    } else {
        dot / norms
    }
}
