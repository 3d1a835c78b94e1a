//! Embedding generation for semantic retrieval.
//!
//! Provides the injectable [`Embedder`] seam with an OpenAI-backed
//! implementation and a deterministic hash-based fallback for tests and
//! offline runs.

mod fallback;
mod openai_impl;

pub use fallback::HashEmbedder;
pub use openai_impl::OpenAiEmbedder;

use crate::Result;
use async_trait::async_trait;

/// Embedding dimensions of `text-embedding-3-small`.
///
/// This is the authoritative dimension constant across the codebase; the
/// schema's embedding column and the fallback embedder both use it.
pub const EMBED_DIMENSIONS: usize = 1536;

/// Trait for embedding generators.
///
/// Implementations must be thread-safe (`Send + Sync`); embedding calls
/// are suspension points and carry their own deadlines at the call site.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generates embeddings for multiple texts.
    ///
    /// The default implementation calls `embed` for each text
    /// sequentially. Implementations may override this for batch requests.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails for any text.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Computes cosine similarity between two embedding vectors.
///
/// Returns a value between -1.0 (opposite) and 1.0 (identical). Returns
/// 0.0 if vectors have different lengths or zero magnitude. Cosine
/// distance is `1.0 - similarity`.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
