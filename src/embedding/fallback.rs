//! Hash-based fallback embedder.
//!
//! Produces deterministic pseudo-embeddings from lexical overlap. Not
//! semantic; used by tests and offline smoke runs where the OpenAI API is
//! unavailable.

use crate::Result;
use crate::embedding::Embedder;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic hash-based embedder.
///
/// Combines word-level hashing with character trigram hashing and
/// normalizes to unit length, so cosine similarity reflects lexical
/// overlap.
///
/// # Examples
///
/// ```
/// use fisco_rs::embedding::{Embedder, HashEmbedder};
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let embedder = HashEmbedder::new(256);
/// let a = embedder.embed("previsión social").await.unwrap();
/// let b = embedder.embed("previsión social").await.unwrap();
/// assert_eq!(a, b); // Deterministic
/// # });
/// ```
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    /// Creates a new fallback embedder with the specified dimensions.
    #[must_use]
    pub const fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_string(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn generate_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];

        let normalized: String = text
            .chars()
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() {
                    c.to_ascii_lowercase()
                } else {
                    ' '
                }
            })
            .collect();

        for word in normalized.split_whitespace() {
            let hash = Self::hash_string(word);
            let idx = (hash as usize) % self.dimensions;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = 1.0 + ((hash >> 16) & 0xFF) as f32 / 255.0;
            embedding[idx] += sign * magnitude;
        }

        let chars: Vec<char> = normalized.chars().collect();
        if chars.len() >= 3 {
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let hash = Self::hash_string(&trigram);
                let idx = (hash as usize) % self.dimensions;
                let sign = if (hash >> 32) & 1 == 0 { 0.5 } else { -0.5 };
                embedding[idx] += sign;
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for val in &mut embedding {
                *val /= magnitude;
            }
        }

        embedding
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.generate_embedding(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::cosine_similarity;

    const DIMS: usize = 256;

    #[tokio::test]
    async fn test_deterministic() {
        let embedder = HashEmbedder::new(DIMS);
        let a = embedder.embed("previsión social").await.unwrap();
        let b = embedder.embed("previsión social").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_dimensions() {
        let embedder = HashEmbedder::new(DIMS);
        let embedding = embedder.embed("deducción").await.unwrap();
        assert_eq!(embedding.len(), DIMS);
    }

    #[tokio::test]
    async fn test_normalized() {
        let embedder = HashEmbedder::new(DIMS);
        let embedding = embedder.embed("requisitos de deducción").await.unwrap();
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_similar_text_higher_similarity() {
        let embedder = HashEmbedder::new(DIMS);
        let base = embedder.embed("límite de previsión social").await.unwrap();
        let similar = embedder.embed("tope de previsión social").await.unwrap();
        let different = embedder.embed("enajenación de acciones bursátiles").await.unwrap();

        let sim_similar = cosine_similarity(&base, &similar);
        let sim_different = cosine_similarity(&base, &different);
        assert!(
            sim_similar > sim_different,
            "similar text should score higher: {sim_similar} vs {sim_different}"
        );
    }

    #[tokio::test]
    async fn test_empty_text_zero_vector() {
        let embedder = HashEmbedder::new(DIMS);
        let embedding = embedder.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }
}
