//! Hash-based deterministic embedder.
//!
//! Generates reproducible pseudo-embeddings from word- and trigram-level
//! hashing, clustered by lexical overlap rather than semantics. This is the
//! one concrete [`Embedder`] shipped by the core; a real remote model is an
//! external collaborator wired in behind the same trait.

use super::Embedder;
use crate::error::Result;
use rayon::prelude::*;
use std::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

/// Deterministic, lexical-overlap embedder.
pub struct HashEmbedder {
    dimension: usize,
    model_name: String,
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of `dimension` length.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_name: format!("hash-embed-v1/{dimension}"),
        }
    }

    fn hash_str(s: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        s.hash(&mut hasher);
        hasher.finish()
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn generate(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimension];

        let normalized: String = text
            .chars()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c.to_ascii_lowercase() } else { ' ' })
            .collect();

        for word in normalized.split_whitespace() {
            let hash = Self::hash_str(word);
            let idx = (hash as usize) % self.dimension;
            let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
            let magnitude = 1.0 + ((hash >> 16) & 0xFF) as f32 / 255.0;
            embedding[idx] += sign * magnitude;
        }

        let chars: Vec<char> = normalized.chars().collect();
        if chars.len() >= 3 {
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let hash = Self::hash_str(&trigram);
                let idx = (hash as usize) % self.dimension;
                let sign = if (hash >> 32) & 1 == 0 { 0.5 } else { -0.5 };
                embedding[idx] += sign;
            }
        }

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for v in &mut embedding {
                *v /= magnitude;
            }
        }
        embedding
    }
}

#[async_trait::async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.par_iter().map(|t| self.generate(t)).collect())
    }

    fn model(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_across_calls() {
        let embedder = HashEmbedder::new(64);
        let a = embedder.embed_single("hello world").await.unwrap();
        let b = embedder.embed_single("hello world").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn produces_declared_dimension() {
        let embedder = HashEmbedder::new(128);
        let v = embedder.embed_single("anything").await.unwrap();
        assert_eq!(v.len(), 128);
    }

    #[tokio::test]
    async fn is_unit_normalized() {
        let embedder = HashEmbedder::new(64);
        let v = embedder.embed_single("hello world").await.unwrap();
        let mag: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((mag - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn similar_text_is_more_similar_than_unrelated() {
        let embedder = HashEmbedder::new(128);
        let base = embedder.embed_single("the quick brown fox").await.unwrap();
        let similar = embedder.embed_single("the quick brown dog").await.unwrap();
        let different = embedder.embed_single("completely unrelated text").await.unwrap();
        assert!(super::super::cosine_similarity(&base, &similar) > super::super::cosine_similarity(&base, &different));
    }

    #[tokio::test]
    async fn embed_batch_preserves_order_and_count() {
        let embedder = HashEmbedder::new(32);
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let vecs = embedder.embed(&texts).await.unwrap();
        assert_eq!(vecs.len(), 3);
        for v in &vecs {
            assert_eq!(v.len(), 32);
        }
    }

    #[tokio::test]
    async fn empty_text_is_zero_vector() {
        let embedder = HashEmbedder::new(16);
        let v = embedder.embed_single("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }
}
