//! The embedding contract consumed by the ingestion pipeline and the
//! retrieval router.
//!
//! Training or hosting an embedding model is explicitly out of scope (§1
//! Non-goals); the core only consumes an `Embedder` capability interface.
//! [`HashEmbedder`] is the one concrete implementation shipped for tests and
//! as a deterministic reference — production wires in a real remote model
//! behind the same trait.

mod hash;

pub use hash::HashEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Default embedding dimension assumed when nothing else has been stamped.
/// The vector adapter still adapts to whatever an embedder actually returns.
pub const DEFAULT_DIMENSION: usize = 768;

/// Capability interface for a remote or local embedding provider (§6).
///
/// Implementations may perform remote calls with non-negligible latency;
/// [`Embedder::embed`] batch sizes of 50-100 are assumed by the ingestion
/// pipeline's batching.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds a batch of texts, preserving order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embeds a single text. Default implementation delegates to [`Self::embed`].
    async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(std::slice::from_ref(&text.to_string())).await?;
        Ok(vectors.pop().unwrap_or_default())
    }

    /// Name of the underlying model, stamped onto chunks as `embedding_model`.
    fn model(&self) -> &str;

    /// The dimension this embedder produces, stamped onto chunks as
    /// `embedding_version` alongside `model()`.
    fn dimension(&self) -> usize;
}

/// Computes cosine similarity between two vectors. Returns `0.0` for
/// mismatched lengths or zero-magnitude vectors rather than panicking.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_mismatched_lengths_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn cosine_similarity_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
