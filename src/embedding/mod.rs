//! Deterministic text vectors for the Qdrant-backed search index.
//!
//! Projections are keyed by source document and looked up by point id, so the
//! vector only needs to be stable for a given text. No model is involved.

use thiserror::Error;

/// Errors raised while encoding text.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The configured dimension cannot hold a vector.
    #[error("Failed to generate search vector: {0}")]
    GenerationFailed(String),
}

/// Hashes bytes of a text into a fixed-size, L2-normalized vector.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Encode `text`. Empty text yields the zero vector.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.dimension == 0 {
            return Err(EmbeddingError::GenerationFailed(
                "vector dimension must be greater than zero".to_string(),
            ));
        }

        let mut vector = vec![0.0_f32; self.dimension];
        for (idx, byte) in text.bytes().enumerate() {
            vector[idx % self.dimension] += f32::from(byte) / 255.0;
        }

        let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vectors_are_normalized_and_stable() {
        let embedder = HashingEmbedder::new(16);
        let first = embedder.embed("Intro to Rust").unwrap();
        assert_eq!(first.len(), 16);
        assert_eq!(first, embedder.embed("Intro to Rust").unwrap());

        let norm: f32 = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let vector = HashingEmbedder::new(4).embed("").unwrap();
        assert!(vector.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            HashingEmbedder::new(0).embed("x"),
            Err(EmbeddingError::GenerationFailed(_))
        ));
    }
}
