//! Embedding gateway: the seam between the memory store and whatever turns
//! text into vectors.
//!
//! The store only ever talks to [`EmbeddingGateway`]. Two implementations ship
//! with the crate:
//! - [`OnnxGateway`]: local sentence-embedding model run through ONNX Runtime
//! - [`KeywordGateway`]: deterministic term-count embedder for tests and demos

mod keyword;
mod onnx;

pub use keyword::KeywordGateway;
pub use onnx::{EMBEDDING_DIMS, OnnxGateway};

use thiserror::Error;

use crate::memory::Metadata;

/// Errors produced by an embedding gateway.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// The provider refused or failed the request.
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// ONNX inference produced unusable output.
    #[error("Inference error: {0}")]
    Inference(String),

    /// Tokenization error.
    #[error("Tokenization error: {0}")]
    Tokenization(#[from] tokenizers::Error),

    /// ONNX session error.
    #[error("ONNX session error: {0}")]
    Onnx(#[from] ort::Error),

    /// HuggingFace Hub error.
    #[error("HuggingFace Hub error: {0}")]
    HfHub(#[from] hf_hub::api::sync::ApiError),

    /// Similarity requested on an empty vector.
    #[error("Cannot compute similarity with empty vector")]
    EmptyVector,

    /// Vectors of different lengths.
    #[error("Mismatched dimensions: expected {expected} dimensions, got {actual} dimensions")]
    MismatchedDimensions { expected: usize, actual: usize },

    /// Vector contains NaN or infinite values.
    #[error("Invalid embedding: {0}")]
    InvalidEmbedding(String),
}

/// Text-to-vector provider consumed by the memory store.
///
/// Implementations must return vectors of one fixed dimension. Vectors need
/// not be normalised and may be all zeros (a zero vector scores 0.0 against
/// everything).
///
/// The built-in flat index ranks candidates with [`cosine_similarity`], the
/// default `similarity`. A gateway that overrides `similarity` must keep it
/// order-compatible with cosine, or searches with and without acceleration
/// can pick different candidates.
///
/// `similarity` is called while the store holds its lock. It must not call
/// back into the store that invoked it; doing so on the same thread panics
/// with a `RefCell` borrow error.
pub trait EmbeddingGateway: Send + Sync {
    /// Embed a single text. `metadata` is passed through for providers that
    /// use it (e.g. to pick a model per tenant); most ignore it.
    fn embed(&self, text: &str, metadata: Option<&Metadata>) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts, returning vectors in input order.
    fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text, None)).collect()
    }

    /// Canonical similarity score used by both search paths. Runs under the
    /// store lock; see the trait docs.
    fn similarity(&self, a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
        cosine_similarity(a, b)
    }
}

/// Compute cosine similarity between two embedding vectors.
///
/// A zero vector has similarity 0.0 with everything.
///
/// # Errors
///
/// - Returns `EmbeddingError::EmptyVector` if either vector is empty.
/// - Returns `EmbeddingError::MismatchedDimensions` if vectors have different lengths.
/// - Returns `EmbeddingError::InvalidEmbedding` if any value is NaN or infinite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EmbeddingError> {
    if a.is_empty() || b.is_empty() {
        return Err(EmbeddingError::EmptyVector);
    }

    if a.len() != b.len() {
        return Err(EmbeddingError::MismatchedDimensions {
            expected: a.len(),
            actual: b.len(),
        });
    }

    if a.iter().chain(b.iter()).any(|x| !x.is_finite()) {
        return Err(EmbeddingError::InvalidEmbedding(
            "Vector contains NaN or infinite values".to_string(),
        ));
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let norm_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }

    Ok(dot / (norm_a * norm_b))
}

pub(crate) fn l2_normalize(vec: &[f32]) -> Vec<f32> {
    let norm: f32 = vec.iter().map(|&x| x * x).sum::<f32>().sqrt();
    let norm = norm.max(1e-9);

    vec.iter().map(|&x| x / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ConstantGateway;

    impl EmbeddingGateway for ConstantGateway {
        fn embed(&self, text: &str, _metadata: Option<&Metadata>) -> Result<Vec<f32>, EmbeddingError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    #[test]
    fn test_default_batch_embed_preserves_order() {
        let gateway = ConstantGateway;
        let texts = vec!["a".to_string(), "abc".to_string(), "ab".to_string()];
        let vectors = gateway.batch_embed(&texts).unwrap();
        let firsts: Vec<f32> = vectors.iter().map(|v| v[0]).collect();
        assert_eq!(firsts, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_default_similarity_is_cosine() {
        let gateway = ConstantGateway;
        let score = gateway.similarity(&[1.0, 0.0], &[1.0, 0.0]).unwrap();
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0f32; 384];
        let similarity = cosine_similarity(&a, &a).unwrap();
        assert!((similarity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let similarity = cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap();
        assert!(similarity.abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let similarity = cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]).unwrap();
        assert!((similarity + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let similarity = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]).unwrap();
        assert_eq!(similarity, 0.0);
    }

    #[test]
    fn test_cosine_similarity_empty_vector() {
        let result = cosine_similarity(&[], &[1.0]);
        assert!(matches!(result, Err(EmbeddingError::EmptyVector)));
    }

    #[test]
    fn test_cosine_similarity_mismatched_lengths() {
        let result = cosine_similarity(&[1.0, 2.0], &[1.0]);
        assert!(matches!(
            result,
            Err(EmbeddingError::MismatchedDimensions {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_cosine_similarity_nan() {
        let result = cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]);
        assert!(matches!(result, Err(EmbeddingError::InvalidEmbedding(_))));
    }

    #[test]
    fn test_l2_normalize_magnitude() {
        let normalized = l2_normalize(&[3.0, 4.0]);
        let norm: f32 = normalized.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_l2_normalize_zero_vector() {
        assert_eq!(l2_normalize(&[0.0, 0.0, 0.0]), vec![0.0, 0.0, 0.0]);
    }
}
