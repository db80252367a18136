//! Synchronous ONNX embedding gateway for text-to-vector conversion.
//!
//! Uses bge-small-en-v1.5 by default (384 dimensions) with mean pooling and
//! L2 normalization.

use hf_hub::api::sync::Api;
use ort::inputs;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use parking_lot::Mutex;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::{EmbeddingError, EmbeddingGateway, l2_normalize};
use crate::memory::Metadata;

/// Embedding dimensions for bge-small-en-v1.5 model.
pub const EMBEDDING_DIMS: usize = 384;

/// ONNX embedding gateway backed by a HuggingFace sentence-embedding model.
///
/// `Session::run` needs exclusive access, so the session sits behind a mutex;
/// concurrent `batch_add_memories` chunks serialise on it.
pub struct OnnxGateway {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    requires_token_type_ids: bool,
}

impl OnnxGateway {
    /// Load model from the HF Hub cache or download it on first use.
    ///
    /// Uses `hf_hub::api::sync::Api` for blocking I/O. Files are cached
    /// locally in the HF Hub cache and only downloaded once.
    pub fn new(model_id: &str) -> Result<Self, EmbeddingError> {
        info!(model_id, "loading ONNX embedding model");
        let api = Api::new()?;
        let repo = api.model(model_id.to_string());

        let model_path = repo
            .get("onnx/model.onnx")
            .or_else(|_| repo.get("model.onnx"))?;
        let tokenizer_path = repo.get("tokenizer.json")?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_path)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: 512,
                ..Default::default()
            }))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level1)
            .map_err(|e| ort::Error::new_with_code(e.code(), e.message()))?
            .commit_from_file(&model_path)?;

        let requires_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");
        debug!(requires_token_type_ids, "embedding session ready");

        Ok(OnnxGateway {
            session: Mutex::new(session),
            tokenizer,
            requires_token_type_ids,
        })
    }

    fn embed_with(&self, session: &mut Session, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Ok(vec![0.0f32; EMBEDDING_DIMS]);
        }

        let encoding = self.tokenizer.encode(text, true)?;
        let input_ids = encoding.get_ids();
        let attention_mask = encoding.get_attention_mask();

        if input_ids.is_empty() {
            return Ok(vec![0.0f32; EMBEDDING_DIMS]);
        }

        let seq_len = input_ids.len();

        let input_ids_vec: Vec<i64> = input_ids.iter().map(|&id| id as i64).collect();
        let attention_mask_vec: Vec<i64> = attention_mask.iter().map(|&m| m as i64).collect();

        let input_ids_tensor = Tensor::from_array(([1usize, seq_len], input_ids_vec))?;
        let attention_mask_tensor = Tensor::from_array(([1usize, seq_len], attention_mask_vec))?;

        let outputs = if self.requires_token_type_ids {
            let token_type_ids_tensor =
                Tensor::from_array(([1usize, seq_len], vec![0i64; seq_len]))?;
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            ])?
        } else {
            session.run(inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            ])?
        };

        let (shape, data) = outputs
            .get("last_hidden_state")
            .or_else(|| outputs.get("token_embeddings"))
            .ok_or_else(|| {
                EmbeddingError::Inference(
                    "Output tensor 'last_hidden_state' or 'token_embeddings' not found".to_string(),
                )
            })?
            .try_extract_tensor::<f32>()?;

        if shape.len() != 3 {
            return Err(EmbeddingError::Inference(format!(
                "Expected 3D output (batch, seq_len, hidden), got {:?}",
                shape
            )));
        }

        let batch_size = shape[0] as usize;
        let hidden_dim = shape[2] as usize;
        if batch_size != 1 || hidden_dim != EMBEDDING_DIMS {
            return Err(EmbeddingError::Inference(format!(
                "Unexpected output shape: {:?}, batch=1, hidden={} expected",
                shape, EMBEDDING_DIMS
            )));
        }

        Ok(mean_pool(data, attention_mask, seq_len, hidden_dim))
    }
}

impl EmbeddingGateway for OnnxGateway {
    fn embed(&self, text: &str, _metadata: Option<&Metadata>) -> Result<Vec<f32>, EmbeddingError> {
        let mut session = self.session.lock();
        self.embed_with(&mut session, text)
    }

    fn batch_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut session = self.session.lock();
        texts
            .iter()
            .map(|text| self.embed_with(&mut session, text))
            .collect()
    }
}

/// Attention-masked mean over token vectors, then L2-normalised.
fn mean_pool(data: &[f32], attention_mask: &[u32], seq_len: usize, hidden_dim: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden_dim];

    for (token_idx, chunk) in data.chunks(hidden_dim).take(seq_len).enumerate() {
        let mask_value = attention_mask.get(token_idx).copied().unwrap_or(0) as f32;
        for (pooled_value, value) in pooled.iter_mut().zip(chunk) {
            *pooled_value += value * mask_value;
        }
    }

    let mask_sum: f32 = attention_mask
        .iter()
        .take(seq_len)
        .map(|&m| m as f32)
        .sum::<f32>()
        .max(1e-9);

    for value in pooled.iter_mut() {
        *value /= mask_sum;
    }

    l2_normalize(&pooled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_masked_tokens() {
        // two tokens of width 2; second token is padding
        let data = [3.0, 4.0, 100.0, 100.0];
        let pooled = mean_pool(&data, &[1, 0], 2, 2);
        assert!((pooled[0] - 0.6).abs() < 1e-6);
        assert!((pooled[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_mean_pool_averages_tokens() {
        let data = [1.0, 0.0, 0.0, 1.0];
        let pooled = mean_pool(&data, &[1, 1], 2, 2);
        assert!((pooled[0] - pooled[1]).abs() < 1e-6);
        let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[ignore]
    #[test]
    fn test_integration_simple_text() {
        let gateway = OnnxGateway::new("BAAI/bge-small-en-v1.5").expect("load model");
        let embedding = gateway.embed("hello world", None).expect("embed text");

        assert_eq!(embedding.len(), EMBEDDING_DIMS);
        let norm: f32 = embedding.iter().map(|&x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01, "Embedding should be L2-normalized");
    }

    #[ignore]
    #[test]
    fn test_integration_batch_matches_single() {
        let gateway = OnnxGateway::new("BAAI/bge-small-en-v1.5").expect("load model");
        let texts = vec!["the cat sat".to_string(), "a dog barked".to_string()];
        let batch = gateway.batch_embed(&texts).expect("batch embed");
        let single = gateway.embed("a dog barked", None).expect("embed");

        assert_eq!(batch.len(), 2);
        for (a, b) in batch[1].iter().zip(single.iter()) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[ignore]
    #[test]
    fn test_integration_empty_string() {
        let gateway = OnnxGateway::new("BAAI/bge-small-en-v1.5").expect("load model");
        let embedding = gateway.embed("", None).expect("embed empty text");
        assert_eq!(embedding, vec![0.0f32; EMBEDDING_DIMS]);
    }
}
