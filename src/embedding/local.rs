//! Local ONNX Runtime embedding provider.
//!
//! Implements [`EmbeddingProvider`] for sentence-transformers style ONNX exports
//! via `ort`. Handles tokenization (with end truncation at the configured
//! maximum input length), inference, mean pooling, and L2 normalization.

use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{EmbeddingProvider, ModelSpec};
use crate::config::EmbeddingConfig;

/// Local ONNX-based embedding provider.
pub struct LocalEmbeddingProvider {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    dimensions: usize,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex.
// The Mutex guarantees exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        anyhow::ensure!(
            config.max_input_length > 0,
            "max_input_length must be positive"
        );

        let spec = ModelSpec::resolve(config);
        let model_path = spec.model_path();
        let tokenizer_path = spec.tokenizer_path();

        anyhow::ensure!(
            model_path.exists(),
            "ONNX model not found at {}. Run `papervec model download` first.",
            model_path.display()
        );
        anyhow::ensure!(
            tokenizer_path.exists(),
            "Tokenizer not found at {}. Run `papervec model download` first.",
            tokenizer_path.display()
        );

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;

        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;

        // Default direction is Right: long inputs lose their tail.
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: config.max_input_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            strategy: tokenizers::PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        tracing::info!(
            tokenizer = %tokenizer_path.display(),
            max_input_length = config.max_input_length,
            "tokenizer loaded"
        );

        let mut provider = Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.model.clone(),
            dimensions: 0,
        };

        // One throwaway encode both proves the graph runs and tells us its width.
        let probe = provider
            .run_batch(&["dimension probe"])
            .context("model failed its first inference")?;
        provider.dimensions = probe.first().map(Vec::len).unwrap_or(0);
        anyhow::ensure!(provider.dimensions > 0, "model produced empty embeddings");

        tracing::info!(model = %provider.model_id, dimensions = provider.dimensions, "embedding model ready");
        Ok(provider)
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        // Step 1: Tokenize
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let batch_size = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        // Step 2: Build flat input tensors as i64
        let mut input_ids_flat = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask_flat = Vec::with_capacity(batch_size * seq_len);

        for encoding in &encodings {
            for &id in encoding.get_ids() {
                input_ids_flat.push(id as i64);
            }
            for &mask in encoding.get_attention_mask() {
                attention_mask_flat.push(mask as i64);
            }
        }

        let shape = vec![batch_size as i64, seq_len as i64];
        let input_ids_tensor =
            Tensor::from_array((shape.clone(), input_ids_flat.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask_flat.clone().into_boxed_slice()))?;
        // token_type_ids: all zeros (single sentence, no segment B)
        let token_type_ids = vec![0i64; batch_size * seq_len];
        let token_type_ids_tensor =
            Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

        // Step 3: Run ONNX inference
        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;

        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor,
            "token_type_ids" => token_type_ids_tensor,
        })?;

        // Step 4: Extract token embeddings — shape [batch, seq_len, hidden]
        // The output name varies by ONNX export. Try common names, fall back to index 0.
        let token_emb_value = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);

        let (shape, data) = token_emb_value
            .try_extract_tensor::<f32>()
            .context("failed to extract token_embeddings tensor")?;

        let dims: &[i64] = &shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] == batch_size as i64 && dims[2] > 0,
            "unexpected token_embeddings shape: {dims:?}, expected [{batch_size}, seq, hidden]"
        );
        anyhow::ensure!(
            self.dimensions == 0 || dims[2] as usize == self.dimensions,
            "model width changed from {} to {}",
            self.dimensions,
            dims[2]
        );
        let hidden_dim = dims[2] as usize;
        let actual_seq_len = dims[1] as usize;

        Ok(mean_pool(data, &attention_mask_flat, batch_size, seq_len, actual_seq_len, hidden_dim))
    }
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.run_batch(texts)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Attention-masked mean pooling over `[batch, seq, hidden]` token embeddings,
/// followed by L2 normalization of each pooled row.
fn mean_pool(
    data: &[f32],
    attention_mask: &[i64],
    batch_size: usize,
    mask_seq_len: usize,
    seq_len: usize,
    hidden_dim: usize,
) -> Vec<Vec<f32>> {
    let mut results = Vec::with_capacity(batch_size);
    for b in 0..batch_size {
        let mut sum = vec![0.0f32; hidden_dim];
        let mut count = 0.0f32;

        for s in 0..seq_len.min(mask_seq_len) {
            let mask = attention_mask[b * mask_seq_len + s] as f32;
            if mask > 0.0 {
                let offset = (b * seq_len + s) * hidden_dim;
                for d in 0..hidden_dim {
                    sum[d] += data[offset + d] * mask;
                }
                count += mask;
            }
        }

        if count > 0.0 {
            for d in 0..hidden_dim {
                sum[d] /= count;
            }
        }

        results.push(l2_normalize(&sum));
    }
    results
}

/// L2-normalize a vector. Returns a zero vector if the input norm is zero.
fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
