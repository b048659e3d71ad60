//! Text-to-vector embedding adapter.
//!
//! Provides the [`EmbeddingProvider`] trait and a local implementation using an
//! ONNX export of a sentence-transformers model (mean pooled, L2-normalized).
//! The provider is created via [`create_provider`] from configuration; model
//! files are located through [`ModelSpec`].

pub mod local;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::config::EmbeddingConfig;
use crate::error::PipelineError;

const HF_BASE_URL: &str = "https://huggingface.co";

/// Trait for embedding text into vectors.
///
/// Output has one vector per input, in input order, each of exactly
/// [`dimensions`](Self::dimensions) values. For a fixed model the output is a
/// pure function of the input text.
/// All methods are synchronous — callers in async contexts should use
/// `tokio::task::spawn_blocking`.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of text strings.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("provider returned no vector for a single input"))
    }

    /// Return the number of dimensions this provider produces.
    fn dimensions(&self) -> usize;

    /// Identifier of the model behind this provider, recorded in store manifests.
    fn model_id(&self) -> &str;
}

/// On-disk and remote locations of a model's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSpec {
    pub id: String,
    pub dir: PathBuf,
}

impl ModelSpec {
    /// `org/name` is cached under `<cache_dir>/org--name/`.
    pub fn resolve(config: &EmbeddingConfig) -> Self {
        let cache_dir = crate::config::expand_tilde(&config.cache_dir);
        Self::in_dir(&config.model, &cache_dir)
    }

    pub fn in_dir(model: &str, cache_dir: &Path) -> Self {
        Self {
            id: model.to_string(),
            dir: cache_dir.join(model.replace('/', "--")),
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join("model.onnx")
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    pub fn model_url(&self) -> String {
        format!("{HF_BASE_URL}/{}/resolve/main/onnx/model.onnx", self.id)
    }

    pub fn tokenizer_url(&self) -> String {
        format!("{HF_BASE_URL}/{}/resolve/main/tokenizer.json", self.id)
    }

    pub fn is_downloaded(&self) -> bool {
        self.model_path().exists() && self.tokenizer_path().exists()
    }
}

/// Create an embedding provider from config.
///
/// Currently only `"local"` is supported (ONNX Runtime). Returns
/// [`PipelineError::ModelLoad`] if the model cannot be loaded — run
/// `papervec model download` first.
pub fn create_provider(
    config: &EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>, PipelineError> {
    match config.provider.as_str() {
        "local" => {
            let provider = local::LocalEmbeddingProvider::new(config)
                .map_err(|e| PipelineError::model_load(&config.model, format!("{e:#}")))?;
            Ok(Box::new(provider))
        }
        other => Err(PipelineError::model_load(
            &config.model,
            format!("unknown embedding provider: {other}. Supported: local"),
        )),
    }
}
