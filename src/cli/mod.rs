pub mod build;
pub mod convert;
pub mod query;
pub mod verify;

use anyhow::Result;
use clap::Args;
use papervec::config::EmbeddingConfig;
use papervec::fetch::{self, HttpFetcher};

/// Model options shared by every command that loads or fetches a model.
#[derive(Args, Debug, Clone, Default)]
pub struct ModelArgs {
    /// Model identifier, e.g. sentence-transformers/all-MiniLM-L6-v2
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum input length in tokens; longer inputs are truncated from the end
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_length: Option<u32>,
}

impl ModelArgs {
    pub fn apply(&self, config: &mut EmbeddingConfig) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(max_length) = self.max_length {
            config.max_input_length = max_length as usize;
        }
    }
}

/// Download the ONNX embedding model and tokenizer to the cache directory.
pub async fn model_download(config: &EmbeddingConfig) -> Result<()> {
    println!("Fetching model '{}'...", config.model);
    let spec = fetch::download_model(config, &HttpFetcher::new()).await?;
    println!("Model ready at {}", spec.dir.display());
    Ok(())
}
