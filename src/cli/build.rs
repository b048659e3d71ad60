//! CLI `build` command — embed the corpus and publish the store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use papervec::config::PapervecConfig;
use papervec::embedding::{self, EmbeddingProvider};
use papervec::pipeline::{self, BuildOptions};
use papervec::progress::ProgressBarObserver;

use super::ModelArgs;

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Input CSV with id,title,abstract,authors,categories,update_date
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Directory for vectors.csv, index.csv and manifest.json
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Records per model invocation
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub batch_size: Option<u32>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Build the vector matrix and metadata index for the configured corpus.
pub async fn build(mut config: PapervecConfig, args: BuildArgs) -> Result<()> {
    args.model.apply(&mut config.embedding);
    let mut options = BuildOptions::from_config(&config);
    if let Some(input) = args.input {
        options.input_path = input;
    }
    if let Some(dir) = args.output_dir {
        options.output_dir = dir;
    }
    if let Some(batch_size) = args.batch_size {
        options.batch_size = batch_size as usize;
    }

    println!("Loading model '{}'...", config.embedding.model);
    let embedding_config = config.embedding.clone();
    let provider: Arc<dyn EmbeddingProvider> = Arc::from(
        tokio::task::spawn_blocking(move || embedding::create_provider(&embedding_config))
            .await?
            .context("failed to create embedding provider")?,
    );

    println!(
        "Embedding {} with batch size {}...",
        options.input_path.display(),
        options.batch_size
    );

    let summary = tokio::task::spawn_blocking(move || {
        let observer = ProgressBarObserver::new();
        pipeline::build_index(&options, provider.as_ref(), &observer)
    })
    .await?
    .context("build failed")?;

    println!(
        "Embedded {} of {} records ({} dropped, {} dimensions).",
        summary.embedded,
        summary.loaded,
        summary.dropped(),
        summary.dimension
    );
    println!("Vectors saved to {}", summary.vectors_path.display());
    println!("Metadata saved to {}", summary.index_path.display());
    Ok(())
}
