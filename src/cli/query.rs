//! CLI `query` command — embed one query string.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use papervec::config::PapervecConfig;
use papervec::{embedding, query as query_encoder};

use super::ModelArgs;

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Text to embed
    #[arg(long)]
    pub query: String,

    /// Where to write the one-row vector file
    #[arg(long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub model: ModelArgs,
}

/// Embed `args.query` and save it next to (but independent of) the corpus store.
pub async fn query(mut config: PapervecConfig, args: QueryArgs) -> Result<()> {
    args.model.apply(&mut config.embedding);
    let output = args.output.unwrap_or_else(|| config.resolved_query_path());

    println!("Loading model '{}'...", config.embedding.model);
    let embedding_config = config.embedding.clone();
    let text = args.query;
    let path = tokio::task::spawn_blocking(move || {
        let provider = embedding::create_provider(&embedding_config)?;
        query_encoder::generate_query(provider.as_ref(), &text, &output)
    })
    .await?
    .context("query embedding failed")?;

    println!("Embedding saved to {}", path.display());
    Ok(())
}
