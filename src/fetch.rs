//! Remote resource fetching.
//!
//! The pipeline never talks to the network itself; model files arrive through a
//! [`Fetcher`]. [`HttpFetcher`] is the production implementation; tests swap in
//! one that writes local fixtures.

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;

use crate::config::EmbeddingConfig;
use crate::embedding::ModelSpec;

pub trait Fetcher {
    /// Fetch `url` into `dest`. `dest` must only appear once complete.
    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Plain HTTP(S) download with a progress bar. Uses atomic write (tmp + rename).
#[derive(Debug, Default, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("HTTP request failed for {url}"))?;

        anyhow::ensure!(
            response.status().is_success(),
            "download of {url} failed with HTTP {}",
            response.status()
        );

        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("  {bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                {
                    pb.set_style(style.progress_chars("##-"));
                }
                pb
            }
            None => ProgressBar::new_spinner(),
        };

        let tmp_path = dest.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

        while let Some(chunk) = response.chunk().await.context("error reading response")? {
            file.write_all(&chunk)
                .await
                .context("error writing to file")?;
            pb.inc(chunk.len() as u64);
        }

        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp_path, dest)
            .await
            .context("failed to rename temp file")?;

        pb.finish_and_clear();
        Ok(())
    }
}

/// Make sure the configured model's ONNX graph and tokenizer are in the cache.
/// Files already present are left alone.
pub async fn download_model<F: Fetcher>(config: &EmbeddingConfig, fetcher: &F) -> Result<ModelSpec> {
    let spec = ModelSpec::resolve(config);
    std::fs::create_dir_all(&spec.dir)
        .with_context(|| format!("failed to create cache dir: {}", spec.dir.display()))?;

    let files = [
        ("model.onnx", spec.model_url(), spec.model_path()),
        ("tokenizer.json", spec.tokenizer_url(), spec.tokenizer_path()),
    ];
    for (name, url, path) in files {
        if path.exists() {
            tracing::info!(file = name, path = %path.display(), "already downloaded");
            continue;
        }
        tracing::info!(file = name, %url, "downloading");
        fetcher
            .fetch(&url, &path)
            .await
            .with_context(|| format!("failed to fetch {name} for {}", spec.id))?;
    }

    Ok(spec)
}
