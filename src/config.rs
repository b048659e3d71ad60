use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Model used when nothing else is configured.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PapervecConfig {
    pub log: LogConfig,
    pub embedding: EmbeddingConfig,
    pub build: BuildConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

/// Everything that determines which vector space an embedding lands in.
/// Corpus and query runs must share the same values to stay comparable.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub max_input_length: usize,
    pub cache_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BuildConfig {
    pub input_path: String,
    pub output_dir: String,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    pub output_path: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_papervec_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: DEFAULT_MODEL.into(),
            max_input_length: 512,
            cache_dir,
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            input_path: "data/processed/arxiv-metadata-oai-snapshot.csv".into(),
            output_dir: "embeddings".into(),
            batch_size: 32,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            output_path: "embeddings/queries/query.csv".into(),
        }
    }
}

/// Returns `~/.papervec/`, or `.papervec/` when no home directory is known.
pub fn default_papervec_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".papervec")
}

/// Returns the default config file path: `~/.papervec/config.toml`
pub fn default_config_path() -> PathBuf {
    default_papervec_dir().join("config.toml")
}

impl PapervecConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            PapervecConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides (PAPERVEC_MODEL, PAPERVEC_MODEL_CACHE,
    /// PAPERVEC_BATCH_SIZE, PAPERVEC_LOG_LEVEL).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("PAPERVEC_MODEL") {
            self.embedding.model = val;
        }
        if let Ok(val) = std::env::var("PAPERVEC_MODEL_CACHE") {
            self.embedding.cache_dir = val;
        }
        if let Ok(val) = std::env::var("PAPERVEC_BATCH_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => self.build.batch_size = n,
                _ => warn!(value = %val, "ignoring PAPERVEC_BATCH_SIZE, expected a positive integer"),
            }
        }
        if let Ok(val) = std::env::var("PAPERVEC_LOG_LEVEL") {
            self.log.level = val;
        }
    }

    pub fn resolved_input_path(&self) -> PathBuf {
        expand_tilde(&self.build.input_path)
    }

    pub fn resolved_output_dir(&self) -> PathBuf {
        expand_tilde(&self.build.output_dir)
    }

    pub fn resolved_query_path(&self) -> PathBuf {
        expand_tilde(&self.query.output_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
