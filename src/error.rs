//! Error taxonomy for the embedding pipeline.
//!
//! Every variant is terminal: nothing in this crate retries. Per-row problems in
//! the input (blank titles, unparseable rows) are not errors and never reach
//! this type.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Malformed or structurally incomplete input.
    #[error("data error: {0}")]
    Data(String),

    /// The embedding model could not be resolved or loaded.
    #[error("failed to load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },

    /// The loaded model failed while encoding a chunk.
    #[error("encoding failed: {0}")]
    Encoding(String),

    /// An artifact could not be written or read back.
    #[error("persistence error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV-level failure while writing or reading an artifact.
    #[error("csv error at {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    pub fn data(msg: impl Into<String>) -> Self {
        Self::Data(msg.into())
    }

    pub fn model_load(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ModelLoad {
            model: model.into(),
            reason: reason.to_string(),
        }
    }

    pub fn persistence(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True for failures that happened while touching the output artifacts.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. } | Self::Csv { .. })
    }
}
