//! Read-back check of a persisted store.

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::store::EmbeddingStore;

/// Result of a successful [`verify_store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReport {
    pub rows: usize,
    pub dimension: usize,
    pub model: Option<String>,
    pub max_input_length: Option<usize>,
    pub created_at: Option<String>,
}

/// Confirm that the vector matrix and metadata index in `dir` are row-aligned
/// and agree with the manifest, when there is one.
pub fn verify_store(dir: &Path) -> Result<StoreReport> {
    let store = EmbeddingStore::new(dir);
    let (matrix, metadata) = store.read()?;

    if matrix.rows() != metadata.len() {
        return Err(PipelineError::data(format!(
            "misaligned store: {} vectors vs {} metadata rows",
            matrix.rows(),
            metadata.len()
        )));
    }

    let manifest = store.read_manifest()?;
    if let Some(m) = &manifest {
        if m.rows != matrix.rows() {
            return Err(PipelineError::data(format!(
                "manifest expects {} rows, artifacts have {}",
                m.rows,
                matrix.rows()
            )));
        }
        // An empty matrix read from disk has no width to compare.
        if !matrix.is_empty() && m.dimension != matrix.dimension() {
            return Err(PipelineError::data(format!(
                "manifest expects dimension {}, vectors have {}",
                m.dimension,
                matrix.dimension()
            )));
        }
    } else {
        tracing::warn!(dir = %dir.display(), "store has no manifest");
    }

    Ok(StoreReport {
        rows: matrix.rows(),
        dimension: manifest
            .as_ref()
            .map(|m| m.dimension)
            .unwrap_or_else(|| matrix.dimension()),
        model: manifest.as_ref().map(|m| m.model.clone()),
        max_input_length: manifest.as_ref().map(|m| m.max_input_length),
        created_at: manifest.map(|m| m.created_at),
    })
}
