//! Single-query encoding.
//!
//! A query is embedded as-is (no title/abstract join) with the same provider
//! configuration as the corpus, and written as a one-row vector file. No
//! corpus artifacts are read or required.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::embedding::EmbeddingProvider;
use crate::error::{PipelineError, Result};
use crate::vectors::{self, VectorMatrix};

/// Embed `query` with a single-element batch.
pub fn encode_query(provider: &dyn EmbeddingProvider, query: &str) -> Result<Vec<f32>> {
    let mut vectors = provider
        .embed_batch(&[query])
        .map_err(|e| PipelineError::Encoding(format!("{e:#}")))?;
    if vectors.len() != 1 {
        return Err(PipelineError::Encoding(format!(
            "provider returned {} vectors for one query",
            vectors.len()
        )));
    }
    let vector = vectors.remove(0);
    if vector.len() != provider.dimensions() {
        return Err(PipelineError::Encoding(format!(
            "expected {} dimensions, got {}",
            provider.dimensions(),
            vector.len()
        )));
    }
    Ok(vector)
}

/// Write `embedding` as exactly one CSV line at `path`, creating parent
/// directories as needed.
pub fn write_query(path: &Path, embedding: &[f32]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| PipelineError::persistence(parent, e))?;

    let matrix = VectorMatrix::from_flat(1, embedding.len(), embedding.to_vec())?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| PipelineError::persistence(path, e))?;
    vectors::write_vectors_csv(BufWriter::new(tmp.as_file_mut()), &matrix)
        .map_err(|e| PipelineError::csv(path, e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::persistence(path, e.error))?;
    Ok(())
}

/// Encode `query` and persist it at `output_path`.
pub fn generate_query(
    provider: &dyn EmbeddingProvider,
    query: &str,
    output_path: &Path,
) -> Result<PathBuf> {
    let embedding = encode_query(provider, query)?;
    write_query(output_path, &embedding)?;
    tracing::info!(
        path = %output_path.display(),
        model = provider.model_id(),
        dimensions = embedding.len(),
        "query embedding saved"
    );
    Ok(output_path.to_path_buf())
}
