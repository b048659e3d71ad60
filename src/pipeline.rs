//! Batch pipeline driver.
//!
//! [`encode_corpus`] splits the normalized corpus into contiguous chunks, runs
//! the provider once per chunk and concatenates results in chunk order.
//! Chunk size only affects memory use and throughput; the resulting matrix is
//! the same for every `batch_size`.
//!
//! [`build_index`] runs the whole flow: load → normalize → encode → persist.

use std::fmt;
use std::path::PathBuf;

use crate::config::PapervecConfig;
use crate::corpus::{self, MetadataRow, NormalizedRecord};
use crate::embedding::EmbeddingProvider;
use crate::error::{PipelineError, Result};
use crate::progress::{ChunkProgress, ProgressObserver};
use crate::store::{EmbeddingStore, StoreManifest};
use crate::vectors::VectorMatrix;

/// Stages of one pipeline run. Each is entered at most once, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Initialized,
    ModelLoaded,
    Encoding,
    Persisted,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::ModelLoaded => "model_loaded",
            Self::Encoding => "encoding",
            Self::Persisted => "persisted",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs of a corpus build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub input_path: PathBuf,
    pub output_dir: PathBuf,
    pub batch_size: usize,
    /// Recorded in the manifest; truncation itself happens inside the provider.
    pub max_input_length: usize,
}

impl BuildOptions {
    pub fn from_config(config: &PapervecConfig) -> Self {
        Self {
            input_path: config.resolved_input_path(),
            output_dir: config.resolved_output_dir(),
            batch_size: config.build.batch_size,
            max_input_length: config.embedding.max_input_length,
        }
    }
}

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Rows parsed from the input table.
    pub loaded: usize,
    /// Rows that survived normalization and were embedded.
    pub embedded: usize,
    pub dimension: usize,
    pub vectors_path: PathBuf,
    pub index_path: PathBuf,
}

impl BuildSummary {
    pub fn dropped(&self) -> usize {
        self.loaded - self.embedded
    }
}

/// Number of chunks `total` records split into at `batch_size`.
pub fn chunk_count(total: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        0
    } else {
        total.div_ceil(batch_size)
    }
}

/// Encode `records` in chunks of at most `batch_size`, preserving order.
pub fn encode_corpus(
    provider: &dyn EmbeddingProvider,
    records: &[NormalizedRecord],
    batch_size: usize,
    observer: &dyn ProgressObserver,
) -> Result<VectorMatrix> {
    if batch_size == 0 {
        return Err(PipelineError::data("batch_size must be a positive integer"));
    }

    let dimension = provider.dimensions();
    let total = records.len();
    let chunks = chunk_count(total, batch_size);

    observer.on_start(total);
    let mut flat: Vec<f32> = Vec::with_capacity(total * dimension);
    let mut done = 0usize;

    for (i, chunk) in records.chunks(batch_size).enumerate() {
        let texts: Vec<&str> = chunk.iter().map(|r| r.text.as_str()).collect();
        let vectors = provider
            .embed_batch(&texts)
            .map_err(|e| PipelineError::Encoding(format!("chunk {}/{chunks}: {e:#}", i + 1)))?;

        if vectors.len() != chunk.len() {
            return Err(PipelineError::Encoding(format!(
                "chunk {}/{chunks}: provider returned {} vectors for {} inputs",
                i + 1,
                vectors.len(),
                chunk.len()
            )));
        }
        for (offset, vector) in vectors.into_iter().enumerate() {
            if vector.len() != dimension {
                return Err(PipelineError::Encoding(format!(
                    "record {}: expected {dimension} dimensions, got {}",
                    done + offset,
                    vector.len()
                )));
            }
            flat.extend(vector);
        }

        done += chunk.len();
        observer.on_chunk(ChunkProgress {
            chunk: i + 1,
            chunks,
            done,
            total,
        });
    }
    observer.on_finish();

    VectorMatrix::from_flat(total, dimension, flat)
}

/// Metadata rows for `records`, in the same order.
pub fn metadata_index(records: &[NormalizedRecord]) -> Vec<MetadataRow> {
    records.iter().map(|r| r.record.metadata()).collect()
}

/// Run a full corpus build with an already-loaded provider.
///
/// Nothing is written unless every record was encoded; a failed write leaves
/// the previous store in place.
pub fn build_index(
    options: &BuildOptions,
    provider: &dyn EmbeddingProvider,
    observer: &dyn ProgressObserver,
) -> Result<BuildSummary> {
    if options.batch_size == 0 {
        return Err(PipelineError::data("batch_size must be a positive integer"));
    }
    tracing::debug!(stage = %PipelineStage::Initialized, input = %options.input_path.display());
    tracing::info!(
        stage = %PipelineStage::ModelLoaded,
        model = provider.model_id(),
        dimensions = provider.dimensions(),
        "model ready"
    );

    let records = corpus::load_corpus(&options.input_path)?;
    let loaded = records.len();
    let normalized = corpus::normalize(records);
    tracing::info!(
        records = normalized.len(),
        dropped = loaded - normalized.len(),
        "corpus ready"
    );

    tracing::info!(
        stage = %PipelineStage::Encoding,
        batch_size = options.batch_size,
        chunks = chunk_count(normalized.len(), options.batch_size),
        "encoding corpus"
    );
    let matrix = encode_corpus(provider, &normalized, options.batch_size, observer)?;
    let metadata = metadata_index(&normalized);

    let store = EmbeddingStore::new(&options.output_dir);
    let manifest = StoreManifest::new(provider.model_id(), options.max_input_length, &matrix);
    store.write(&matrix, &metadata, &manifest)?;

    tracing::info!(
        stage = %PipelineStage::Persisted,
        rows = matrix.rows(),
        dir = %store.dir().display(),
        "build complete"
    );

    Ok(BuildSummary {
        loaded,
        embedded: matrix.rows(),
        dimension: matrix.dimension(),
        vectors_path: store.vectors_path(),
        index_path: store.index_path(),
    })
}
