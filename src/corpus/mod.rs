//! Corpus loading and text normalization.
//!
//! [`load_corpus`] reads the input table, [`normalize`] drops records without a
//! title or abstract and derives the text to embed. Unparseable rows are skipped,
//! not fatal; a table that lacks a required column is.

pub mod convert;
pub mod types;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::{PipelineError, Result};
pub use types::{DocumentRecord, MetadataRow, NormalizedRecord};
use types::REQUIRED_COLUMNS;

/// Read every parseable record from the CSV file at `path`.
pub fn load_corpus(path: impl AsRef<Path>) -> Result<Vec<DocumentRecord>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| {
        PipelineError::data(format!("failed to open corpus {}: {e}", path.display()))
    })?;
    let records = read_corpus(file, &path.display().to_string())?;
    tracing::info!(path = %path.display(), rows = records.len(), "corpus loaded");
    Ok(records)
}

/// Read records from any CSV source. `source` only labels error messages.
pub fn read_corpus<R: Read>(reader: R, source: &str) -> Result<Vec<DocumentRecord>> {
    let mut reader = ReaderBuilder::new().from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::data(format!("missing header in {source}: {e}")))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::data(format!(
            "{source} is missing required column(s): {}",
            missing.join(", ")
        )));
    }
    // A repeated required column fails every row, so the table as a whole is bad.
    let duplicated: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| headers.iter().filter(|h| h == col).count() > 1)
        .collect();
    if !duplicated.is_empty() {
        return Err(PipelineError::data(format!(
            "{source} repeats required column(s): {}",
            duplicated.join(", ")
        )));
    }

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<DocumentRecord>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) if e.is_io_error() => {
                return Err(PipelineError::data(format!("failed to read {source}: {e}")));
            }
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable row");
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, source, "skipped unparseable rows");
    }
    Ok(records)
}

/// Keep records with a non-empty title and abstract, in order, and attach the
/// text to embed.
pub fn normalize(records: Vec<DocumentRecord>) -> Vec<NormalizedRecord> {
    let total = records.len();
    let normalized: Vec<NormalizedRecord> = records
        .into_iter()
        .filter(DocumentRecord::has_required_text)
        .map(|record| {
            let text = record.embedding_text();
            NormalizedRecord { record, text }
        })
        .collect();
    tracing::debug!(
        kept = normalized.len(),
        dropped = total - normalized.len(),
        "normalized corpus"
    );
    normalized
}
