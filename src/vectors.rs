//! Dense vector matrix and its delimited-text encoding.
//!
//! Vectors are written one per line, comma-separated, no header. Floats use
//! Rust's shortest round-trip formatting, so reading a file back yields the
//! exact values that were written.

use std::io::{Read, Write};

use ndarray::{Array2, ArrayView1};

use crate::error::{PipelineError, Result};

/// Row-major matrix of embeddings, one row per surviving record.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatrix {
    data: Array2<f32>,
}

impl VectorMatrix {
    /// A matrix with no rows and the given width.
    pub fn empty(dimension: usize) -> Self {
        Self {
            data: Array2::zeros((0, dimension)),
        }
    }

    /// Build from a flat row-major buffer of `rows * dimension` values.
    pub fn from_flat(rows: usize, dimension: usize, flat: Vec<f32>) -> Result<Self> {
        let data = Array2::from_shape_vec((rows, dimension), flat).map_err(|e| {
            PipelineError::data(format!("cannot shape {rows}x{dimension} matrix: {e}"))
        })?;
        Ok(Self { data })
    }

    /// Build from individual rows. All rows must share one length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = rows.first().map(Vec::len).unwrap_or(0);
        let count = rows.len();
        let mut flat = Vec::with_capacity(count * dimension);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != dimension {
                return Err(PipelineError::data(format!(
                    "row {i} has {} values, expected {dimension}",
                    row.len()
                )));
            }
            flat.extend(row);
        }
        Self::from_flat(count, dimension, flat)
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn dimension(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.rows() == 0
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f32> {
        self.data.row(index)
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f32> {
        self.data
    }
}

/// Write every row of `matrix` as one CSV line.
pub fn write_vectors_csv<W: Write>(writer: W, matrix: &VectorMatrix) -> csv::Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    for row in matrix.as_array().rows() {
        csv.write_record(row.iter().map(|v| v.to_string()))?;
    }
    csv.flush()?;
    Ok(())
}

/// Parse a headerless CSV of floats. `source` only labels error messages.
pub fn read_vectors_csv<R: Read>(reader: R, source: &str) -> Result<VectorMatrix> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in csv.records().enumerate() {
        let record = record
            .map_err(|e| PipelineError::data(format!("failed to read {source}: {e}")))?;
        let row = record
            .iter()
            .map(|field| field.trim().parse::<f32>())
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| {
                PipelineError::data(format!("{source} line {}: invalid number: {e}", line + 1))
            })?;
        rows.push(row);
    }
    VectorMatrix::from_rows(rows)
        .map_err(|e| PipelineError::data(format!("{source}: {e}")))
}
