//! Persistence of the vector matrix and its metadata index.
//!
//! A store directory holds three files:
//!
//! - `vectors.csv` — one embedding per line, no header
//! - `index.csv` — `id,title,categories,update_date,authors`, one row per vector
//! - `manifest.json` — model, dimension and row count of the pair above
//!
//! [`EmbeddingStore::write`] stages every file as a temp file inside the target
//! directory and publishes them by rename. If any publish step fails, the files
//! already published are rolled back to their previous content, so a failed run
//! leaves the previous pair in place. A crash between two renames can still
//! leave a mixed pair; the manifest row count exposes it (see
//! [`crate::verify`]).

use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::corpus::MetadataRow;
use crate::error::{PipelineError, Result};
use crate::vectors::{self, VectorMatrix};

pub const VECTORS_FILE: &str = "vectors.csv";
pub const INDEX_FILE: &str = "index.csv";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Collapse every run of `\r`/`\n` characters into a single space.
///
/// The metadata index is line-oriented; an embedded line break would shift
/// every following row against the vector file on a naive read-back.
pub fn sanitize_field(value: &str) -> Cow<'_, str> {
    if !value.contains(['\r', '\n']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len());
    let mut in_break = false;
    for ch in value.chars() {
        if ch == '\r' || ch == '\n' {
            if !in_break {
                out.push(' ');
                in_break = true;
            }
        } else {
            out.push(ch);
            in_break = false;
        }
    }
    Cow::Owned(out)
}

impl MetadataRow {
    /// Copy of this row with every free-text field passed through [`sanitize_field`].
    pub fn sanitized(&self) -> MetadataRow {
        MetadataRow {
            id: sanitize_field(&self.id).into_owned(),
            title: sanitize_field(&self.title).into_owned(),
            categories: sanitize_field(&self.categories).into_owned(),
            update_date: sanitize_field(&self.update_date).into_owned(),
            authors: sanitize_field(&self.authors).into_owned(),
        }
    }
}

/// Sidecar describing one published vector/metadata pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub model: String,
    pub max_input_length: usize,
    pub dimension: usize,
    pub rows: usize,
    pub vectors_file: String,
    pub index_file: String,
    pub created_at: String,
}

impl StoreManifest {
    pub fn new(model: &str, max_input_length: usize, matrix: &VectorMatrix) -> Self {
        Self {
            model: model.to_string(),
            max_input_length,
            dimension: matrix.dimension(),
            rows: matrix.rows(),
            vectors_file: VECTORS_FILE.into(),
            index_file: INDEX_FILE.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A directory holding one vector matrix and its metadata index.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    dir: PathBuf,
}

impl EmbeddingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn vectors_path(&self) -> PathBuf {
        self.dir.join(VECTORS_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }

    /// Persist `matrix` and `metadata` as a row-aligned pair, plus `manifest`.
    ///
    /// Fails with [`PipelineError::Data`] before touching disk if the inputs are
    /// not aligned, and with a persistence error naming the path otherwise.
    pub fn write(
        &self,
        matrix: &VectorMatrix,
        metadata: &[MetadataRow],
        manifest: &StoreManifest,
    ) -> Result<()> {
        if matrix.rows() != metadata.len() {
            return Err(PipelineError::data(format!(
                "refusing to write misaligned store: {} vectors vs {} metadata rows",
                matrix.rows(),
                metadata.len()
            )));
        }
        if manifest.rows != matrix.rows() || manifest.dimension != matrix.dimension() {
            return Err(PipelineError::data(format!(
                "manifest describes {}x{} but matrix is {}x{}",
                manifest.rows,
                manifest.dimension,
                matrix.rows(),
                matrix.dimension()
            )));
        }

        fs::create_dir_all(&self.dir).map_err(|e| PipelineError::persistence(&self.dir, e))?;

        let vectors_path = self.vectors_path();
        let staged_vectors = self.stage(&vectors_path, |file| {
            vectors::write_vectors_csv(BufWriter::new(file), matrix)
                .map_err(|e| PipelineError::csv(&vectors_path, e))
        })?;

        let index_path = self.index_path();
        let staged_index = self.stage(&index_path, |file| {
            write_metadata_csv(BufWriter::new(file), metadata)
                .map_err(|e| PipelineError::csv(&index_path, e))
        })?;

        let manifest_path = self.manifest_path();
        let staged_manifest = self.stage(&manifest_path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, manifest)
                .map_err(|e| PipelineError::persistence(&manifest_path, e.into()))?;
            writer
                .flush()
                .map_err(|e| PipelineError::persistence(&manifest_path, e))
        })?;

        publish_all(vec![
            (staged_vectors, vectors_path),
            (staged_index, index_path),
            (staged_manifest, manifest_path),
        ])?;

        tracing::info!(
            dir = %self.dir.display(),
            rows = matrix.rows(),
            dimension = matrix.dimension(),
            "store published"
        );
        Ok(())
    }

    /// Read the vector matrix and metadata index back, without alignment checks.
    pub fn read(&self) -> Result<(VectorMatrix, Vec<MetadataRow>)> {
        let vectors_path = self.vectors_path();
        let file =
            File::open(&vectors_path).map_err(|e| PipelineError::persistence(&vectors_path, e))?;
        let matrix =
            vectors::read_vectors_csv(BufReader::new(file), &vectors_path.display().to_string())?;

        let index_path = self.index_path();
        let mut reader = csv::Reader::from_path(&index_path)
            .map_err(|e| PipelineError::csv(&index_path, e))?;
        let metadata = reader
            .deserialize::<MetadataRow>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| PipelineError::csv(&index_path, e))?;

        Ok((matrix, metadata))
    }

    /// Read the manifest, or `None` if the store has none.
    pub fn read_manifest(&self) -> Result<Option<StoreManifest>> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents =
            fs::read_to_string(&path).map_err(|e| PipelineError::persistence(&path, e))?;
        let manifest = serde_json::from_str(&contents).map_err(|e| {
            PipelineError::data(format!("invalid manifest {}: {e}", path.display()))
        })?;
        Ok(Some(manifest))
    }

    /// Write a temp file next to `target` and fsync it.
    fn stage<F>(&self, target: &Path, fill: F) -> Result<NamedTempFile>
    where
        F: FnOnce(&mut File) -> Result<()>,
    {
        let mut tmp = tempfile::Builder::new()
            .prefix(".staging-")
            .tempfile_in(&self.dir)
            .map_err(|e| PipelineError::persistence(target, e))?;
        fill(tmp.as_file_mut())?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| PipelineError::persistence(target, e))?;
        Ok(tmp)
    }
}

/// Write the metadata index with header and sanitized free text.
pub fn write_metadata_csv<W: Write>(writer: W, metadata: &[MetadataRow]) -> csv::Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(crate::corpus::types::METADATA_COLUMNS)?;
    for row in metadata {
        let row = row.sanitized();
        csv.write_record([
            &row.id,
            &row.title,
            &row.categories,
            &row.update_date,
            &row.authors,
        ])?;
    }
    csv.flush()?;
    Ok(())
}

/// A published target and where its previous content was moved, if it had any.
struct Published {
    target: PathBuf,
    backup: Option<PathBuf>,
}

/// Rename every staged file onto its target. On the first failure, undo the
/// targets already replaced and return the error.
fn publish_all(staged: Vec<(NamedTempFile, PathBuf)>) -> Result<()> {
    let mut published: Vec<Published> = Vec::with_capacity(staged.len());

    for (tmp, target) in staged {
        match publish_one(tmp, &target) {
            Ok(backup) => published.push(Published { target, backup }),
            Err(e) => {
                rollback(&published);
                return Err(e);
            }
        }
    }

    for entry in &published {
        if let Some(backup) = &entry.backup {
            if let Err(e) = fs::remove_file(backup) {
                tracing::warn!(path = %backup.display(), error = %e, "failed to remove backup");
            }
        }
    }
    Ok(())
}

fn publish_one(tmp: NamedTempFile, target: &Path) -> Result<Option<PathBuf>> {
    if target.is_dir() {
        return Err(PipelineError::persistence(
            target,
            std::io::Error::other("target path is a directory"),
        ));
    }

    let backup = if target.exists() {
        let backup = backup_path(target);
        fs::rename(target, &backup).map_err(|e| PipelineError::persistence(target, e))?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = tmp.persist(target) {
        if let Some(backup) = &backup {
            if let Err(restore) = fs::rename(backup, target) {
                tracing::error!(path = %target.display(), error = %restore, "failed to restore previous file");
            }
        }
        return Err(PipelineError::persistence(target, e.error));
    }
    Ok(backup)
}

fn rollback(published: &[Published]) {
    for entry in published.iter().rev() {
        let result = match &entry.backup {
            Some(backup) => fs::rename(backup, &entry.target),
            None => fs::remove_file(&entry.target),
        };
        if let Err(e) = result {
            tracing::error!(path = %entry.target.display(), error = %e, "rollback failed");
        }
    }
}

fn backup_path(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.prev"))
}
