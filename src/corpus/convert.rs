//! Conversion of the line-delimited JSON metadata snapshot into the input table.
//!
//! Each line is one JSON object. Lines that fail to parse are skipped and
//! counted; conversion never aborts because of a single bad line.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::types::DocumentRecord;

/// Counters reported after a conversion.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    pub written: u64,
    pub malformed: u64,
    pub missing_text: u64,
}

#[derive(Debug, Deserialize)]
struct SnapshotLine {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<Authors>,
    #[serde(default)]
    categories: Option<String>,
    #[serde(default)]
    update_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Authors {
    Text(String),
    List(Vec<String>),
}

impl Authors {
    fn joined(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::List(list) => list.join(", "),
        }
    }
}

impl From<SnapshotLine> for DocumentRecord {
    fn from(line: SnapshotLine) -> Self {
        Self {
            id: line.id.unwrap_or_default(),
            title: line.title.unwrap_or_default(),
            abstract_text: line.abstract_text.unwrap_or_default(),
            authors: line.authors.map(Authors::joined).unwrap_or_default(),
            categories: line.categories.unwrap_or_default(),
            update_date: line.update_date.unwrap_or_default(),
        }
    }
}

/// Stream JSON lines from `reader` into a CSV table on `writer`.
pub fn convert_snapshot<R: BufRead, W: Write>(reader: R, writer: W) -> Result<ConvertStats> {
    let mut csv = csv::Writer::from_writer(writer);
    // Header goes out up front so an empty snapshot still yields a loadable table.
    csv.write_record(super::types::REQUIRED_COLUMNS)
        .context("failed to write CSV header")?;

    let mut stats = ConvertStats::default();
    for line in reader.lines() {
        let line = line.context("failed to read snapshot line")?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: SnapshotLine = match serde_json::from_str(&line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed snapshot line");
                stats.malformed += 1;
                continue;
            }
        };
        let record = DocumentRecord::from(parsed);
        if !record.has_required_text() {
            stats.missing_text += 1;
            continue;
        }
        csv.write_record([
            &record.id,
            &record.title,
            &record.abstract_text,
            &record.authors,
            &record.categories,
            &record.update_date,
        ])
        .context("failed to write CSV row")?;
        stats.written += 1;
    }
    csv.flush().context("failed to flush CSV output")?;
    Ok(stats)
}

/// Convert the snapshot at `input` into a CSV at `output`. The output only
/// appears once conversion has finished.
pub fn convert_file(input: &Path, output: &Path) -> Result<ConvertStats> {
    let file = File::open(input)
        .with_context(|| format!("failed to open snapshot {}", input.display()))?;

    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    let stats = convert_snapshot(BufReader::new(file), tmp.as_file_mut())?;
    tmp.persist(output)
        .with_context(|| format!("failed to publish {}", output.display()))?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        written = stats.written,
        malformed = stats.malformed,
        missing_text = stats.missing_text,
        "snapshot converted"
    );
    Ok(stats)
}
