//! Record types that flow through the pipeline.
//!
//! [`DocumentRecord`] is one row of the input table, [`NormalizedRecord`] pairs a
//! surviving record with the text that gets embedded, and [`MetadataRow`] is the
//! slice of a record persisted next to its vector.

use serde::{Deserialize, Serialize};

/// Columns every input table must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "id",
    "title",
    "abstract",
    "authors",
    "categories",
    "update_date",
];

/// Header of the persisted metadata index, in column order.
pub const METADATA_COLUMNS: [&str; 5] = ["id", "title", "categories", "update_date", "authors"];

/// Separator between title and abstract in the embedded text.
pub const TITLE_SEPARATOR: &str = ". ";

/// One paper as it appears in the input table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: String,
    pub categories: String,
    pub update_date: String,
}

impl DocumentRecord {
    /// Whether both fields that make up the embedded text are present.
    /// Whitespace counts as content.
    pub fn has_required_text(&self) -> bool {
        !self.title.is_empty() && !self.abstract_text.is_empty()
    }

    /// Canonical embedding input: `title + ". " + abstract`.
    pub fn embedding_text(&self) -> String {
        let mut text =
            String::with_capacity(self.title.len() + TITLE_SEPARATOR.len() + self.abstract_text.len());
        text.push_str(&self.title);
        text.push_str(TITLE_SEPARATOR);
        text.push_str(&self.abstract_text);
        text
    }

    pub fn metadata(&self) -> MetadataRow {
        MetadataRow {
            id: self.id.clone(),
            title: self.title.clone(),
            categories: self.categories.clone(),
            update_date: self.update_date.clone(),
            authors: self.authors.clone(),
        }
    }
}

/// A record that survived normalization, with its embedding input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub record: DocumentRecord,
    pub text: String,
}

/// One row of the metadata index. Field order is the on-disk column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub id: String,
    pub title: String,
    pub categories: String,
    pub update_date: String,
    pub authors: String,
}
