#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use papervec::corpus::DocumentRecord;
use papervec::embedding::EmbeddingProvider;

pub const TEST_DIM: usize = 16;

/// Deterministic stand-in for a real model: each text maps to a fixed
/// L2-normalized vector derived from an FNV-1a hash of its bytes. Output for a
/// text never depends on the rest of its batch.
#[derive(Default)]
pub struct HashEmbedder {
    calls: AtomicUsize,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn hash_vector(text: &str) -> Vec<f32> {
    let mut v = Vec::with_capacity(TEST_DIM);
    for d in 0..TEST_DIM {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325 ^ d as u64;
        for b in text.bytes() {
            h ^= b as u64;
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        v.push(((h % 2001) as f32 - 1000.0) / 1000.0);
    }
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| hash_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn model_id(&self) -> &str {
        "test/hash-embedder"
    }
}

/// Provider that fails on the `fail_on`-th call (1-based).
pub struct FailingEmbedder {
    pub fail_on: usize,
    inner: HashEmbedder,
}

impl FailingEmbedder {
    pub fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            inner: HashEmbedder::new(),
        }
    }
}

impl EmbeddingProvider for FailingEmbedder {
    fn embed_batch(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if self.inner.calls() + 1 == self.fail_on {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("simulated inference failure");
        }
        self.inner.embed_batch(texts)
    }

    fn dimensions(&self) -> usize {
        TEST_DIM
    }

    fn model_id(&self) -> &str {
        "test/failing-embedder"
    }
}

pub fn record(id: &str, title: &str, abstract_text: &str) -> DocumentRecord {
    DocumentRecord {
        id: id.into(),
        title: title.into(),
        abstract_text: abstract_text.into(),
        authors: format!("Author of {id}"),
        categories: "cs.LG".into(),
        update_date: "2024-01-01".into(),
    }
}

/// `n` distinct records with non-empty title and abstract.
pub fn sample_records(n: usize) -> Vec<DocumentRecord> {
    (0..n)
        .map(|i| {
            record(
                &format!("{i:04}.{:05}", i * 7),
                &format!("Paper number {i}"),
                &format!("We study problem {i} and report result {}.", i * i),
            )
        })
        .collect()
}

/// Write `records` as an input CSV at `dir/corpus.csv`.
pub fn write_corpus(dir: &Path, records: &[DocumentRecord]) -> PathBuf {
    let path = dir.join("corpus.csv");
    let mut writer = csv::Writer::from_path(&path).unwrap();
    writer
        .write_record(["id", "title", "abstract", "authors", "categories", "update_date"])
        .unwrap();
    for r in records {
        writer
            .write_record([
                &r.id,
                &r.title,
                &r.abstract_text,
                &r.authors,
                &r.categories,
                &r.update_date,
            ])
            .unwrap();
    }
    writer.flush().unwrap();
    path
}
