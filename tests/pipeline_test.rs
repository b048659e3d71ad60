mod helpers;

use helpers::{hash_vector, record, sample_records, write_corpus, FailingEmbedder, HashEmbedder};
use papervec::corpus::normalize;
use papervec::pipeline::{build_index, encode_corpus, BuildOptions};
use papervec::progress::{ChunkProgress, NoProgress, ProgressObserver};
use papervec::store::EmbeddingStore;
use papervec::PipelineError;
use std::io;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingObserver {
    started: Mutex<Option<usize>>,
    chunks: Mutex<Vec<ChunkProgress>>,
    finished: Mutex<bool>,
}

impl ProgressObserver for RecordingObserver {
    fn on_start(&self, total: usize) {
        *self.started.lock().unwrap() = Some(total);
    }

    fn on_chunk(&self, progress: ChunkProgress) {
        self.chunks.lock().unwrap().push(progress);
    }

    fn on_finish(&self) {
        *self.finished.lock().unwrap() = true;
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn options(tmp: &TempDir, input: std::path::PathBuf, batch_size: usize) -> BuildOptions {
    BuildOptions {
        input_path: input,
        output_dir: tmp.path().join("embeddings"),
        batch_size,
        max_input_length: 512,
    }
}

#[test]
fn matrix_is_identical_for_any_batch_size() {
    let records = normalize(sample_records(23));
    let provider = HashEmbedder::new();

    let by_one = encode_corpus(&provider, &records, 1, &NoProgress).unwrap();
    let by_seven = encode_corpus(&provider, &records, 7, &NoProgress).unwrap();
    let by_all = encode_corpus(&provider, &records, records.len(), &NoProgress).unwrap();
    let oversized = encode_corpus(&provider, &records, 1000, &NoProgress).unwrap();

    assert_eq!(by_one.rows(), 23);
    assert_eq!(by_one, by_seven);
    assert_eq!(by_one, by_all);
    assert_eq!(by_one, oversized);
}

#[test]
fn provider_called_once_per_chunk() {
    let records = normalize(sample_records(23));
    let provider = HashEmbedder::new();
    encode_corpus(&provider, &records, 7, &NoProgress).unwrap();
    assert_eq!(provider.calls(), 4, "23 records at 7 per chunk is 4 chunks");
}

#[test]
fn row_i_is_embedding_of_record_i() {
    let records = normalize(sample_records(10));
    let matrix = encode_corpus(&HashEmbedder::new(), &records, 3, &NoProgress).unwrap();
    for (i, r) in records.iter().enumerate() {
        assert_eq!(matrix.row(i).to_vec(), hash_vector(&r.text), "row {i}");
    }
}

#[test]
fn progress_reports_every_chunk_in_order() {
    let records = normalize(sample_records(10));
    let observer = RecordingObserver::default();
    encode_corpus(&HashEmbedder::new(), &records, 4, &observer).unwrap();

    assert_eq!(*observer.started.lock().unwrap(), Some(10));
    assert!(*observer.finished.lock().unwrap());
    let chunks = observer.chunks.lock().unwrap();
    let done: Vec<usize> = chunks.iter().map(|c| c.done).collect();
    assert_eq!(done, vec![4, 8, 10]);
    assert_eq!(chunks.last().unwrap().chunks, 3);
    assert!((chunks.last().unwrap().fraction() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn zero_batch_size_is_rejected() {
    let records = normalize(sample_records(3));
    let err = encode_corpus(&HashEmbedder::new(), &records, 0, &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)));
}

#[test]
fn encoding_twice_is_deterministic() {
    let records = normalize(sample_records(5));
    let provider = HashEmbedder::new();
    let first = encode_corpus(&provider, &records, 2, &NoProgress).unwrap();
    let second = encode_corpus(&provider, &records, 2, &NoProgress).unwrap();
    assert_eq!(first, second);
}

#[test]
fn example_scenario_drops_record_without_title() {
    let tmp = TempDir::new().unwrap();
    let mut a = record("a", "Foo", "Bar");
    a.authors.clear();
    a.categories.clear();
    a.update_date.clear();
    let b = record("b", "", "Baz");
    let input = write_corpus(tmp.path(), &[a, b]);

    let summary = build_index(&options(&tmp, input, 1), &HashEmbedder::new(), &NoProgress).unwrap();
    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.embedded, 1);
    assert_eq!(summary.dropped(), 1);

    let vectors = std::fs::read_to_string(&summary.vectors_path).unwrap();
    assert_eq!(vectors.lines().count(), 1);
    let index = std::fs::read_to_string(&summary.index_path).unwrap();
    assert_eq!(index, "id,title,categories,update_date,authors\na,Foo,,,\n");
}

#[test]
fn build_keeps_vectors_and_metadata_aligned() {
    let tmp = TempDir::new().unwrap();
    let mut records = sample_records(12);
    records[3].title.clear();
    records[7].abstract_text = "   ".into();
    records[9].title = "Line one\r\nline two".into();
    let input = write_corpus(tmp.path(), &records);

    let summary = build_index(&options(&tmp, input, 5), &HashEmbedder::new(), &NoProgress).unwrap();
    assert_eq!(summary.embedded, 11);

    let store = EmbeddingStore::new(tmp.path().join("embeddings"));
    let (matrix, metadata) = store.read().unwrap();
    assert_eq!(matrix.rows(), metadata.len());

    let survivors: Vec<_> = records
        .iter()
        .filter(|r| r.has_required_text())
        .collect();
    for (i, (meta, original)) in metadata.iter().zip(&survivors).enumerate() {
        assert_eq!(meta.id, original.id);
        assert_eq!(matrix.row(i).to_vec(), hash_vector(&original.embedding_text()));
    }
    assert!(metadata.iter().all(|m| m.id != records[3].id));
    assert_eq!(metadata[6].id, records[7].id, "whitespace-only abstract is kept");
    assert_eq!(metadata[8].id, records[9].id);
    assert_eq!(metadata[8].title, "Line one line two");
}

#[test]
fn empty_corpus_produces_empty_artifacts() {
    let tmp = TempDir::new().unwrap();
    let input = write_corpus(tmp.path(), &[record("x", "", "")]);

    let summary = build_index(&options(&tmp, input, 32), &HashEmbedder::new(), &NoProgress).unwrap();
    assert_eq!(summary.embedded, 0);
    assert_eq!(std::fs::read_to_string(&summary.vectors_path).unwrap(), "");
    assert_eq!(
        std::fs::read_to_string(&summary.index_path).unwrap(),
        "id,title,categories,update_date,authors\n"
    );
    let manifest = EmbeddingStore::new(tmp.path().join("embeddings"))
        .read_manifest()
        .unwrap()
        .unwrap();
    assert_eq!(manifest.rows, 0);
    assert_eq!(manifest.model, "test/hash-embedder");
}

#[test]
fn missing_column_fails_before_writing() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("corpus.csv");
    std::fs::write(&input, "id,title,authors\na,T,x\n").unwrap();

    let err = build_index(&options(&tmp, input, 4), &HashEmbedder::new(), &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)));
    assert!(!tmp.path().join("embeddings").exists());
}

#[test]
fn repeated_column_keeps_previous_store() {
    let tmp = TempDir::new().unwrap();
    let input = write_corpus(tmp.path(), &sample_records(4));
    build_index(&options(&tmp, input.clone(), 2), &HashEmbedder::new(), &NoProgress).unwrap();
    let store = EmbeddingStore::new(tmp.path().join("embeddings"));
    let index_before = std::fs::read_to_string(store.index_path()).unwrap();

    std::fs::write(
        &input,
        "id,title,abstract,authors,categories,update_date,title\na,T,A,x,c,d,T2\n",
    )
    .unwrap();
    let err = build_index(&options(&tmp, input, 2), &HashEmbedder::new(), &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)), "got: {err}");

    let (matrix, metadata) = store.read().unwrap();
    assert_eq!(matrix.rows(), 4);
    assert_eq!(metadata.len(), 4);
    assert_eq!(std::fs::read_to_string(store.index_path()).unwrap(), index_before);
}

#[test]
fn encoding_failure_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let input = write_corpus(tmp.path(), &sample_records(9));

    let err = build_index(&options(&tmp, input, 3), &FailingEmbedder::new(2), &NoProgress).unwrap_err();
    assert!(matches!(err, PipelineError::Encoding(_)), "got: {err}");
    assert!(err.to_string().contains("chunk 2/3"), "got: {err}");
    assert!(!tmp.path().join("embeddings").exists());
}

#[test]
fn stages_are_logged_in_order() {
    let tmp = TempDir::new().unwrap();
    let input = write_corpus(tmp.path(), &sample_records(3));

    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        build_index(&options(&tmp, input, 2), &HashEmbedder::new(), &NoProgress).unwrap();
    });

    let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
    let position = |needle: &str| {
        logs.find(needle)
            .unwrap_or_else(|| panic!("{needle} not logged:\n{logs}"))
    };
    let initialized = position("stage=initialized");
    let model_loaded = position("stage=model_loaded");
    let corpus_loaded = position("corpus loaded");
    let encoding = position("stage=encoding");
    let persisted = position("stage=persisted");
    assert!(initialized < model_loaded);
    assert!(model_loaded < corpus_loaded);
    assert!(corpus_loaded < encoding);
    assert!(encoding < persisted);
}
