mod helpers;

use helpers::{hash_vector, TEST_DIM};
use papervec::corpus::MetadataRow;
use papervec::store::{EmbeddingStore, StoreManifest, MANIFEST_FILE};
use papervec::vectors::VectorMatrix;
use papervec::verify::verify_store;
use papervec::PipelineError;
use tempfile::TempDir;

fn fixture(n: usize, prefix: &str) -> (VectorMatrix, Vec<MetadataRow>, StoreManifest) {
    let rows: Vec<Vec<f32>> = (0..n).map(|i| hash_vector(&format!("{prefix}-{i}"))).collect();
    let matrix = VectorMatrix::from_rows(rows).unwrap();
    let metadata = (0..n)
        .map(|i| MetadataRow {
            id: format!("{prefix}-{i}"),
            title: format!("Title {i}"),
            categories: "math.CO".into(),
            update_date: "2023-05-01".into(),
            authors: "A. Author, B. Author".into(),
        })
        .collect();
    let manifest = StoreManifest::new("test/hash-embedder", 512, &matrix);
    (matrix, metadata, manifest)
}

#[test]
fn write_creates_directory_and_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path().join("nested").join("embeddings"));
    let (matrix, metadata, manifest) = fixture(4, "p");

    store.write(&matrix, &metadata, &manifest).unwrap();

    let (read_matrix, read_metadata) = store.read().unwrap();
    assert_eq!(read_matrix, matrix);
    assert_eq!(read_metadata, metadata);
    assert_eq!(store.read_manifest().unwrap(), Some(manifest));
}

#[test]
fn no_staging_files_left_behind() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (matrix, metadata, manifest) = fixture(2, "p");
    store.write(&matrix, &metadata, &manifest).unwrap();
    // overwrite to exercise the backup path too
    store.write(&matrix, &metadata, &manifest).unwrap();

    let mut names: Vec<String> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["index.csv", "manifest.json", "vectors.csv"]);
}

#[test]
fn newlines_in_metadata_are_sanitized_on_disk() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (matrix, mut metadata, manifest) = fixture(3, "p");
    metadata[0].title = "Broken\r\ntitle".into();
    metadata[1].authors = "One\nTwo\n\nThree".into();

    store.write(&matrix, &metadata, &manifest).unwrap();

    let index = std::fs::read_to_string(store.index_path()).unwrap();
    assert_eq!(index.lines().count(), 4, "header plus one line per row");
    let (_, read_back) = store.read().unwrap();
    assert_eq!(read_back[0].title, "Broken title");
    assert_eq!(read_back[1].authors, "One Two Three");
}

#[test]
fn misaligned_input_is_rejected_before_touching_disk() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("out");
    let store = EmbeddingStore::new(&dir);
    let (matrix, mut metadata, manifest) = fixture(3, "p");
    metadata.pop();

    let err = store.write(&matrix, &metadata, &manifest).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)));
    assert!(!dir.exists());
}

#[test]
fn failed_second_artifact_removes_first() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    // A directory squatting on index.csv makes that publish step fail.
    std::fs::create_dir(store.index_path()).unwrap();
    let (matrix, metadata, manifest) = fixture(2, "p");

    let err = store.write(&matrix, &metadata, &manifest).unwrap_err();
    assert!(err.is_persistence(), "got: {err}");
    assert!(err.to_string().contains("index.csv"), "got: {err}");
    assert!(!store.vectors_path().exists());
    assert!(!store.manifest_path().exists());
}

#[test]
fn failed_publish_restores_previous_pair() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (old_matrix, old_metadata, old_manifest) = fixture(2, "old");
    store.write(&old_matrix, &old_metadata, &old_manifest).unwrap();

    // Block the last publish step after vectors and index have been replaced.
    std::fs::remove_file(store.manifest_path()).unwrap();
    std::fs::create_dir(tmp.path().join(MANIFEST_FILE)).unwrap();

    let (new_matrix, new_metadata, new_manifest) = fixture(5, "new");
    let err = store.write(&new_matrix, &new_metadata, &new_manifest).unwrap_err();
    assert!(err.is_persistence(), "got: {err}");

    let (matrix, metadata) = store.read().unwrap();
    assert_eq!(matrix, old_matrix);
    assert_eq!(metadata, old_metadata);
}

#[test]
fn empty_store_round_trips() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let matrix = VectorMatrix::empty(TEST_DIM);
    let manifest = StoreManifest::new("test/hash-embedder", 512, &matrix);

    store.write(&matrix, &[], &manifest).unwrap();

    let (read_matrix, metadata) = store.read().unwrap();
    assert_eq!(read_matrix.rows(), 0);
    assert!(metadata.is_empty());
    let report = verify_store(tmp.path()).unwrap();
    assert_eq!(report.rows, 0);
    assert_eq!(report.dimension, TEST_DIM);
}

#[test]
fn verify_reports_manifest_details() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (matrix, metadata, manifest) = fixture(6, "p");
    store.write(&matrix, &metadata, &manifest).unwrap();

    let report = verify_store(tmp.path()).unwrap();
    assert_eq!(report.rows, 6);
    assert_eq!(report.dimension, TEST_DIM);
    assert_eq!(report.model.as_deref(), Some("test/hash-embedder"));
    assert_eq!(report.max_input_length, Some(512));
}

#[test]
fn verify_detects_misaligned_artifacts() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (matrix, metadata, manifest) = fixture(3, "p");
    store.write(&matrix, &metadata, &manifest).unwrap();

    // Simulate a torn write: drop the last vector line.
    let vectors = std::fs::read_to_string(store.vectors_path()).unwrap();
    let truncated: Vec<&str> = vectors.lines().take(2).collect();
    std::fs::write(store.vectors_path(), truncated.join("\n") + "\n").unwrap();

    let err = verify_store(tmp.path()).unwrap_err();
    assert!(matches!(err, PipelineError::Data(_)));
    assert!(err.to_string().contains("misaligned"), "got: {err}");
}

#[test]
fn verify_detects_stale_manifest() {
    let tmp = TempDir::new().unwrap();
    let store = EmbeddingStore::new(tmp.path());
    let (matrix, metadata, manifest) = fixture(3, "p");
    store.write(&matrix, &metadata, &manifest).unwrap();

    let mut stale = manifest.clone();
    stale.rows = 10;
    std::fs::write(store.manifest_path(), serde_json::to_string(&stale).unwrap()).unwrap();

    let err = verify_store(tmp.path()).unwrap_err();
    assert!(err.to_string().contains("manifest"), "got: {err}");
}
