//! Batch embedding pipeline for paper metadata.
//!
//! papervec turns a table of papers (title + abstract per row) into a semantic
//! search index: a matrix of embedding vectors aligned row-for-row with a
//! metadata table. A single ad-hoc query can be embedded into the same vector
//! space with the same model configuration.
//!
//! # Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Load + normalize | [`corpus`] | records with `text = title + ". " + abstract` |
//! | Encode in chunks | [`pipeline`] + [`embedding`] | [`vectors::VectorMatrix`] |
//! | Persist | [`store`] | `vectors.csv`, `index.csv`, `manifest.json` |
//! | Query | [`query`] | one-row vector file |
//!
//! Row `i` of `vectors.csv` and row `i` of `index.csv` always describe the same
//! paper, and the matrix does not depend on the batch size used to build it.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`corpus`] — Input table loading, normalization, and snapshot conversion
//! - [`embedding`] — Text-to-vector adapter via ONNX Runtime
//! - [`fetch`] — Model file download behind the [`fetch::Fetcher`] trait
//! - [`pipeline`] — Chunked encoding and the full build run
//! - [`store`] — Row-aligned persistence with rollback on failure
//! - [`verify`] — Read-back alignment check

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod progress;
pub mod query;
pub mod store;
pub mod vectors;
pub mod verify;

pub use error::{PipelineError, Result};
