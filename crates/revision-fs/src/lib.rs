//! revision-fs: Filesystem-backed document storage.
//!
//! Implements revision-core's `DocumentStorage` trait over plain JSON files
//! via tokio::fs, one file per document. Useful for local-first setups and
//! as the reference storage implementation in integration tests.

pub mod store;

pub use store::JsonFileStorage;
