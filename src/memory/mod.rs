//! Core memory store: entries, similarity search, and persistence scheduling.
//!
//! Provides the high-level API for storing, searching, and retrieving memories
//! with embeddings produced by an [`EmbeddingGateway`](crate::embedding::EmbeddingGateway).

mod batch;
mod crud;
mod entry;
mod search;

// pub(crate): module internals hidden; public items re-exported explicitly via lib.rs
pub(crate) mod store;

pub use entry::{BatchItem, MemoryEntry, Metadata, ScoredEntry};
pub use search::SIMILARITY_EPSILON;
pub use store::MemoryStore;
