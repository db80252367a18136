//! muisti - An in-process semantic memory store for AI agents.
//!
//! Text entries are embedded through a pluggable [`EmbeddingGateway`], kept in
//! memory, searched by similarity (through an accelerated index when one is
//! available, by linear scan otherwise) and persisted as a JSON snapshot per
//! named store. All operations are synchronous and the store is `Send + Sync`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use muisti::{Config, Dispatcher, MemoryStore, OnnxGateway};
//!
//! let config = Config::load().expect("Invalid configuration");
//! let gateway = Arc::new(OnnxGateway::new(&config.embedding_model).expect("Failed to load model"));
//! let store = MemoryStore::open(config, gateway).expect("Failed to open store");
//!
//! let id = store.add_memory("Alice works at Microsoft", None).unwrap();
//! for hit in store.search_memories("where does alice work", 5).unwrap() {
//!     println!("{:.2}: {}", hit.similarity, hit.entry.content);
//! }
//!
//! // The same operations over JSON
//! let dispatcher = Dispatcher::new(Arc::new(store));
//! let response = dispatcher.handle_json(&format!(r#"{{"command": "get", "entry_id": "{id}"}}"#));
//! println!("{response}");
//! ```

pub mod commands;
pub mod config;
pub mod embedding;
pub mod errors;
pub mod index;
pub mod memory;
pub mod output;
pub mod persistence;

// Re-export public API
pub use commands::{Command, Dispatcher};
pub use config::Config;
pub use embedding::{EMBEDDING_DIMS, EmbeddingError, EmbeddingGateway, KeywordGateway, OnnxGateway};
pub use errors::Error;
pub use index::{AnnIndex, FlatBackend, IndexBackend, IndexError};
pub use memory::store::{MAX_INPUT_LENGTH, MAX_SEARCH_LIMIT};
pub use memory::{BatchItem, MemoryEntry, MemoryStore, Metadata, SIMILARITY_EPSILON, ScoredEntry};
