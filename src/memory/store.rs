//! Core memory store struct: entry map, similarity index, lock and workers.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use rayon::ThreadPool;
use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::EmbeddingGateway;
use crate::errors::Error;
use crate::index::{FlatBackend, IndexBackend, SimilarityIndex};
use crate::persistence::{self, PendingWrite, Persister};

use super::entry::MemoryEntry;

/// Maximum allowed input length (100,000 bytes).
pub const MAX_INPUT_LENGTH: usize = 100_000;
/// Maximum allowed limit for search and list operations.
pub const MAX_SEARCH_LIMIT: usize = 10_000;

/// Mutable state behind the store lock.
///
/// Entries are keyed by insertion sequence so iteration follows insertion
/// order; `positions` resolves an entry id to its sequence.
pub(crate) struct StoreState {
    pub(crate) entries: BTreeMap<u64, MemoryEntry>,
    pub(crate) positions: HashMap<String, u64>,
    next_seq: u64,
    pub(crate) dimension: Option<usize>,
    pub(crate) index: SimilarityIndex,
    generation: u64,
}

impl StoreState {
    fn new(index: SimilarityIndex) -> Self {
        Self {
            entries: BTreeMap::new(),
            positions: HashMap::new(),
            next_seq: 0,
            dimension: None,
            index,
            generation: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, entry_id: &str) -> Option<&MemoryEntry> {
        let seq = self.positions.get(entry_id)?;
        self.entries.get(seq)
    }

    pub(crate) fn get_mut(&mut self, entry_id: &str) -> Option<&mut MemoryEntry> {
        let seq = self.positions.get(entry_id)?;
        self.entries.get_mut(seq)
    }

    /// Reject a vector whose length differs from the store dimension.
    pub(crate) fn check_dimension(&self, actual: usize) -> Result<(), Error> {
        match self.dimension {
            Some(expected) if expected != actual => {
                Err(Error::DimensionMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// Insert a new entry and append it to the index.
    pub(crate) fn insert(&mut self, entry: MemoryEntry) {
        self.dimension.get_or_insert(entry.embedding.len());
        self.index.append(&entry.entry_id, &entry.embedding);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.positions.insert(entry.entry_id.clone(), seq);
        self.entries.insert(seq, entry);
    }

    pub(crate) fn remove(&mut self, entry_id: &str) -> Option<MemoryEntry> {
        let seq = self.positions.remove(entry_id)?;
        self.entries.remove(&seq)
    }

    /// Remove everything, returning how many entries were dropped.
    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.positions.clear();
        self.index.reset();
        removed
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.index.rebuild(
            self.entries
                .values()
                .map(|e| (e.entry_id.as_str(), e.embedding.as_slice())),
        );
    }

    /// Copy of the current entries tagged with a fresh generation.
    pub(crate) fn snapshot(&mut self) -> PendingWrite {
        self.generation += 1;
        PendingWrite {
            generation: self.generation,
            entries: self.entries.values().cloned().collect(),
        }
    }
}

/// Semantic memory store.
///
/// All methods take `&self`; the store is `Send + Sync` and meant to be
/// shared behind an `Arc`. Every in-memory mutation happens under one
/// reentrant lock. Embedding calls are made outside it.
pub struct MemoryStore {
    pub(crate) state: ReentrantMutex<RefCell<StoreState>>,
    pub(crate) gateway: Arc<dyn EmbeddingGateway>,
    pub(crate) pool: Arc<ThreadPool>,
    pub(crate) persister: Persister,
    pub(crate) config: Config,
}

impl MemoryStore {
    /// Open the store described by `config`, loading its snapshot if present.
    ///
    /// Uses the built-in flat index when `config.use_acceleration` is set.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The configuration is invalid
    /// - The storage directory cannot be created
    /// - The snapshot exists but cannot be read or parsed, was written for a
    ///   different `index_name`, or holds duplicate ids
    /// - The worker pool cannot be started
    pub fn open(config: Config, gateway: Arc<dyn EmbeddingGateway>) -> Result<Self, Error> {
        let backend: Option<Arc<dyn IndexBackend>> = if config.use_acceleration {
            Some(Arc::new(FlatBackend))
        } else {
            None
        };
        Self::with_backend(config, gateway, backend)
    }

    /// Like [`MemoryStore::open`] with an explicit index backend. `None`
    /// disables acceleration.
    pub fn with_backend(
        config: Config,
        gateway: Arc<dyn EmbeddingGateway>,
        backend: Option<Arc<dyn IndexBackend>>,
    ) -> Result<Self, Error> {
        config.validate()?;
        config.ensure_directories()?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_pool_size)
            .thread_name(|i| format!("muisti-worker-{i}"))
            .build()
            .map_err(|e| Error::Config(format!("Failed to start worker pool: {e}")))?;
        let pool = Arc::new(pool);

        let path = config.snapshot_path();
        let mut state = StoreState::new(SimilarityIndex::new(backend));
        if let Some(snapshot) = persistence::load(&path)? {
            if snapshot.index_name != config.index_name {
                return Err(Error::storage(
                    &path,
                    format!(
                        "snapshot belongs to store {:?}, not {:?}",
                        snapshot.index_name, config.index_name
                    ),
                ));
            }
            for entry in snapshot.entries {
                if state.positions.contains_key(&entry.entry_id) {
                    return Err(Error::storage(
                        &path,
                        format!("duplicate entry id {}", entry.entry_id),
                    ));
                }
                state.check_dimension(entry.embedding.len())?;
                state.insert(entry);
            }
            info!(path = %path.display(), entries = state.len(), "loaded memory snapshot");
        } else {
            debug!(path = %path.display(), "no snapshot found, starting empty");
        }

        let persister = Persister::new(path, config.index_name.clone(), Arc::clone(&pool));
        Ok(MemoryStore {
            state: ReentrantMutex::new(RefCell::new(state)),
            gateway,
            pool,
            persister,
            config,
        })
    }

    /// Run `f` on the state under the store lock.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> R) -> R {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        f(&mut state)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.with_state(|state| state.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embedding dimension, fixed by the first entry ever stored.
    pub fn dimension(&self) -> Option<usize> {
        self.with_state(|state| state.dimension)
    }

    /// Whether searches can still use the accelerated index.
    pub fn is_accelerated(&self) -> bool {
        self.with_state(|state| state.index.is_enabled())
    }

    /// Rebuild the accelerated index from the entry map.
    pub fn rebuild_index(&self) {
        self.with_state(|state| state.rebuild_index());
    }

    /// Write the current state to disk on the calling thread.
    ///
    /// Access counters changed by `get_memory` and `search_memories` only
    /// reach disk through this or the next write-scheduling operation.
    pub fn save(&self) -> Result<(), Error> {
        let snapshot = self.with_state(|state| state.snapshot());
        self.persister.save_now(snapshot)?;
        debug!(path = %self.persister.path().display(), "snapshot saved");
        Ok(())
    }

    /// Wait for every scheduled background write to land.
    ///
    /// # Errors
    ///
    /// Returns the most recent background write failure, if any.
    pub fn flush(&self) -> Result<(), Error> {
        self.persister.flush()
    }

    pub(crate) fn schedule_persist(&self, snapshot: PendingWrite) {
        self.persister.schedule(snapshot);
    }

    /// Validate input length (rejects empty and whitespace-only inputs).
    pub(crate) fn validate_input_length(text: &str) -> Result<(), Error> {
        if text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        if text.len() > MAX_INPUT_LENGTH {
            return Err(Error::InputTooLong {
                max_length: MAX_INPUT_LENGTH,
                actual_length: text.len(),
            });
        }
        Ok(())
    }
}

impl Drop for MemoryStore {
    fn drop(&mut self) {
        // Scheduled writes still hold snapshots; let them land first.
        if let Err(e) = self.persister.flush() {
            tracing::error!(error = %e, "snapshot write failed before shutdown");
        }
    }
}

/// Validate a result limit.
pub(crate) fn validate_limit(limit: usize) -> Result<(), Error> {
    if limit == 0 {
        return Err(Error::InvalidLimit("limit must be at least 1".to_string()));
    }
    if limit > MAX_SEARCH_LIMIT {
        return Err(Error::InvalidLimit(format!(
            "limit {} exceeds maximum {}",
            limit, MAX_SEARCH_LIMIT
        )));
    }
    Ok(())
}
