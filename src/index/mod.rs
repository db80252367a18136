//! Accelerated similarity index and its slot map.
//!
//! The index is a derived cache over the authoritative entry map. It supports
//! append only; deletions and content updates invalidate it and it is rebuilt
//! from the surviving entries. Slot `i` of the index always corresponds to
//! `slots[i]` of the slot map.

mod flat;

pub use flat::{FlatBackend, FlatCosineIndex};

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised by an index backend.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The backend cannot be used in this process.
    #[error("Index backend unavailable: {0}")]
    Unavailable(String),

    /// Index construction failed.
    #[error("Index construction failed: {0}")]
    Construction(String),

    /// Vector length differs from the index dimension.
    #[error("Index dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    /// A stored or query vector could not be scored.
    #[error("Index search failed: {0}")]
    Search(String),
}

/// Append-only nearest-neighbour structure.
pub trait AnnIndex: Send {
    /// Vector length accepted by the index.
    fn dimension(&self) -> usize;

    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a vector, returning its slot.
    fn add(&mut self, vector: &[f32]) -> Result<usize, IndexError>;

    /// The `k` best slots with their scores, highest score first.
    ///
    /// Scores must order vectors the same way as the gateway's `similarity`
    /// and equal scores must come back in slot order; the store relies on
    /// both to return the same results with or without the index.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f64)>, IndexError>;
}

/// Factory for [`AnnIndex`] instances of a given dimension.
pub trait IndexBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Check the backend can run here. Called once at store construction.
    fn probe(&self) -> Result<(), IndexError> {
        Ok(())
    }

    fn create(&self, dimension: usize) -> Result<Box<dyn AnnIndex>, IndexError>;
}

/// Accelerated index state owned by the store lock.
///
/// Once disabled (backend unavailable, construction or append failure) it
/// stays disabled for the lifetime of the owning store and every search
/// takes the brute-force path.
pub(crate) struct SimilarityIndex {
    backend: Option<Arc<dyn IndexBackend>>,
    ann: Option<Box<dyn AnnIndex>>,
    slots: Vec<String>,
    dirty: bool,
}

impl SimilarityIndex {
    pub(crate) fn new(backend: Option<Arc<dyn IndexBackend>>) -> Self {
        let backend = backend.and_then(|backend| match backend.probe() {
            Ok(()) => {
                info!(backend = backend.name(), "accelerated search enabled");
                Some(backend)
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "accelerated search unavailable, using brute force");
                None
            }
        });
        Self {
            backend,
            ann: None,
            slots: Vec::new(),
            dirty: false,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Number of entries reachable through the slot map.
    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn needs_rebuild(&self) -> bool {
        self.is_enabled() && (self.dirty || self.ann.is_none())
    }

    pub(crate) fn mark_dirty(&mut self) {
        if self.is_enabled() {
            self.dirty = true;
        }
    }

    /// Drop every vector; the next search rebuilds from the (empty) store.
    pub(crate) fn reset(&mut self) {
        self.ann = None;
        self.slots.clear();
        self.dirty = false;
    }

    /// Append one entry. Skipped while no index exists or a rebuild is
    /// pending; the rebuild picks the entry up from the store.
    pub(crate) fn append(&mut self, entry_id: &str, embedding: &[f32]) {
        if self.dirty {
            return;
        }
        let Some(ann) = self.ann.as_mut() else {
            return;
        };
        match ann.add(embedding) {
            Ok(_) => self.slots.push(entry_id.to_string()),
            Err(e) => self.disable(&e),
        }
    }

    /// Reconstruct index and slot map from `entries`, in iteration order.
    pub(crate) fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (&'a str, &'a [f32])>,
    {
        let Some(backend) = self.backend.clone() else {
            return;
        };
        self.reset();

        let mut entries = entries.into_iter().peekable();
        let Some(&(_, first)) = entries.peek() else {
            debug!("rebuild skipped: store is empty");
            return;
        };

        let mut ann = match backend.create(first.len()) {
            Ok(ann) => ann,
            Err(e) => return self.disable(&e),
        };
        let mut slots = Vec::new();
        for (entry_id, embedding) in entries {
            if let Err(e) = ann.add(embedding) {
                return self.disable(&e);
            }
            slots.push(entry_id.to_string());
        }

        debug!(entries = slots.len(), dimension = ann.dimension(), "similarity index rebuilt");
        self.ann = Some(ann);
        self.slots = slots;
    }

    /// Entry ids of the `k` nearest vectors, or `None` when the caller should
    /// fall back to a linear scan.
    pub(crate) fn nearest(&self, query: &[f32], k: usize) -> Option<Vec<String>> {
        if self.dirty {
            return None;
        }
        let ann = self.ann.as_ref().filter(|ann| !ann.is_empty())?;
        let k = k.min(ann.len());

        match ann.search(query, k) {
            Ok(hits) => Some(
                hits.into_iter()
                    .filter_map(|(slot, _)| self.slots.get(slot).cloned())
                    .collect(),
            ),
            Err(e) => {
                debug!(error = %e, "accelerated lookup failed, scanning instead");
                None
            }
        }
    }

    fn disable(&mut self, reason: &IndexError) {
        warn!(error = %reason, "disabling accelerated search for this store");
        self.backend = None;
        self.reset();
    }
}
