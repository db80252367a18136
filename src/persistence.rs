//! Full-snapshot persistence of a named store.
//!
//! One JSON document per store at `<storage_path>/<index_name>.json`. Every
//! save rewrites the whole file through a temporary sibling and a rename, so
//! a crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use rayon::ThreadPool;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::Error;
use crate::memory::MemoryEntry;

/// On-disk document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub index_name: String,
    pub entries: Vec<MemoryEntry>,
}

/// Path of the snapshot file for `index_name` under `storage_path`.
pub fn snapshot_path(storage_path: &Path, index_name: &str) -> PathBuf {
    storage_path.join(format!("{index_name}.json"))
}

/// Read a snapshot. A missing file is an empty store, not an error.
pub fn load(path: &Path) -> Result<Option<Snapshot>, Error> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| Error::storage(path, e))?;
    let snapshot: Snapshot =
        serde_json::from_str(&content).map_err(|e| Error::storage(path, e))?;
    Ok(Some(snapshot))
}

/// Write a snapshot atomically (temp file + rename).
pub fn save(path: &Path, snapshot: &Snapshot) -> Result<(), Error> {
    let body = serde_json::to_vec(snapshot)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body).map_err(|e| Error::storage(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::storage(path, e))?;
    Ok(())
}

/// A snapshot tagged with the store generation it was taken at.
pub(crate) struct PendingWrite {
    pub(crate) generation: u64,
    pub(crate) entries: Vec<MemoryEntry>,
}

#[derive(Default)]
struct WriterState {
    pending: usize,
    landed: u64,
    last_error: Option<String>,
}

struct Shared {
    state: Mutex<WriterState>,
    idle: Condvar,
}

/// Offloads snapshot writes to the worker pool.
///
/// Writes are serialised and a snapshot older than the newest one already on
/// disk is dropped, so the file only ever moves forward in generation.
pub(crate) struct Persister {
    path: PathBuf,
    index_name: String,
    pool: Arc<ThreadPool>,
    shared: Arc<Shared>,
}

impl Persister {
    pub(crate) fn new(path: PathBuf, index_name: String, pool: Arc<ThreadPool>) -> Self {
        Self {
            path,
            index_name,
            pool,
            shared: Arc::new(Shared {
                state: Mutex::new(WriterState::default()),
                idle: Condvar::new(),
            }),
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Queue a write and return immediately.
    pub(crate) fn schedule(&self, write: PendingWrite) {
        self.shared.state.lock().pending += 1;

        let path = self.path.clone();
        let index_name = self.index_name.clone();
        let shared = Arc::clone(&self.shared);
        self.pool.spawn(move || {
            let mut state = shared.state.lock();
            if let Err(e) = write_if_newer(&mut state, &path, index_name, write) {
                error!(path = %path.display(), error = %e, "background snapshot write failed");
                state.last_error = Some(e.to_string());
            }
            state.pending -= 1;
            shared.idle.notify_all();
        });
    }

    /// Write on the calling thread.
    pub(crate) fn save_now(&self, write: PendingWrite) -> Result<(), Error> {
        let mut state = self.shared.state.lock();
        write_if_newer(&mut state, &self.path, self.index_name.clone(), write)
    }

    /// Block until every scheduled write has landed. Returns the most recent
    /// background failure, if any, and clears it.
    pub(crate) fn flush(&self) -> Result<(), Error> {
        let mut state = self.shared.state.lock();
        while state.pending > 0 {
            self.shared.idle.wait(&mut state);
        }
        match state.last_error.take() {
            Some(message) => Err(Error::storage(&self.path, message)),
            None => Ok(()),
        }
    }
}

fn write_if_newer(
    state: &mut WriterState,
    path: &Path,
    index_name: String,
    write: PendingWrite,
) -> Result<(), Error> {
    if write.generation < state.landed {
        debug!(
            generation = write.generation,
            landed = state.landed,
            "skipping stale snapshot"
        );
        return Ok(());
    }
    let entries = write.entries.len();
    save(
        path,
        &Snapshot {
            index_name,
            entries: write.entries,
        },
    )?;
    state.landed = write.generation;
    debug!(path = %path.display(), entries, generation = write.generation, "snapshot written");
    Ok(())
}
