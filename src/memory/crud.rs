//! CRUD operations for the memory store.

use chrono::Utc;
use tracing::debug;

use crate::errors::Error;
use crate::persistence::PendingWrite;

use super::entry::{MemoryEntry, Metadata};
use super::store::{MemoryStore, validate_limit};

impl MemoryStore {
    #[must_use = "handle the error or the entry id may be lost"]
    /// Embed `content` and store it as a new entry.
    ///
    /// The entry is appended to the accelerated index and a snapshot write is
    /// scheduled in the background.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Content is empty or exceeds `MAX_INPUT_LENGTH`
    /// - The gateway fails to embed it (nothing is stored)
    /// - The vector's dimension differs from the store's
    pub fn add_memory(&self, content: &str, metadata: Option<Metadata>) -> Result<String, Error> {
        Self::validate_input_length(content)?;
        let embedding = self.gateway.embed(content, metadata.as_ref())?;
        let entry = MemoryEntry::new(content, embedding, metadata.unwrap_or_default());
        let entry_id = entry.entry_id.clone();

        let snapshot = self.with_state(|state| -> Result<PendingWrite, Error> {
            state.check_dimension(entry.embedding.len())?;
            state.insert(entry);
            Ok(state.snapshot())
        })?;
        self.schedule_persist(snapshot);

        debug!(entry_id = %entry_id, "memory added");
        Ok(entry_id)
    }

    /// Get a specific entry by id, counting the access.
    ///
    /// Returns `None` if the entry doesn't exist.
    pub fn get_memory(&self, entry_id: &str) -> Option<MemoryEntry> {
        self.with_state(|state| {
            let entry = state.get_mut(entry_id)?;
            entry.touch();
            Some(entry.clone())
        })
    }

    #[must_use = "handle the error or results may be lost"]
    /// List entries in insertion order without counting accesses.
    ///
    /// # Errors
    ///
    /// Returns error if the limit is 0 or exceeds `MAX_SEARCH_LIMIT`.
    pub fn list_memories(&self, limit: usize) -> Result<Vec<MemoryEntry>, Error> {
        validate_limit(limit)?;
        Ok(self.with_state(|state| state.entries.values().take(limit).cloned().collect()))
    }

    #[must_use = "handle the error or the update may be lost"]
    /// Update an entry's content and/or metadata.
    ///
    /// New content that differs from the stored text is re-embedded and the
    /// accelerated index is rebuilt before the next search. Metadata is
    /// merged key by key. `last_accessed` is refreshed in every case.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the entry was updated
    /// - `Ok(false)` if the entry doesn't exist
    ///
    /// # Errors
    ///
    /// Returns error if new content is invalid or cannot be embedded, in which
    /// case the entry is left untouched.
    pub fn update_memory(
        &self,
        entry_id: &str,
        content: Option<&str>,
        metadata: Option<Metadata>,
    ) -> Result<bool, Error> {
        let Some(current) = self.with_state(|state| state.get(entry_id).map(|e| e.content.clone()))
        else {
            return Ok(false);
        };

        let replacement = match content {
            Some(text) => {
                Self::validate_input_length(text)?;
                if text == current {
                    None
                } else {
                    let embedding = self.gateway.embed(text, metadata.as_ref())?;
                    Some((text.to_string(), embedding))
                }
            }
            None => None,
        };

        let snapshot = self.with_state(|state| -> Result<Option<PendingWrite>, Error> {
            if let Some((_, embedding)) = &replacement {
                state.check_dimension(embedding.len())?;
            }
            // deleted while we were embedding
            let Some(entry) = state.get_mut(entry_id) else {
                return Ok(None);
            };

            let content_changed = replacement.is_some();
            if let Some((text, embedding)) = replacement {
                entry.content = text;
                entry.embedding = embedding;
            }
            if let Some(metadata) = metadata {
                entry.merge_metadata(metadata);
            }
            entry.last_accessed = Utc::now();

            if content_changed {
                state.index.mark_dirty();
            }
            Ok(Some(state.snapshot()))
        })?;

        match snapshot {
            Some(snapshot) => {
                self.schedule_persist(snapshot);
                debug!(entry_id, "memory updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Delete an entry.
    ///
    /// The accelerated index is rebuilt before the lock is released, so no
    /// search ever sees the removed entry.
    ///
    /// # Returns
    ///
    /// - `true` if the entry was deleted
    /// - `false` if it didn't exist
    pub fn delete_memory(&self, entry_id: &str) -> bool {
        let guard = self.state.lock();
        if guard.borrow_mut().remove(entry_id).is_none() {
            return false;
        }
        guard.borrow_mut().index.mark_dirty();
        self.rebuild_index();
        let snapshot = guard.borrow_mut().snapshot();
        drop(guard);

        self.schedule_persist(snapshot);
        debug!(entry_id, "memory deleted");
        true
    }

    /// Remove every entry and reset the index. Returns how many were removed.
    pub fn clear_memories(&self) -> usize {
        let (removed, snapshot) = self.with_state(|state| {
            let removed = state.clear();
            (removed, state.snapshot())
        });
        self.schedule_persist(snapshot);
        debug!(removed, "memories cleared");
        removed
    }
}
