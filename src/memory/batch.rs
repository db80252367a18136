//! Batch ingestion for the memory store.

use rayon::prelude::*;
use tracing::debug;

use crate::embedding::EmbeddingError;
use crate::errors::Error;
use crate::persistence::PendingWrite;

use super::entry::{BatchItem, MemoryEntry};
use super::store::MemoryStore;

impl MemoryStore {
    #[must_use = "handle the error or the entry ids may be lost"]
    /// Add several entries at once.
    ///
    /// Contents are embedded through `batch_embed` in chunks of
    /// `embedding_batch_size`, chunks running in parallel on the worker pool.
    /// Nothing is stored unless every embedding succeeds; on success all
    /// entries are inserted under one lock acquisition and a single snapshot
    /// write is scheduled.
    ///
    /// # Returns
    ///
    /// Entry ids in input order. An empty batch returns an empty list.
    ///
    /// # Errors
    ///
    /// Returns error if any content is invalid, any chunk fails to embed, or
    /// the vectors disagree in dimension with each other or with the store.
    /// The store is unchanged in every error case.
    pub fn batch_add_memories(&self, items: Vec<BatchItem>) -> Result<Vec<String>, Error> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        for item in &items {
            Self::validate_input_length(&item.content)?;
        }

        let texts: Vec<String> = items.iter().map(|item| item.content.clone()).collect();
        let embeddings = self.embed_chunked(&texts)?;

        let first_dim = embeddings[0].len();
        if let Some(bad) = embeddings.iter().find(|e| e.len() != first_dim) {
            return Err(Error::DimensionMismatch {
                expected: first_dim,
                actual: bad.len(),
            });
        }

        let entries: Vec<MemoryEntry> = items
            .into_iter()
            .zip(embeddings)
            .map(|(item, embedding)| {
                MemoryEntry::new(&item.content, embedding, item.metadata.unwrap_or_default())
            })
            .collect();
        let ids: Vec<String> = entries.iter().map(|e| e.entry_id.clone()).collect();

        let snapshot = self.with_state(|state| -> Result<PendingWrite, Error> {
            state.check_dimension(first_dim)?;
            for entry in entries {
                state.insert(entry);
            }
            Ok(state.snapshot())
        })?;
        self.schedule_persist(snapshot);

        debug!(count = ids.len(), "batch added");
        Ok(ids)
    }

    /// Embed `texts` chunk by chunk on the worker pool, preserving order.
    fn embed_chunked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
        let batch_size = self.config.embedding_batch_size.max(1);
        let gateway = &self.gateway;

        let chunks = self.pool.install(|| {
            texts
                .par_chunks(batch_size)
                .map(|chunk| -> Result<Vec<Vec<f32>>, EmbeddingError> {
                    let vectors = gateway.batch_embed(chunk)?;
                    if vectors.len() != chunk.len() {
                        return Err(EmbeddingError::Provider(format!(
                            "batch_embed returned {} vectors for {} texts",
                            vectors.len(),
                            chunk.len()
                        )));
                    }
                    Ok(vectors)
                })
                .collect::<Result<Vec<_>, EmbeddingError>>()
        })?;

        Ok(chunks.into_iter().flatten().collect())
    }
}
