//! Similarity search for the memory store.

use tracing::debug;

use crate::errors::Error;

use super::entry::ScoredEntry;
use super::store::{MemoryStore, validate_limit};

/// Slack allowed when comparing a score against the threshold, so a
/// threshold of 1.0 still keeps exact matches.
pub const SIMILARITY_EPSILON: f64 = 1e-6;

impl MemoryStore {
    #[must_use = "handle the error or results may be lost"]
    /// Search memories by semantic similarity.
    ///
    /// Embeds the query, then takes candidates from the accelerated index when
    /// it is usable (rebuilding it first if a delete or update invalidated it)
    /// or from every stored entry otherwise. Candidates are rescored with the
    /// gateway's `similarity`, filtered by `similarity_threshold` and ranked
    /// by score, ties going to the older entry.
    ///
    /// Every returned entry has its access counter incremented.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Query is empty or exceeds `MAX_INPUT_LENGTH`
    /// - Limit is 0 or exceeds `MAX_SEARCH_LIMIT`
    /// - Embedding or scoring fails
    /// - The query vector's dimension differs from the store's
    pub fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<ScoredEntry>, Error> {
        validate_limit(limit)?;
        Self::validate_input_length(query)?;

        let query_vec = self.gateway.embed(query, None)?;
        let threshold = self.config.similarity_threshold - SIMILARITY_EPSILON;

        self.with_state(|state| -> Result<Vec<ScoredEntry>, Error> {
            if state.entries.is_empty() {
                return Ok(Vec::new());
            }
            state.check_dimension(query_vec.len())?;
            if state.index.needs_rebuild() {
                state.rebuild_index();
            }

            let candidates: Vec<u64> = match state.index.nearest(&query_vec, limit) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| state.positions.get(id).copied())
                    .collect(),
                None => state.entries.keys().copied().collect(),
            };
            let scanned = candidates.len();

            let mut scored = Vec::with_capacity(candidates.len());
            for seq in candidates {
                let Some(entry) = state.entries.get(&seq) else {
                    continue;
                };
                // lock held: gateways must not re-enter the store from here
                let score = self.gateway.similarity(&query_vec, &entry.embedding)?;
                if score >= threshold {
                    scored.push((seq, score));
                }
            }

            scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
            scored.truncate(limit);

            let results: Vec<ScoredEntry> = scored
                .into_iter()
                .filter_map(|(seq, similarity)| {
                    let entry = state.entries.get_mut(&seq)?;
                    entry.touch();
                    Some(ScoredEntry {
                        entry: entry.clone(),
                        similarity,
                    })
                })
                .collect();

            debug!(
                scanned,
                indexed = state.index.len(),
                returned = results.len(),
                "search complete"
            );
            Ok(results)
        })
    }
}
