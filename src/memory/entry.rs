//! Memory entry records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller-defined key/value metadata. Never interpreted by the store.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// One stored unit of content with its embedding and bookkeeping.
///
/// Field names are also the persisted snapshot format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: Metadata,
    /// UUID v4, fixed at creation.
    pub entry_id: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
}

impl MemoryEntry {
    pub(crate) fn new(content: &str, embedding: Vec<f32>, metadata: Metadata) -> Self {
        let now = Utc::now();
        Self {
            content: content.to_string(),
            embedding,
            metadata,
            entry_id: Uuid::new_v4().to_string(),
            created_at: now,
            last_accessed: now,
            access_count: 0,
        }
    }

    /// Record one read of this entry.
    pub(crate) fn touch(&mut self) {
        self.access_count += 1;
        self.last_accessed = Utc::now();
    }

    /// Shallow merge: new keys added, existing keys overwritten, the rest kept.
    pub(crate) fn merge_metadata(&mut self, updates: Metadata) {
        self.metadata.extend(updates);
    }
}

/// A search hit: the entry (counters already updated) and its score.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: MemoryEntry,
    pub similarity: f64,
}

/// One input to `batch_add_memories`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BatchItem {
    pub content: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

impl BatchItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
