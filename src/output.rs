//! JSON response envelopes for the command dispatcher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::memory::{MemoryEntry, Metadata, ScoredEntry};

/// Outcome marker carried by every response.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// An entry as shown to callers. Embeddings are never echoed.
#[derive(Serialize, Debug)]
pub struct EntryView {
    pub entry_id: String,
    pub content: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u64,
}

impl From<MemoryEntry> for EntryView {
    fn from(entry: MemoryEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            content: entry.content,
            metadata: entry.metadata,
            created_at: entry.created_at,
            last_accessed: entry.last_accessed,
            access_count: entry.access_count,
        }
    }
}

/// Response for successful memory addition.
#[derive(Serialize)]
pub struct AddResponse {
    pub status: Status,
    pub entry_id: String,
}

/// Response for a batch addition, ids in input order.
#[derive(Serialize)]
pub struct BatchAddResponse {
    pub status: Status,
    pub entry_ids: Vec<String>,
}

/// Response for retrieving a specific memory.
#[derive(Serialize)]
pub struct GetResponse {
    pub status: Status,
    pub entry: EntryView,
}

/// Individual search result item.
#[derive(Serialize)]
pub struct SearchResultItem {
    #[serde(flatten)]
    pub entry: EntryView,
    pub similarity: f64,
}

impl From<ScoredEntry> for SearchResultItem {
    fn from(scored: ScoredEntry) -> Self {
        Self {
            entry: scored.entry.into(),
            similarity: scored.similarity,
        }
    }
}

/// Response for search results.
#[derive(Serialize)]
pub struct SearchResponse {
    pub status: Status,
    pub count: usize,
    pub results: Vec<SearchResultItem>,
}

/// Response for successful memory update.
#[derive(Serialize)]
pub struct UpdateResponse {
    pub status: Status,
    pub entry_id: String,
    pub updated: bool,
}

/// Response for successful memory deletion.
#[derive(Serialize)]
pub struct DeleteResponse {
    pub status: Status,
    pub entry_id: String,
    pub deleted: bool,
}

/// Response for clearing the store.
#[derive(Serialize)]
pub struct ClearResponse {
    pub status: Status,
    pub cleared: usize,
}

/// Response for errors.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }
}

/// Convert a response into a JSON value, falling back to an error envelope
/// if serialization fails.
pub fn to_json<T: Serialize>(response: &T) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        serde_json::json!({
            "status": Status::Error,
            "message": format!("Failed to serialize response: {e}"),
        })
    })
}
