//! Command dispatcher: JSON requests in, JSON envelopes out.
//!
//! A request is an object `{"command": <name>, ...payload}`. Every response
//! carries `"status": "success" | "error"`; failures of any kind, including
//! malformed requests, come back as `{"status": "error", "message": ...}`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::Error;
use crate::memory::{BatchItem, MemoryStore, Metadata};
use crate::output::*;

/// Result count for `search` when the request gives no `limit`.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Command names accepted by the dispatcher.
pub const COMMANDS: [&str; 7] = [
    "add",
    "batch_add",
    "get",
    "search",
    "update",
    "delete",
    "clear",
];

fn default_limit() -> usize {
    DEFAULT_SEARCH_LIMIT
}

/// A parsed request.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Add {
        content: String,
        #[serde(default)]
        metadata: Option<Metadata>,
    },
    BatchAdd {
        items: Vec<BatchItem>,
    },
    Get {
        entry_id: String,
    },
    Search {
        query: String,
        #[serde(default = "default_limit")]
        limit: usize,
    },
    Update {
        entry_id: String,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        metadata: Option<Metadata>,
    },
    Delete {
        entry_id: String,
    },
    Clear,
}

/// Parse a request object into a [`Command`].
///
/// # Errors
///
/// Returns `Error::Memory` if the command field is missing, names an unknown
/// command, or the payload doesn't match the command.
pub fn parse_command(request: &Value) -> Result<Command, Error> {
    let name = request
        .get("command")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Memory("Missing command".to_string()))?;
    if !COMMANDS.contains(&name) {
        return Err(Error::Memory(format!("Unknown command: {name}")));
    }
    serde_json::from_value(request.clone())
        .map_err(|e| Error::Memory(format!("Invalid payload for {name}: {e}")))
}

/// Synchronous request handler over a shared store.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<MemoryStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Handle one request. Never fails; errors become error envelopes.
    pub fn handle(&self, request: &Value) -> Value {
        match parse_command(request).and_then(|command| execute(&self.store, command)) {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "command failed");
                to_json(&ErrorResponse::new(e.to_string()))
            }
        }
    }

    /// Handle one request given as JSON text, returning JSON text.
    pub fn handle_json(&self, request: &str) -> String {
        let response = match serde_json::from_str::<Value>(request) {
            Ok(value) => self.handle(&value),
            Err(e) => to_json(&ErrorResponse::new(format!("Invalid JSON request: {e}"))),
        };
        response.to_string()
    }
}

/// Execute a parsed command against `store`.
pub fn execute(store: &MemoryStore, command: Command) -> Result<Value, Error> {
    match command {
        Command::Add { content, metadata } => handle_add(store, &content, metadata),
        Command::BatchAdd { items } => handle_batch_add(store, items),
        Command::Get { entry_id } => handle_get(store, &entry_id),
        Command::Search { query, limit } => handle_search(store, &query, limit),
        Command::Update {
            entry_id,
            content,
            metadata,
        } => handle_update(store, &entry_id, content.as_deref(), metadata),
        Command::Delete { entry_id } => handle_delete(store, &entry_id),
        Command::Clear => handle_clear(store),
    }
}

fn handle_add(store: &MemoryStore, content: &str, metadata: Option<Metadata>) -> Result<Value, Error> {
    let entry_id = store.add_memory(content, metadata)?;
    Ok(to_json(&AddResponse {
        status: Status::Success,
        entry_id,
    }))
}

fn handle_batch_add(store: &MemoryStore, items: Vec<BatchItem>) -> Result<Value, Error> {
    let entry_ids = store.batch_add_memories(items)?;
    Ok(to_json(&BatchAddResponse {
        status: Status::Success,
        entry_ids,
    }))
}

fn handle_get(store: &MemoryStore, entry_id: &str) -> Result<Value, Error> {
    let entry = store
        .get_memory(entry_id)
        .ok_or_else(|| Error::NotFound(entry_id.to_string()))?;
    Ok(to_json(&GetResponse {
        status: Status::Success,
        entry: entry.into(),
    }))
}

fn handle_search(store: &MemoryStore, query: &str, limit: usize) -> Result<Value, Error> {
    let results: Vec<SearchResultItem> = store
        .search_memories(query, limit)?
        .into_iter()
        .map(SearchResultItem::from)
        .collect();
    Ok(to_json(&SearchResponse {
        status: Status::Success,
        count: results.len(),
        results,
    }))
}

fn handle_update(
    store: &MemoryStore,
    entry_id: &str,
    content: Option<&str>,
    metadata: Option<Metadata>,
) -> Result<Value, Error> {
    if !store.update_memory(entry_id, content, metadata)? {
        return Err(Error::NotFound(entry_id.to_string()));
    }
    Ok(to_json(&UpdateResponse {
        status: Status::Success,
        entry_id: entry_id.to_string(),
        updated: true,
    }))
}

fn handle_delete(store: &MemoryStore, entry_id: &str) -> Result<Value, Error> {
    if !store.delete_memory(entry_id) {
        return Err(Error::NotFound(entry_id.to_string()));
    }
    Ok(to_json(&DeleteResponse {
        status: Status::Success,
        entry_id: entry_id.to_string(),
        deleted: true,
    }))
}

fn handle_clear(store: &MemoryStore) -> Result<Value, Error> {
    let cleared = store.clear_memories();
    Ok(to_json(&ClearResponse {
        status: Status::Success,
        cleared,
    }))
}
