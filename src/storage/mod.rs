//! Key-value storage collaborator.
//!
//! Two logical namespaces, mirroring the browser's storage areas:
//!   - `Sync`: follows the user across devices (prompts, legacy key)
//!   - `Local`: this device only (per-provider keys, selections)
//!
//! Backends:
//!   - memory.rs: in-process maps (tests, ephemeral hosts)
//!   - file.rs: one JSON file per namespace under the data dir

mod file;
mod memory;

pub use file::JsonFileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Partial record returned by `get` and accepted by `set`.
pub type Record = Map<String, Value>;

// Sync namespace keys
pub const KEY_CUSTOM_PROMPTS: &str = "customPrompts";
pub const KEY_LEGACY_API_KEY: &str = "apiKey";

// Local namespace keys
pub const KEY_API_KEYS: &str = "apiKeys";
pub const KEY_SELECTED_MODEL: &str = "selectedModel";
pub const KEY_SELECTED_PROMPT_ID: &str = "selectedPromptId";
pub const KEY_IS_DEEP_CONTEXT: &str = "isDeepContext";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Sync,
    Local,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Sync => "sync",
            Namespace::Local => "local",
        }
    }
}

/// Async get/set/remove over a namespace. Missing keys are absent from
/// the returned record, never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, ns: Namespace, keys: &[&str]) -> Result<Record, StorageError>;

    async fn set(&self, ns: Namespace, items: Record) -> Result<(), StorageError>;

    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StorageError>;
}

/// Build a one-entry record.
pub fn record(key: &str, value: Value) -> Record {
    let mut map = Record::new();
    map.insert(key.to_string(), value);
    map
}

/// Serialize a value into a one-entry record.
pub fn record_of<T: serde::Serialize>(key: &str, value: &T) -> Result<Record, StorageError> {
    let value = serde_json::to_value(value).map_err(|source| StorageError::Serialize {
        key: key.to_string(),
        source,
    })?;
    Ok(record(key, value))
}
