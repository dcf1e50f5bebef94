//! In-memory storage backend.

use super::{KeyValueStore, Namespace, Record};
use crate::error::StorageError;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    sync: Mutex<Record>,
    local: Mutex<Record>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn area(&self, ns: Namespace) -> &Mutex<Record> {
        match ns {
            Namespace::Sync => &self.sync,
            Namespace::Local => &self.local,
        }
    }

    /// Full copy of a namespace.
    pub fn dump(&self, ns: Namespace) -> Result<Record, StorageError> {
        let guard = self
            .area(ns)
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    async fn get(&self, ns: Namespace, keys: &[&str]) -> Result<Record, StorageError> {
        let guard = self
            .area(ns)
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        Ok(keys
            .iter()
            .filter_map(|k| guard.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, ns: Namespace, items: Record) -> Result<(), StorageError> {
        let mut guard = self
            .area(ns)
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        guard.extend(items);
        Ok(())
    }

    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StorageError> {
        let mut guard = self
            .area(ns)
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        for k in keys {
            guard.remove(*k);
        }
        Ok(())
    }
}
