//! JSON file storage backend.
//!
//! Each namespace lives in `{data_dir}/{namespace}.json` as a flat JSON
//! object. Every write rewrites the whole file; a missing file reads as
//! an empty namespace.

use super::{KeyValueStore, Namespace, Record};
use crate::error::StorageError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct JsonFileStorage {
    dir: PathBuf,
    /// Serializes read-modify-write cycles on the namespace files.
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, ns: Namespace) -> PathBuf {
        self.dir.join(format!("{}.json", ns.as_str()))
    }

    fn load(&self, ns: Namespace) -> Result<Record, StorageError> {
        let path = self.path(ns);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Record::new()),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(Record::new());
        }
        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: path.display().to_string(),
            source,
        })
    }

    fn save(&self, ns: Namespace, data: &Record) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.display().to_string(),
            source,
        })?;
        let path = self.path(ns);
        let json = serde_json::to_string_pretty(data).map_err(|source| StorageError::Serialize {
            key: ns.as_str().to_string(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| StorageError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("[STORAGE] Wrote {} ({} keys)", path.display(), data.len());
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStorage {
    async fn get(&self, ns: Namespace, keys: &[&str]) -> Result<Record, StorageError> {
        let _guard = self.lock()?;
        let mut data = self.load(ns)?;
        Ok(keys
            .iter()
            .filter_map(|k| data.remove(*k).map(|v| (k.to_string(), v)))
            .collect())
    }

    async fn set(&self, ns: Namespace, items: Record) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let mut data = self.load(ns)?;
        data.extend(items);
        self.save(ns, &data)
    }

    async fn remove(&self, ns: Namespace, keys: &[&str]) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let mut data = self.load(ns)?;
        let before = data.len();
        for k in keys {
            data.remove(*k);
        }
        if data.len() == before {
            return Ok(());
        }
        self.save(ns, &data)
    }
}
