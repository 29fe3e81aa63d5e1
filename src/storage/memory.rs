//! # In-Memory Backend
//!
//! Same key semantics as [`LocalBackend`](super::LocalBackend) without a
//! filesystem. Used by tests and by callers that want a throwaway space.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use super::backend::StorageBackend;
use super::errors::{StorageError, StorageResult};

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All stored keys starting with `prefix`, at any depth
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        match self.entries.read() {
            Ok(entries) => entries
                .keys()
                .filter(|k| k.starts_with(prefix))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn poisoned() -> StorageError {
        StorageError::Internal("memory backend lock poisoned".to_string())
    }
}

impl StorageBackend for MemoryBackend {
    fn write(&self, key: &str, data: &[u8]) -> StorageResult<()> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn delete(&self, key: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| Self::poisoned())?;
        entries
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn exists(&self, key: &str) -> StorageResult<bool> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        Ok(entries.contains_key(key))
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let entries = self.entries.read().map_err(|_| Self::poisoned())?;
        let dir = if prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", prefix)
        };

        // Nested keys surface as their first segment, like a directory would.
        let children: BTreeSet<String> = entries
            .range(dir.clone()..)
            .take_while(|(k, _)| k.starts_with(&dir))
            .filter_map(|(k, _)| {
                let rest = &k[dir.len()..];
                rest.split('/').next().filter(|s| !s.is_empty())
            })
            .map(|child| format!("{}{}", dir, child))
            .collect();

        Ok(children.into_iter().collect())
    }
}
