//! The kekspace record: identity of a set of documents.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contact::Contact;
use super::errors::{SpaceError, SpaceResult};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::keys::SPACE_KEY;
use crate::storage::{StorageBackend, StorageError};

/// Options for a new kekspace
#[derive(Debug, Clone, Default)]
pub struct SpaceConfig {
    /// Display name; generated when absent
    pub name: Option<String>,
    pub owner: Option<Contact>,
    pub contributors: Vec<Contact>,
}

/// A logical container for documents. Its `id` salts every chain digest,
/// so the same attributes hash differently in different spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kekspace {
    pub id: Uuid,
    pub kek_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub owner: Option<Contact>,
    #[serde(default)]
    pub contributors: Vec<Contact>,
}

impl Kekspace {
    /// Build a fresh space record without persisting it.
    pub fn new(config: SpaceConfig) -> Self {
        let created_at = Utc::now();
        let name = match config.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => generated_name(created_at),
        };

        Self {
            id: Uuid::new_v4(),
            kek_id: format!("ss{}", Uuid::new_v4().simple()),
            name,
            created_at,
            owner: config.owner,
            contributors: config.contributors,
        }
    }

    /// Create and persist a space. Fails if the backend already holds one.
    pub fn create(backend: &dyn StorageBackend, config: SpaceConfig) -> SpaceResult<Self> {
        if backend.exists(SPACE_KEY)? {
            return Err(SpaceError::AlreadyInitialized);
        }

        let space = Self::new(config);
        let bytes =
            serde_json::to_vec(&space).map_err(|e| SpaceError::Serialization(e.to_string()))?;
        backend.write(SPACE_KEY, &bytes)?;

        log_event_with_fields(
            Event::SpaceInitialized,
            &[("kek_id", space.kek_id.as_str()), ("name", space.name.as_str())],
        );
        Ok(space)
    }

    /// Load the space record from storage.
    pub fn load(backend: &dyn StorageBackend) -> SpaceResult<Self> {
        let bytes = backend.read(SPACE_KEY).map_err(|e| match e {
            StorageError::NotFound(_) => SpaceError::NotInitialized,
            other => SpaceError::Storage(other),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| SpaceError::Serialization(e.to_string()))
    }

    /// Identity salt mixed into every chain digest
    pub fn salt(&self) -> String {
        self.id.to_string()
    }
}

fn generated_name(at: DateTime<Utc>) -> String {
    let prefix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}{}", prefix, at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_create_then_load() {
        let backend = MemoryBackend::new();
        let created = Kekspace::create(
            &backend,
            SpaceConfig {
                name: Some("notes".into()),
                owner: Some(Contact::new("Ada", "Lovelace", "ada@example.com")),
                contributors: Vec::new(),
            },
        )
        .unwrap();

        let loaded = Kekspace::load(&backend).unwrap();
        assert_eq!(created, loaded);
        assert_eq!(loaded.name, "notes");
        assert!(loaded.kek_id.starts_with("ss"));
    }

    #[test]
    fn test_create_twice_fails() {
        let backend = MemoryBackend::new();
        Kekspace::create(&backend, SpaceConfig::default()).unwrap();
        let again = Kekspace::create(&backend, SpaceConfig::default());
        assert!(matches!(again, Err(SpaceError::AlreadyInitialized)));
    }

    #[test]
    fn test_load_missing() {
        let backend = MemoryBackend::new();
        assert!(matches!(Kekspace::load(&backend), Err(SpaceError::NotInitialized)));
    }

    #[test]
    fn test_generated_name() {
        let space = Kekspace::new(SpaceConfig::default());
        let ts = space.created_at.timestamp().to_string();
        assert!(space.name.ends_with(&ts));
        assert_eq!(space.name.len(), 8 + ts.len());
    }

    #[test]
    fn test_salts_differ_between_spaces() {
        let a = Kekspace::new(SpaceConfig::default());
        let b = Kekspace::new(SpaceConfig::default());
        assert_ne!(a.salt(), b.salt());
    }
}
