//! Persisted booking drafts.
//!
//! The portal used to scatter draft reads/writes across call sites, each
//! touching its own storage key. All draft persistence now goes through
//! this one repository with an explicit `save`/`load`/`clear` lifecycle
//! over a sled keyspace.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors from draft persistence.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("Draft storage error: {0}")]
    Storage(String),

    #[error("Draft serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sled::Error> for DraftError {
    fn from(e: sled::Error) -> Self {
        DraftError::Storage(e.to_string())
    }
}

/// Key-value store for in-progress form drafts.
pub struct DraftRepository {
    db: sled::Db,
}

impl DraftRepository {
    /// Opens (or creates) the draft store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DraftError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Creates an in-memory store that vanishes on drop. For tests.
    pub fn temporary() -> Result<Self, DraftError> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Ok(Self { db })
    }

    /// Saves a draft under `key`, replacing any previous value.
    pub fn save<T: Serialize>(&self, key: &str, draft: &T) -> Result<(), DraftError> {
        let bytes = serde_json::to_vec(draft)?;
        self.db.insert(key, bytes)?;
        self.db.flush()?;
        Ok(())
    }

    /// Loads the draft under `key`, if one exists.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DraftError> {
        match self.db.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Removes the draft under `key`. Clearing an absent key is a no-op.
    pub fn clear(&self, key: &str) -> Result<(), DraftError> {
        self.db.remove(key)?;
        self.db.flush()?;
        Ok(())
    }
}
