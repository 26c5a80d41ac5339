//! Local fallback persistence
//!
//! Per-user namespaced JSON blobs on disk, used when the remote store is
//! unavailable or returns no rows. Keys map to `<root>/<key>.json`. Two
//! processes writing the same key are last-write-wins, by design of the
//! fallback tier.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("record not found")]
    NotFound,
}

#[derive(Clone)]
pub struct LocalStore {
    root: PathBuf,
    lock: Arc<RwLock<()>>,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            lock: Arc::new(RwLock::new(())),
        })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", key))
    }

    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let _guard = self.lock.read();
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    pub fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let _guard = self.lock.write();
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(self.path_for(key), raw)?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write();
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
