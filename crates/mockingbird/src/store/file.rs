//! JSON file configuration store.

use super::{upsert_in, ConfigurationStore, StoreError};
use crate::mock::MockServerConfiguration;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Stores all configurations as one pretty-printed JSON array.
///
/// Every mutation rewrites the whole file through a temporary sibling file
/// followed by a rename, so readers never observe a half-written document.
pub struct JsonFileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn load(&self) -> Result<Vec<MockServerConfiguration>, StoreError> {
        if !self.path.exists() {
            debug!("Configuration file {:?} does not exist, starting empty", self.path);
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|source| StoreError::Serialization {
            path: self.path.display().to_string(),
            source,
        })
    }

    fn save(&self, configurations: &[MockServerConfiguration]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(configurations).map_err(|source| {
            StoreError::Serialization {
                path: self.path.display().to_string(),
                source,
            }
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        debug!("Saved {} configurations to {:?}", configurations.len(), self.path);
        Ok(())
    }

    fn modify(
        &self,
        f: impl FnOnce(&mut Vec<MockServerConfiguration>),
    ) -> Result<(), StoreError> {
        let _guard = self.lock.lock();
        let mut configurations = self.load()?;
        f(&mut configurations);
        self.save(&configurations)
    }
}

impl ConfigurationStore for JsonFileStore {
    fn list(&self) -> Result<Vec<MockServerConfiguration>, StoreError> {
        let _guard = self.lock.lock();
        self.load()
    }

    fn get(&self, id: Uuid) -> Result<Option<MockServerConfiguration>, StoreError> {
        Ok(self.list()?.into_iter().find(|c| c.id == id))
    }

    fn upsert(&self, configuration: &MockServerConfiguration) -> Result<(), StoreError> {
        self.modify(|configurations| upsert_in(configurations, configuration))
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.modify(|configurations| configurations.retain(|c| c.id != id))
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.modify(Vec::clear)
    }
}
