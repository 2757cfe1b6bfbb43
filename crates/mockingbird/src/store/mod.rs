//! Durable storage of mock server configurations.
//!
//! Configurations are stored and loaded as whole aggregates: there is no
//! per-endpoint persistence. Two backends are provided:
//! - [`InMemoryStore`]: process-local, used by tests and when no data file is configured
//! - [`JsonFileStore`]: a single JSON document on disk

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::InMemoryStore;

use crate::mock::MockServerConfiguration;
use uuid::Uuid;

/// Configuration store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration data in {path}: {source}")]
    Serialization {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// CRUD contract consumed by the mock server.
pub trait ConfigurationStore: Send + Sync {
    /// All configurations in insertion order
    fn list(&self) -> Result<Vec<MockServerConfiguration>, StoreError>;
    fn get(&self, id: Uuid) -> Result<Option<MockServerConfiguration>, StoreError>;
    /// Insert or replace by id
    fn upsert(&self, configuration: &MockServerConfiguration) -> Result<(), StoreError>;
    fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    fn delete_all(&self) -> Result<(), StoreError>;
}

/// Insert-or-replace on an ordered list, shared by both backends.
fn upsert_in(configurations: &mut Vec<MockServerConfiguration>, configuration: &MockServerConfiguration) {
    match configurations.iter_mut().find(|c| c.id == configuration.id) {
        Some(existing) => *existing = configuration.clone(),
        None => configurations.push(configuration.clone()),
    }
}
