use super::{upsert_in, ConfigurationStore, StoreError};
use crate::mock::MockServerConfiguration;
use parking_lot::RwLock;
use uuid::Uuid;

/// Process-local configuration store
#[derive(Default)]
pub struct InMemoryStore {
    configurations: RwLock<Vec<MockServerConfiguration>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_configurations(configurations: Vec<MockServerConfiguration>) -> Self {
        Self {
            configurations: RwLock::new(configurations),
        }
    }
}

impl ConfigurationStore for InMemoryStore {
    fn list(&self) -> Result<Vec<MockServerConfiguration>, StoreError> {
        Ok(self.configurations.read().clone())
    }

    fn get(&self, id: Uuid) -> Result<Option<MockServerConfiguration>, StoreError> {
        Ok(self.configurations.read().iter().find(|c| c.id == id).cloned())
    }

    fn upsert(&self, configuration: &MockServerConfiguration) -> Result<(), StoreError> {
        upsert_in(&mut self.configurations.write(), configuration);
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.configurations.write().retain(|c| c.id != id);
        Ok(())
    }

    fn delete_all(&self) -> Result<(), StoreError> {
        self.configurations.write().clear();
        Ok(())
    }
}
