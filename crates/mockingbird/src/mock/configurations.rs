//! Configuration and endpoint table management.
//!
//! Every mutation persists the whole configuration aggregate. Operations that
//! target an unknown configuration id are silent no-ops.
//!
//! Mutations are serialized by the server's writer lock, held from the read
//! of the stored aggregate through the swap of the active configuration.
//! Helpers suffixed `_locked` expect the caller to hold it.

use super::events::MockServerEvent;
use super::server::MockServer;
use super::types::{MockEndpoint, MockServerConfiguration, MockServerError};
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

impl MockServer {
    // ===== Configurations =====

    pub fn configurations(&self) -> Result<Vec<MockServerConfiguration>, MockServerError> {
        Ok(self.store.list()?)
    }

    pub fn configuration(&self, id: Uuid) -> Result<Option<MockServerConfiguration>, MockServerError> {
        Ok(self.store.get(id)?)
    }

    /// Create and persist an empty configuration with the default preferred port.
    pub fn create_configuration(
        &self,
        name: &str,
    ) -> Result<MockServerConfiguration, MockServerError> {
        let _writer = self.writer.lock();
        self.create_configuration_locked(name)
    }

    pub(super) fn create_configuration_locked(
        &self,
        name: &str,
    ) -> Result<MockServerConfiguration, MockServerError> {
        let configuration = MockServerConfiguration::new(name, self.settings.default_port);
        self.store.upsert(&configuration)?;
        debug!("Created configuration {} ({})", configuration.name, configuration.id);
        self.events().publish(MockServerEvent::ConfigurationsChanged);
        Ok(configuration)
    }

    /// Persist a configuration, stamping its modification time.
    ///
    /// When it is the active configuration, running handlers switch to the new
    /// version atomically.
    pub fn save_configuration(
        &self,
        configuration: MockServerConfiguration,
    ) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        self.save_configuration_locked(configuration)
    }

    fn save_configuration_locked(
        &self,
        mut configuration: MockServerConfiguration,
    ) -> Result<(), MockServerError> {
        configuration.modified_at = Utc::now();
        self.store.upsert(&configuration)?;

        let configuration = Arc::new(configuration);
        if self.active_configuration_id() == Some(configuration.id) {
            self.core
                .set_active_configuration(Some(Arc::clone(&configuration)));
        }

        self.events()
            .publish(MockServerEvent::ConfigurationChanged(configuration));
        self.events().publish(MockServerEvent::ConfigurationsChanged);
        Ok(())
    }

    /// Delete a configuration. If it was active, the first remaining one becomes active.
    pub fn delete_configuration(&self, id: Uuid) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        self.store.delete(id)?;

        if self.active_configuration_id() == Some(id) {
            let next = self.store.list()?.into_iter().next().map(Arc::new);
            self.core.set_active_configuration(next);
        }

        self.events().publish(MockServerEvent::ConfigurationsChanged);
        Ok(())
    }

    /// Delete every stored configuration and clear the active one.
    pub fn delete_all_configurations(&self) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        self.store.delete_all()?;
        self.core.set_active_configuration(None);
        self.events().publish(MockServerEvent::ConfigurationsChanged);
        Ok(())
    }

    /// Make a stored configuration active. Returns `false` for unknown ids.
    ///
    /// Takes effect immediately for a running listener; the bound port is kept.
    pub fn set_active_configuration(&self, id: Uuid) -> Result<bool, MockServerError> {
        let _writer = self.writer.lock();
        let Some(configuration) = self.store.get(id)? else {
            return Ok(false);
        };
        let configuration = Arc::new(configuration);
        self.core
            .set_active_configuration(Some(Arc::clone(&configuration)));
        self.events()
            .publish(MockServerEvent::ConfigurationChanged(configuration));
        Ok(true)
    }

    // ===== Endpoints =====

    pub fn add_endpoint(
        &self,
        configuration_id: Uuid,
        endpoint: MockEndpoint,
    ) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        let Some(mut configuration) = self.store.get(configuration_id)? else {
            return Ok(());
        };
        configuration.endpoints.push(endpoint);
        self.save_configuration_locked(configuration)
    }

    /// Replace the endpoint with the same id. Unknown endpoint ids are ignored.
    pub fn update_endpoint(
        &self,
        configuration_id: Uuid,
        endpoint: MockEndpoint,
    ) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        let Some(mut configuration) = self.store.get(configuration_id)? else {
            return Ok(());
        };
        let Some(slot) = configuration
            .endpoints
            .iter_mut()
            .find(|e| e.id == endpoint.id)
        else {
            return Ok(());
        };
        *slot = endpoint;
        self.save_configuration_locked(configuration)
    }

    pub fn remove_endpoint(
        &self,
        configuration_id: Uuid,
        endpoint_id: Uuid,
    ) -> Result<(), MockServerError> {
        let _writer = self.writer.lock();
        let Some(mut configuration) = self.store.get(configuration_id)? else {
            return Ok(());
        };
        configuration.endpoints.retain(|e| e.id != endpoint_id);
        self.save_configuration_locked(configuration)
    }

    pub fn get_endpoint(
        &self,
        configuration_id: Uuid,
        endpoint_id: Uuid,
    ) -> Result<Option<MockEndpoint>, MockServerError> {
        Ok(self
            .store
            .get(configuration_id)?
            .and_then(|c| c.endpoint(endpoint_id).cloned()))
    }
}
