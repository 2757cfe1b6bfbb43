//! Change notifications published by the mock server.
//!
//! Every subscriber receives each event once, in publication order. A slow
//! subscriber that falls more than [`EVENT_CHANNEL_CAPACITY`] events behind
//! observes `RecvError::Lagged` rather than blocking the server.

use super::types::{MockRequestLog, MockServerConfiguration, MockServerStatus};
use std::sync::Arc;
use tokio::sync::broadcast;

pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum MockServerEvent {
    StatusChanged(MockServerStatus),
    RequestReceived(Arc<MockRequestLog>),
    /// A single configuration was saved or activated
    ConfigurationChanged(Arc<MockServerConfiguration>),
    /// The set of configurations changed (create/delete)
    ConfigurationsChanged,
}

/// Publisher side of the event channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MockServerEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MockServerEvent> {
        self.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: MockServerEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
