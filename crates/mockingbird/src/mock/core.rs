//! State shared between the lifecycle owner and concurrent request handlers.

use super::events::{EventBus, MockServerEvent};
use super::request_log::RequestLog;
use super::route::find_best_match;
use super::types::{MockEndpoint, MockRequestLog, MockServerConfiguration};
use crate::metrics;
use crate::variables::VariableSubstitutor;
use arc_swap::ArcSwapOption;
use std::sync::Arc;
use tracing::info;

/// Shared runtime state of the mock server.
///
/// The active configuration is swapped wholesale; handlers take a snapshot and
/// never observe a partially updated endpoint table.
pub struct MockServerCore {
    active: ArcSwapOption<MockServerConfiguration>,
    request_log: RequestLog,
    events: EventBus,
    substitutor: Arc<dyn VariableSubstitutor>,
}

impl MockServerCore {
    pub fn new(log_capacity: usize, substitutor: Arc<dyn VariableSubstitutor>) -> Self {
        Self {
            active: ArcSwapOption::empty(),
            request_log: RequestLog::new(log_capacity),
            events: EventBus::new(),
            substitutor,
        }
    }

    pub fn active_configuration(&self) -> Option<Arc<MockServerConfiguration>> {
        self.active.load_full()
    }

    pub fn set_active_configuration(&self, configuration: Option<Arc<MockServerConfiguration>>) {
        self.active.store(configuration);
    }

    /// Resolve the endpoint answering `method path` in the active configuration.
    pub fn find_endpoint(&self, method: &str, path: &str) -> Option<MockEndpoint> {
        let guard = self.active.load();
        let configuration = guard.as_ref()?;
        find_best_match(&configuration.endpoints, method, path).cloned()
    }

    pub fn substitute(&self, text: &str) -> String {
        self.substitutor.substitute(text)
    }

    pub fn request_log(&self) -> &RequestLog {
        &self.request_log
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Store a finished request record and notify subscribers.
    pub fn record_request(&self, entry: MockRequestLog) {
        let verbose = self
            .active
            .load()
            .as_ref()
            .is_some_and(|c| c.enable_request_logging);
        if verbose {
            info!(
                "{} {}{} -> {} in {}ms",
                entry.method,
                entry.path,
                entry.query_string,
                entry.response_status_code,
                entry.processing_time_ms
            );
        }
        metrics::record_request(
            &entry.method,
            entry.response_status_code,
            entry.was_matched(),
            entry.processing_time_ms,
        );

        let entry = Arc::new(entry);
        self.request_log.push(Arc::clone(&entry));
        self.events.publish(MockServerEvent::RequestReceived(entry));
    }
}
