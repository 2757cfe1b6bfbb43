//! MockServer - listener lifecycle for the mock HTTP server.
//!
//! States: `Stopped -> Starting -> Running -> Stopping -> Stopped`, with
//! `Error` reachable from `Starting` and `Stopping`. Lifecycle operations are
//! serialized; request handlers run independently of them.

use super::core::MockServerCore;
use super::events::{MockServerEvent, EventBus};
use super::handler::serve_mock_request;
use super::port::{bind_available_port, PortRange};
use super::request_log::DEFAULT_LOG_CAPACITY;
use super::types::{
    MockRequestLog, MockServerConfiguration, MockServerError, MockServerStatus, DEFAULT_PORT,
};
use crate::metrics;
use crate::store::ConfigurationStore;
use crate::variables::VariableSubstitutor;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Name given to the configuration created when none exists at start
pub const DEFAULT_CONFIGURATION_NAME: &str = "Default Mock Server";

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Tunables of the mock listener
#[derive(Debug, Clone)]
pub struct MockServerSettings {
    pub bind_host: String,
    pub port_range: PortRange,
    /// Preferred port of configurations created by the server
    pub default_port: u16,
    pub log_capacity: usize,
    /// Upper bound on waiting for the accept loop in `stop`
    pub stop_timeout: Duration,
}

impl Default for MockServerSettings {
    fn default() -> Self {
        Self {
            bind_host: "127.0.0.1".to_string(),
            port_range: PortRange::default(),
            default_port: DEFAULT_PORT,
            log_capacity: DEFAULT_LOG_CAPACITY,
            stop_timeout: Duration::from_secs(5),
        }
    }
}

/// Accept loop owned by a running server
struct RunningListener {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Embedded mock HTTP server.
///
/// At most one listener is active per instance. The server reads and writes
/// configurations through a [`ConfigurationStore`] and renders response bodies
/// through a [`VariableSubstitutor`].
pub struct MockServer {
    pub(super) settings: MockServerSettings,
    pub(super) store: Arc<dyn ConfigurationStore>,
    pub(super) core: Arc<MockServerCore>,
    /// Serializes configuration writers; never held across an await
    pub(super) writer: parking_lot::Mutex<()>,
    status: RwLock<MockServerStatus>,
    actual_port: RwLock<Option<u16>>,
    /// Running accept loop; the lock also serializes lifecycle transitions
    listener: Mutex<Option<RunningListener>>,
}

impl MockServer {
    pub fn new(
        settings: MockServerSettings,
        store: Arc<dyn ConfigurationStore>,
        substitutor: Arc<dyn VariableSubstitutor>,
    ) -> Self {
        let core = Arc::new(MockServerCore::new(settings.log_capacity, substitutor));
        Self {
            settings,
            store,
            core,
            writer: parking_lot::Mutex::new(()),
            status: RwLock::new(MockServerStatus::Stopped),
            actual_port: RwLock::new(None),
            listener: Mutex::new(None),
        }
    }

    // ===== Runtime state =====

    pub fn status(&self) -> MockServerStatus {
        *self.status.read()
    }

    pub fn is_running(&self) -> bool {
        self.status() == MockServerStatus::Running
    }

    /// Port the listener is bound to, if running
    pub fn actual_port(&self) -> Option<u16> {
        *self.actual_port.read()
    }

    pub fn base_url(&self) -> Option<String> {
        self.actual_port()
            .map(|port| format!("http://localhost:{port}"))
    }

    pub fn active_configuration_id(&self) -> Option<Uuid> {
        self.core.active_configuration().map(|c| c.id)
    }

    pub fn active_configuration(&self) -> Option<Arc<MockServerConfiguration>> {
        self.core.active_configuration()
    }

    pub fn settings(&self) -> &MockServerSettings {
        &self.settings
    }

    /// Subscribe to status, request and configuration events
    pub fn subscribe(&self) -> broadcast::Receiver<MockServerEvent> {
        self.core.events().subscribe()
    }

    pub(super) fn events(&self) -> &EventBus {
        self.core.events()
    }

    fn set_status(&self, status: MockServerStatus) {
        *self.status.write() = status;
        debug!("Mock server status: {}", status);
        self.events().publish(MockServerEvent::StatusChanged(status));
    }

    // ===== Request log =====

    /// Logged requests, most recent first
    pub fn request_logs(&self) -> Vec<Arc<MockRequestLog>> {
        self.core.request_log().snapshot()
    }

    pub fn clear_request_logs(&self) {
        self.core.request_log().clear();
    }

    // ===== Lifecycle =====

    /// Start the listener and return the bound port.
    ///
    /// Activates `configuration_id` if it exists, otherwise the first stored
    /// configuration, otherwise a newly created default one. Calling this while
    /// running returns the current port without rebinding. On failure the
    /// status is `Error` and no listener is left behind.
    pub async fn start(&self, configuration_id: Option<Uuid>) -> Result<u16, MockServerError> {
        let mut running = self.listener.lock().await;

        if self.status() == MockServerStatus::Running {
            if let Some(port) = self.actual_port() {
                return Ok(port);
            }
        }

        self.set_status(MockServerStatus::Starting);

        match self.start_listener(configuration_id, &mut running).await {
            Ok(port) => {
                self.set_status(MockServerStatus::Running);
                metrics::record_start(true);
                info!("Mock server started on port {}", port);
                Ok(port)
            }
            Err(e) => {
                error!("Failed to start mock server: {}", e);
                *self.actual_port.write() = None;
                self.set_status(MockServerStatus::Error);
                metrics::record_start(false);
                Err(e)
            }
        }
    }

    async fn start_listener(
        &self,
        configuration_id: Option<Uuid>,
        running: &mut Option<RunningListener>,
    ) -> Result<u16, MockServerError> {
        let configuration = {
            let _writer = self.writer.lock();
            let configuration = Arc::new(self.resolve_configuration(configuration_id)?);
            self.core.set_active_configuration(Some(Arc::clone(&configuration)));
            configuration
        };

        let (port, listener) = bind_available_port(
            &self.settings.bind_host,
            configuration.port,
            self.settings.port_range,
        )
        .await?;
        *self.actual_port.write() = Some(port);

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, Arc::clone(&self.core), shutdown_rx, port));
        *running = Some(RunningListener { shutdown_tx, task });

        Ok(port)
    }

    /// Expects the writer lock to be held.
    fn resolve_configuration(
        &self,
        configuration_id: Option<Uuid>,
    ) -> Result<MockServerConfiguration, MockServerError> {
        if let Some(id) = configuration_id {
            if let Some(configuration) = self.store.get(id)? {
                return Ok(configuration);
            }
            warn!("Configuration {} not found, falling back", id);
        }

        if let Some(first) = self.store.list()?.into_iter().next() {
            return Ok(first);
        }

        self.create_configuration_locked(DEFAULT_CONFIGURATION_NAME)
    }

    /// Stop the listener.
    ///
    /// No-op unless running or starting. Waits for the accept loop only (bounded
    /// by the stop timeout); in-flight request handlers finish on their own.
    pub async fn stop(&self) -> Result<(), MockServerError> {
        let mut running = self.listener.lock().await;

        if !matches!(
            self.status(),
            MockServerStatus::Running | MockServerStatus::Starting
        ) {
            return Ok(());
        }

        self.set_status(MockServerStatus::Stopping);

        let result = match running.take() {
            Some(listener) => self.shutdown_listener(listener).await,
            None => Ok(()),
        };
        *self.actual_port.write() = None;

        match result {
            Ok(()) => {
                self.set_status(MockServerStatus::Stopped);
                info!("Mock server stopped");
                Ok(())
            }
            Err(e) => {
                error!("Error stopping mock server: {}", e);
                self.set_status(MockServerStatus::Error);
                Err(e)
            }
        }
    }

    async fn shutdown_listener(&self, listener: RunningListener) -> Result<(), MockServerError> {
        let RunningListener { shutdown_tx, task } = listener;
        let abort = task.abort_handle();
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(self.settings.stop_timeout, task).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(MockServerError::ListenerTask(e.to_string())),
            Err(_) => {
                abort.abort();
                Err(MockServerError::ShutdownTimeout(
                    u64::try_from(self.settings.stop_timeout.as_millis()).unwrap_or(u64::MAX),
                ))
            }
        }
    }

    /// Stop, then start again with the configuration that was active.
    pub async fn restart(&self) -> Result<u16, MockServerError> {
        let configuration_id = self.active_configuration_id();
        if let Err(e) = self.stop().await {
            warn!("Restart continuing after stop failure: {}", e);
        }
        self.start(configuration_id).await
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            let _ = listener.shutdown_tx.send(());
        }
    }
}

/// Accept connections until shutdown is signalled.
///
/// Each connection is served on its own task; the loop never waits for them.
async fn accept_loop(
    listener: TcpListener,
    core: Arc<MockServerCore>,
    mut shutdown_rx: oneshot::Receiver<()>,
    port: u16,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown_rx => {
                info!("Mock listener on port {} shutting down", port);
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        let core = Arc::clone(&core);
                        tokio::spawn(async move {
                            let io = TokioIo::new(stream);
                            let service = service_fn(move |req| {
                                let core = Arc::clone(&core);
                                async move { serve_mock_request(req, core).await }
                            });
                            if let Err(e) = http1::Builder::new()
                                .keep_alive(false)
                                .serve_connection(io, service)
                                .await
                            {
                                debug!("Connection error from {} on port {}: {}", addr, port, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Accept error on port {}: {}", port, e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                }
            }
        }
    }
}
