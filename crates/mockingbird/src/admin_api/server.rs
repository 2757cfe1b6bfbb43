//! Admin API server.

use crate::admin_api::router::route_request;
use crate::mock::MockServer;
use crate::variables::VariableStore;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Pause after a failed accept before trying again
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Objects the admin handlers operate on
#[derive(Clone)]
pub struct AdminState {
    pub server: Arc<MockServer>,
    pub variables: Arc<VariableStore>,
}

/// Admin API server for Mockingbird
pub struct AdminApiServer {
    addr: SocketAddr,
    state: AdminState,
}

impl AdminApiServer {
    pub fn new(addr: SocketAddr, server: Arc<MockServer>, variables: Arc<VariableStore>) -> Self {
        Self {
            addr,
            state: AdminState { server, variables },
        }
    }

    /// Bind the configured address and serve until the task is dropped
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("Mockingbird admin API listening on http://{}", self.addr);
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// Accept failures are logged and retried; only dropping the task ends it.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        loop {
            let stream = match listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!("Admin API accept error: {}", e);
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };
            let io = TokioIo::new(stream);
            let state = self.state.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { route_request(req, state).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Admin API connection error: {}", e);
                }
            });
        }
    }
}
