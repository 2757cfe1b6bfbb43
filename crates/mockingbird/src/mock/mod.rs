//! Embedded mock HTTP server.
//!
//! This module provides:
//! - `MockServer`: listener lifecycle, configuration and endpoint management
//! - `route`: pattern matching and best-endpoint resolution
//! - `RequestLog`: bounded most-recent-first log of handled requests
//! - `MockServerEvent`: notifications for status, requests and configuration changes
//!
//! ## Module Structure
//!
//! - `types`: data model and error types
//! - `route`: route matcher
//! - `request_log`: ring buffer
//! - `events`: broadcast notifications
//! - `port`: port range scanning
//! - `core`: state shared with request handlers
//! - `handler`: per-request pipeline
//! - `server`: lifecycle state machine
//! - `configurations`: endpoint table operations

mod configurations;
mod core;
mod events;
mod handler;
mod port;
mod request_log;
pub mod route;
mod server;
mod types;

#[cfg(test)]
mod tests;

pub use events::{MockServerEvent, EVENT_CHANNEL_CAPACITY};
pub use port::{bind_available_port, PortRange};
pub use request_log::{RequestLog, DEFAULT_LOG_CAPACITY};
pub use server::{MockServer, MockServerSettings, DEFAULT_CONFIGURATION_NAME};
pub use types::{
    MockEndpoint, MockRequestLog, MockResponse, MockServerConfiguration, MockServerError,
    MockServerStatus, DEFAULT_PORT,
};
