//! Type definitions for the mock server.
//!
//! This module contains the configuration aggregate, endpoint and response
//! definitions, request log records, runtime status and error types.

use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Preferred port for newly created configurations.
pub const DEFAULT_PORT: u16 = 9090;

// ============================================================================
// Configuration Types
// ============================================================================

/// A named mock server configuration: preferred port plus an ordered endpoint table.
///
/// Persisted and loaded as a whole aggregate; endpoints are never stored on their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockServerConfiguration {
    pub id: Uuid,
    pub name: String,
    /// Preferred port. The bound port may differ when it is occupied.
    pub port: u16,
    #[serde(default = "default_true")]
    pub enable_request_logging: bool,
    #[serde(default)]
    pub endpoints: Vec<MockEndpoint>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl MockServerConfiguration {
    /// Create a configuration with a fresh id and the given name and preferred port.
    pub fn new(name: impl Into<String>, port: u16) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            port,
            enable_request_logging: true,
            endpoints: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn endpoint(&self, endpoint_id: Uuid) -> Option<&MockEndpoint> {
        self.endpoints.iter().find(|e| e.id == endpoint_id)
    }
}

impl Default for MockServerConfiguration {
    fn default() -> Self {
        Self::new("New Mock Server", DEFAULT_PORT)
    }
}

/// A (method, route pattern) to canned response mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockEndpoint {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    /// HTTP method, or `*` for any method
    #[serde(default = "default_method")]
    pub method: String,
    /// Slash-delimited pattern: literal segments, `{param}` segments, optional trailing `*`
    #[serde(default = "default_route_pattern")]
    pub route_pattern: String,
    #[serde(default)]
    pub response: MockResponse,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// Higher wins when several endpoints match
    #[serde(default)]
    pub priority: i32,
    /// Request this endpoint was generated from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_request_id: Option<Uuid>,
}

impl MockEndpoint {
    /// Create an enabled endpoint with the default response.
    pub fn new(method: impl Into<String>, route_pattern: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            route_pattern: route_pattern.into(),
            ..Default::default()
        }
    }

    pub fn with_response(mut self, response: MockResponse) -> Self {
        self.response = response;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }

    /// Short label such as `GET /users/{id}`
    pub fn display_text(&self) -> String {
        format!("{} {}", self.method, self.route_pattern)
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: String::new(),
            method: default_method(),
            route_pattern: default_route_pattern(),
            response: MockResponse::default(),
            is_enabled: true,
            priority: 0,
            source_request_id: None,
        }
    }
}

/// Canned response returned by a matched endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockResponse {
    #[serde(default = "default_status_code")]
    pub status_code: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Body text; may contain `{{name}}` placeholders
    #[serde(default)]
    pub body: String,
    /// Artificial latency applied before the response is written
    #[serde(default)]
    pub delay_ms: u64,
}

impl MockResponse {
    /// A response with the given status and body and no headers.
    pub fn new(status_code: u16, body: impl Into<String>) -> Self {
        Self {
            status_code,
            headers: HashMap::new(),
            body: body.into(),
            delay_ms: 0,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status_code: default_status_code(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: "{}".to_string(),
            delay_ms: 0,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_route_pattern() -> String {
    "/".to_string()
}

fn default_status_code() -> u16 {
    200
}

// ============================================================================
// Request Log Types
// ============================================================================

/// Record of one request received by the mock server. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockRequestLog {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    /// Raw query string including the leading `?`, or empty
    pub query_string: String,
    pub headers: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// `None` when no endpoint matched
    pub matched_endpoint_id: Option<Uuid>,
    pub response_status_code: u16,
    pub processing_time_ms: u64,
}

impl MockRequestLog {
    pub(crate) fn new(
        method: String,
        path: String,
        query_string: String,
        headers: HashMap<String, String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            method,
            path,
            query_string,
            headers,
            body: None,
            matched_endpoint_id: None,
            response_status_code: 0,
            processing_time_ms: 0,
        }
    }

    pub fn was_matched(&self) -> bool {
        self.matched_endpoint_id.is_some()
    }

    pub fn display_text(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

// ============================================================================
// Runtime State
// ============================================================================

/// Lifecycle status of the mock server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MockServerStatus {
    Stopped,
    Starting,
    Running,
    Stopping,
    Error,
}

impl MockServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MockServerStatus::Stopped => "stopped",
            MockServerStatus::Starting => "starting",
            MockServerStatus::Running => "running",
            MockServerStatus::Stopping => "stopping",
            MockServerStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for MockServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Mock server errors
#[derive(Debug, thiserror::Error)]
pub enum MockServerError {
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePorts { start: u16, end: u16 },
    #[error("Failed to bind port {port}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration store failure")]
    Store(#[from] StoreError),
    #[error("Accept loop did not stop within {0} ms")]
    ShutdownTimeout(u64),
    #[error("Accept loop terminated abnormally: {0}")]
    ListenerTask(String),
}
