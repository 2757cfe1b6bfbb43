//! Admin REST API for controlling the mock server.
//!
//! This module provides a JSON API for:
//! - Starting, stopping and restarting the mock listener
//! - Managing configurations and their endpoints
//! - Reading and clearing the request log
//! - Editing substitution variables
//! - Health and metrics endpoints
//!
//! The API listens on a configurable port (default: 2626).

mod handlers;
mod router;
mod server;
mod types;

pub use server::{AdminApiServer, AdminState};
