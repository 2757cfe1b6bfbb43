//! Admin API request handlers.

pub mod configurations;
pub mod requests;
pub mod server;
pub mod system;
pub mod variables;
