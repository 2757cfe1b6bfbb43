//! Mockingbird: an embedded mock HTTP server.
//!
//! A [`mock::MockServer`] binds a local port from a fixed range and answers
//! requests from the endpoint table of its active configuration, recording
//! each request in a bounded log. Configurations are persisted through a
//! [`store::ConfigurationStore`]; response bodies are rendered through a
//! [`variables::VariableSubstitutor`].

pub mod admin_api;
pub mod config;
pub mod metrics;
pub mod mock;
pub mod store;
pub mod variables;
