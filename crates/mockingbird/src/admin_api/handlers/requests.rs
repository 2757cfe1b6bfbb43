//! Request log handlers.

use crate::admin_api::types::{json_response, no_content};
use crate::mock::{MockRequestLog, MockServer};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /requests - Logged requests, most recent first
pub fn handle_list(server: &MockServer) -> Response<Full<Bytes>> {
    let logs = server.request_logs();
    let entries: Vec<&MockRequestLog> = logs.iter().map(|entry| entry.as_ref()).collect();
    json_response(StatusCode::OK, &entries)
}

/// DELETE /requests
pub fn handle_clear(server: &MockServer) -> Response<Full<Bytes>> {
    server.clear_request_logs();
    no_content()
}
