//! Listener lifecycle handlers.

use crate::admin_api::types::{
    error_response, json_response, query_param, server_error, ServerStateResponse,
    StartFailureResponse, StartResponse,
};
use crate::mock::{MockServer, MockServerError};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use uuid::Uuid;

/// GET /server - Status, bound port and active configuration
pub fn handle_status(server: &MockServer) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &server_state(server))
}

/// POST /server/start[?configuration=ID]
pub async fn handle_start(server: &MockServer, query: Option<&str>) -> Response<Full<Bytes>> {
    let configuration_id = match query_param(query, "configuration") {
        Some(raw) => match raw.parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                return error_response(StatusCode::BAD_REQUEST, "Invalid configuration id")
            }
        },
        None => None,
    };
    start_response(server.start(configuration_id).await)
}

/// POST /server/stop
pub async fn handle_stop(server: &MockServer) -> Response<Full<Bytes>> {
    match server.stop().await {
        Ok(()) => json_response(StatusCode::OK, &server_state(server)),
        Err(e) => server_error(&e),
    }
}

/// POST /server/restart
pub async fn handle_restart(server: &MockServer) -> Response<Full<Bytes>> {
    start_response(server.restart().await)
}

fn start_response(result: Result<u16, MockServerError>) -> Response<Full<Bytes>> {
    match result {
        Ok(port) => json_response(StatusCode::OK, &StartResponse { port }),
        Err(e) => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &StartFailureResponse {
                error: e.to_string(),
                cause: std::error::Error::source(&e).map(ToString::to_string),
            },
        ),
    }
}

fn server_state(server: &MockServer) -> ServerStateResponse {
    ServerStateResponse {
        status: server.status(),
        port: server.actual_port(),
        base_url: server.base_url(),
        active_configuration_id: server.active_configuration_id(),
    }
}
