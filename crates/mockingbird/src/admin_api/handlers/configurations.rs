//! Configuration and endpoint management handlers.
//!
//! Reads of unknown ids answer 404. Mutations of unknown ids change nothing
//! and answer 204.

use crate::admin_api::types::{
    json_response, no_content, not_found, parse_json_body, server_error,
    CreateConfigurationRequest,
};
use crate::mock::{MockEndpoint, MockServer, MockServerConfiguration, DEFAULT_CONFIGURATION_NAME};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use uuid::Uuid;

/// GET /configurations
pub fn handle_list(server: &MockServer) -> Response<Full<Bytes>> {
    match server.configurations() {
        Ok(configurations) => json_response(StatusCode::OK, &configurations),
        Err(e) => server_error(&e),
    }
}

/// POST /configurations - Create an empty configuration
pub async fn handle_create(req: Request<Incoming>, server: &MockServer) -> Response<Full<Bytes>> {
    let body: CreateConfigurationRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let name = body
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIGURATION_NAME.to_string());

    match server.create_configuration(&name) {
        Ok(configuration) => json_response(StatusCode::CREATED, &configuration),
        Err(e) => server_error(&e),
    }
}

/// GET /configurations/:id
pub fn handle_get(id: Uuid, server: &MockServer) -> Response<Full<Bytes>> {
    match server.configuration(id) {
        Ok(Some(configuration)) => json_response(StatusCode::OK, &configuration),
        Ok(None) => not_found(),
        Err(e) => server_error(&e),
    }
}

/// PUT /configurations/:id - Replace a stored configuration
pub async fn handle_replace(
    id: Uuid,
    req: Request<Incoming>,
    server: &MockServer,
) -> Response<Full<Bytes>> {
    let mut configuration: MockServerConfiguration = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    configuration.id = id;

    match server.configuration(id) {
        Ok(Some(_)) => {}
        Ok(None) => return no_content(),
        Err(e) => return server_error(&e),
    }
    if let Err(e) = server.save_configuration(configuration) {
        return server_error(&e);
    }
    handle_get(id, server)
}

/// DELETE /configurations/:id
pub fn handle_delete(id: Uuid, server: &MockServer) -> Response<Full<Bytes>> {
    match server.delete_configuration(id) {
        Ok(()) => no_content(),
        Err(e) => server_error(&e),
    }
}

/// POST /configurations/:id/activate
pub fn handle_activate(id: Uuid, server: &MockServer) -> Response<Full<Bytes>> {
    match server.set_active_configuration(id) {
        Ok(true) => json_response(
            StatusCode::OK,
            &serde_json::json!({ "activeConfigurationId": id }),
        ),
        Ok(false) => no_content(),
        Err(e) => server_error(&e),
    }
}

/// GET /configurations/:id/endpoints
pub fn handle_list_endpoints(id: Uuid, server: &MockServer) -> Response<Full<Bytes>> {
    match server.configuration(id) {
        Ok(Some(configuration)) => json_response(StatusCode::OK, &configuration.endpoints),
        Ok(None) => not_found(),
        Err(e) => server_error(&e),
    }
}

/// POST /configurations/:id/endpoints - Append an endpoint
pub async fn handle_add_endpoint(
    id: Uuid,
    req: Request<Incoming>,
    server: &MockServer,
) -> Response<Full<Bytes>> {
    let endpoint: MockEndpoint = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    let endpoint_id = endpoint.id;

    if let Err(e) = server.add_endpoint(id, endpoint) {
        return server_error(&e);
    }
    match server.get_endpoint(id, endpoint_id) {
        Ok(Some(endpoint)) => json_response(StatusCode::CREATED, &endpoint),
        Ok(None) => no_content(),
        Err(e) => server_error(&e),
    }
}

/// GET /configurations/:id/endpoints/:endpointId
pub fn handle_get_endpoint(id: Uuid, endpoint_id: Uuid, server: &MockServer) -> Response<Full<Bytes>> {
    match server.get_endpoint(id, endpoint_id) {
        Ok(Some(endpoint)) => json_response(StatusCode::OK, &endpoint),
        Ok(None) => not_found(),
        Err(e) => server_error(&e),
    }
}

/// PUT /configurations/:id/endpoints/:endpointId - Replace an endpoint
pub async fn handle_update_endpoint(
    id: Uuid,
    endpoint_id: Uuid,
    req: Request<Incoming>,
    server: &MockServer,
) -> Response<Full<Bytes>> {
    let mut endpoint: MockEndpoint = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };
    endpoint.id = endpoint_id;

    match server.get_endpoint(id, endpoint_id) {
        Ok(Some(_)) => {}
        Ok(None) => return no_content(),
        Err(e) => return server_error(&e),
    }
    if let Err(e) = server.update_endpoint(id, endpoint) {
        return server_error(&e);
    }
    handle_get_endpoint(id, endpoint_id, server)
}

/// DELETE /configurations/:id/endpoints/:endpointId
pub fn handle_remove_endpoint(
    id: Uuid,
    endpoint_id: Uuid,
    server: &MockServer,
) -> Response<Full<Bytes>> {
    match server.remove_endpoint(id, endpoint_id) {
        Ok(()) => no_content(),
        Err(e) => server_error(&e),
    }
}
