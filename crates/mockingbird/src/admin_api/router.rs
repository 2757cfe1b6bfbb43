//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{configurations, requests, server, system, variables};
use crate::admin_api::server::AdminState;
use crate::admin_api::types::{error_response, not_found};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use tracing::debug;
use uuid::Uuid;

/// Parsed route for configuration-specific endpoints
#[derive(Debug, PartialEq)]
enum ConfigurationRoute {
    /// GET/PUT/DELETE /configurations/:id
    Root,
    /// POST /configurations/:id/activate
    Activate,
    /// GET/POST /configurations/:id/endpoints
    Endpoints,
    /// GET/PUT/DELETE /configurations/:id/endpoints/:endpointId
    Endpoint(Uuid),
}

impl ConfigurationRoute {
    /// Parse route from path segments after `/configurations/:id`
    fn parse(segments: &[&str]) -> Option<Self> {
        match segments {
            [] | [""] => Some(ConfigurationRoute::Root),
            ["activate"] => Some(ConfigurationRoute::Activate),
            ["endpoints"] => Some(ConfigurationRoute::Endpoints),
            ["endpoints", id] => id.parse().ok().map(ConfigurationRoute::Endpoint),
            _ => None,
        }
    }
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    state: AdminState,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(|s| s.to_string());

    debug!("Admin API: {} {}", method, path);

    let response = route_by_path(&method, &path, query.as_deref(), req, state).await;
    Ok(response)
}

/// Route based on path
async fn route_by_path(
    method: &Method,
    path: &str,
    query: Option<&str>,
    req: Request<Incoming>,
    state: AdminState,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::GET, "/health") => return system::handle_health(),
        (&Method::GET, "/metrics") => return system::handle_metrics(),

        (&Method::GET, "/server") => return server::handle_status(&state.server),
        (&Method::POST, "/server/start") => return server::handle_start(&state.server, query).await,
        (&Method::POST, "/server/stop") => return server::handle_stop(&state.server).await,
        (&Method::POST, "/server/restart") => return server::handle_restart(&state.server).await,

        (&Method::GET, "/requests") => return requests::handle_list(&state.server),
        (&Method::DELETE, "/requests") => return requests::handle_clear(&state.server),

        (&Method::GET, "/configurations") => return configurations::handle_list(&state.server),
        (&Method::POST, "/configurations") => {
            return configurations::handle_create(req, &state.server).await
        }

        (&Method::GET, "/variables") => return variables::handle_list(&state.variables),
        _ => {}
    }

    if let Some(rest) = path.strip_prefix("/configurations/") {
        return route_configuration(method, rest, req, state).await;
    }

    if let Some(name) = path.strip_prefix("/variables/") {
        if name.is_empty() || name.contains('/') {
            return not_found();
        }
        return match *method {
            Method::PUT => variables::handle_set(name, req, &state.variables).await,
            Method::DELETE => variables::handle_delete(name, &state.variables),
            _ => not_found(),
        };
    }

    not_found()
}

/// Route configuration-specific requests
async fn route_configuration(
    method: &Method,
    path: &str,
    req: Request<Incoming>,
    state: AdminState,
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = path.split('/').collect();

    let id: Uuid = match segments[0].parse() {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid configuration id"),
    };

    let route = match ConfigurationRoute::parse(&segments[1..]) {
        Some(r) => r,
        None => return not_found(),
    };

    let server = &state.server;
    match (method, route) {
        // /configurations/:id
        (&Method::GET, ConfigurationRoute::Root) => configurations::handle_get(id, server),
        (&Method::PUT, ConfigurationRoute::Root) => {
            configurations::handle_replace(id, req, server).await
        }
        (&Method::DELETE, ConfigurationRoute::Root) => configurations::handle_delete(id, server),

        // /configurations/:id/activate
        (&Method::POST, ConfigurationRoute::Activate) => configurations::handle_activate(id, server),

        // /configurations/:id/endpoints
        (&Method::GET, ConfigurationRoute::Endpoints) => {
            configurations::handle_list_endpoints(id, server)
        }
        (&Method::POST, ConfigurationRoute::Endpoints) => {
            configurations::handle_add_endpoint(id, req, server).await
        }

        // /configurations/:id/endpoints/:endpointId
        (&Method::GET, ConfigurationRoute::Endpoint(endpoint_id)) => {
            configurations::handle_get_endpoint(id, endpoint_id, server)
        }
        (&Method::PUT, ConfigurationRoute::Endpoint(endpoint_id)) => {
            configurations::handle_update_endpoint(id, endpoint_id, req, server).await
        }
        (&Method::DELETE, ConfigurationRoute::Endpoint(endpoint_id)) => {
            configurations::handle_remove_endpoint(id, endpoint_id, server)
        }

        _ => not_found(),
    }
}
