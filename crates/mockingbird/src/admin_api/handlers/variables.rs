//! Substitution variable handlers.

use crate::admin_api::types::{json_response, no_content, parse_json_body, SetVariableRequest};
use crate::variables::{Variable, VariableStore, GLOBALS_GROUP};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};

/// GET /variables - Active environment and every variable
pub fn handle_list(variables: &VariableStore) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &serde_json::json!({
            "environment": variables.environment(),
            "variables": variables.list(),
        }),
    )
}

/// PUT /variables/:name - Insert or replace a variable
pub async fn handle_set(
    name: &str,
    req: Request<Incoming>,
    variables: &VariableStore,
) -> Response<Full<Bytes>> {
    let body: SetVariableRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let variable = Variable::new(
        name,
        body.value,
        body.group.unwrap_or_else(|| GLOBALS_GROUP.to_string()),
    );
    variables.set(variable.clone());
    json_response(StatusCode::OK, &variable)
}

/// DELETE /variables/:name - Remove the variable from every group
pub fn handle_delete(name: &str, variables: &VariableStore) -> Response<Full<Bytes>> {
    variables.remove(name);
    no_content()
}
