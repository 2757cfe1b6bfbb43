//! Request and response bodies for the Admin API.

use crate::mock::{MockServerError, MockServerStatus};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// GET /server
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStateResponse {
    pub status: MockServerStatus,
    pub port: Option<u16>,
    pub base_url: Option<String>,
    pub active_configuration_id: Option<Uuid>,
}

/// Successful start or restart
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub port: u16,
}

/// Failed start or restart
#[derive(Debug, Serialize)]
pub struct StartFailureResponse {
    pub error: String,
    pub cause: Option<String>,
}

/// POST /configurations
#[derive(Debug, Deserialize)]
pub struct CreateConfigurationRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// PUT /variables/:name
#[derive(Debug, Deserialize)]
pub struct SetVariableRequest {
    pub value: String,
    #[serde(default)]
    pub group: Option<String>,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

/// Individual error detail
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

// =============================================================================
// Response helper functions
// =============================================================================

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    build_response_with_headers(status, [("Content-Type", "application/json")], json)
}

/// Build an HTTP response with the given status and body.
///
/// Falls back to a bare 500 if the builder rejects its input.
pub fn build_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Build an HTTP response with headers.
pub fn build_response_with_headers(
    status: StatusCode,
    headers: impl IntoIterator<Item = (impl AsRef<str>, impl AsRef<str>)>,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(status);
    for (key, value) in headers {
        builder = builder.header(key.as_ref(), value.as_ref());
    }
    builder
        .body(Full::new(body.into()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Create an error response
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

/// Map a server error to a 500
pub fn server_error(error: &MockServerError) -> Response<Full<Bytes>> {
    error_response(StatusCode::INTERNAL_SERVER_ERROR, &error.to_string())
}

/// Create a not found response
pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

/// Empty 204, also returned by mutations that target unknown ids
pub fn no_content() -> Response<Full<Bytes>> {
    build_response(StatusCode::NO_CONTENT, Bytes::new())
}

/// Collect request body into bytes
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}

/// Read and deserialize a JSON request body, answering 400 on failure
pub async fn parse_json_body<T: serde::de::DeserializeOwned>(
    req: Request<Incoming>,
) -> Result<T, Response<Full<Bytes>>> {
    let body = collect_body(req)
        .await
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e))?;
    serde_json::from_slice(&body)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &format!("Invalid JSON: {e}")))
}

/// Look up a single query parameter value
pub fn query_param<'a>(query: Option<&'a str>, name: &str) -> Option<&'a str> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
