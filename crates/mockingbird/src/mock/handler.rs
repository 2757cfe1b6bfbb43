//! Request handling for the mock listener.
//!
//! Every request produces exactly one [`MockRequestLog`] entry, whether it was
//! matched, unmatched (404) or failed (500). Failures, including panics, are
//! contained to the request that caused them.

use super::core::MockServerCore;
use super::types::MockRequestLog;
use bytes::Bytes;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::{
    HeaderMap, HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue, CONTENT_LENGTH,
    CONTENT_TYPE, TRANSFER_ENCODING,
};
use hyper::{Request, Response, StatusCode};
use std::collections::HashMap;
use std::convert::Infallible;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::error;

/// Per-request failures, answered with a 500
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Failed to read request body: {0}")]
    Body(#[from] hyper::Error),
    #[error("Invalid configured status code {0}")]
    InvalidStatus(u16),
    #[error("Invalid configured header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),
    #[error("Invalid configured header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),
    #[error("Failed to build response: {0}")]
    Response(#[from] hyper::http::Error),
}

/// Service entry point for the mock listener.
///
/// The request is handled on its own task so that a client hanging up does
/// not cancel it half way; the log entry is written either way.
pub async fn serve_mock_request(
    req: Request<Incoming>,
    core: Arc<MockServerCore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match tokio::spawn(handle_mock_request(req, core)).await {
        Ok(response) => response,
        Err(e) => {
            error!("Mock request task failed: {}", e);
            Ok(internal_error())
        }
    }
}

/// Handle a request to the mock listener
async fn handle_mock_request(
    req: Request<Incoming>,
    core: Arc<MockServerCore>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();

    let mut entry = MockRequestLog::new(
        req.method().to_string(),
        req.uri().path().to_string(),
        req.uri().query().map(|q| format!("?{q}")).unwrap_or_default(),
        header_snapshot(req.headers()),
    );

    let outcome = AssertUnwindSafe(process_request(req, &core, &mut entry))
        .catch_unwind()
        .await;

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!("Error processing mock request {} {}: {}", entry.method, entry.path, e);
            entry.response_status_code = 500;
            internal_error()
        }
        Err(_) => {
            error!("Panic while processing mock request {} {}", entry.method, entry.path);
            entry.response_status_code = 500;
            internal_error()
        }
    };

    entry.processing_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    core.record_request(entry);

    Ok(response)
}

async fn process_request(
    req: Request<Incoming>,
    core: &MockServerCore,
    entry: &mut MockRequestLog,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let bytes = req.into_body().collect().await?.to_bytes();
    if !bytes.is_empty() {
        entry.body = Some(decode_body(&bytes, content_type.as_deref()));
    }

    let Some(endpoint) = core.find_endpoint(&entry.method, &entry.path) else {
        entry.response_status_code = 404;
        return Ok(not_matched(&entry.method, &entry.path)?);
    };

    entry.matched_endpoint_id = Some(endpoint.id);
    let mock = endpoint.response;

    if mock.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(mock.delay_ms)).await;
    }

    entry.response_status_code = mock.status_code;
    let status =
        StatusCode::from_u16(mock.status_code).map_err(|_| HandlerError::InvalidStatus(mock.status_code))?;

    let body = core.substitute(&mock.body);
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    apply_configured_headers(response.headers_mut(), &mock.headers)?;
    Ok(response)
}

/// Copy configured headers onto a response.
///
/// Names differing only in case collapse to one header (last one wins).
/// Framing headers are skipped: hyper derives them from the rendered body.
fn apply_configured_headers(
    target: &mut HeaderMap,
    headers: &HashMap<String, String>,
) -> Result<(), HandlerError> {
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())?;
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        target.insert(name, HeaderValue::from_str(value)?);
    }
    Ok(())
}

/// 404 answer for requests no endpoint accepts
fn not_matched(method: &str, path: &str) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    let body = serde_json::json!({
        "error": "No matching mock endpoint",
        "path": path,
        "method": method,
    });
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
}

fn internal_error() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Flatten request headers; repeated headers are joined with `, `
fn header_snapshot(headers: &HeaderMap) -> HashMap<String, String> {
    let mut snapshot: HashMap<String, String> = HashMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        snapshot
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    snapshot
}

/// Decode a request body using the charset declared in its content type.
///
/// Single-byte Latin-1 and ASCII charsets are mapped byte for byte; everything
/// else is treated as UTF-8 with invalid sequences replaced.
pub(crate) fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    let charset = content_type.and_then(|ct| {
        ct.split(';')
            .skip(1)
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase())
    });

    match charset.as_deref() {
        Some("iso-8859-1" | "latin1" | "latin-1" | "us-ascii" | "ascii") => {
            bytes.iter().map(|&b| char::from(b)).collect()
        }
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body_utf8_default() {
        assert_eq!(decode_body("héllo".as_bytes(), None), "héllo");
        assert_eq!(
            decode_body("héllo".as_bytes(), Some("application/json; charset=utf-8")),
            "héllo"
        );
    }

    #[test]
    fn test_decode_body_latin1() {
        let bytes = [0x63, 0x61, 0x66, 0xE9];
        assert_eq!(decode_body(&bytes, Some("text/plain; charset=ISO-8859-1")), "café");
        assert_eq!(decode_body(&bytes, Some("text/plain; charset=\"latin1\"")), "café");
    }

    #[test]
    fn test_header_snapshot_joins_repeated_values() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", "a".parse().unwrap());
        headers.append("x-tag", "b".parse().unwrap());
        headers.insert("accept", "*/*".parse().unwrap());

        let snapshot = header_snapshot(&headers);
        assert_eq!(snapshot.get("x-tag").map(String::as_str), Some("a, b"));
        assert_eq!(snapshot.get("accept").map(String::as_str), Some("*/*"));
    }

    #[test]
    fn test_configured_framing_headers_are_skipped() {
        let configured = HashMap::from([
            ("Content-Length".to_string(), "4".to_string()),
            ("transfer-encoding".to_string(), "chunked".to_string()),
            ("Content-Type".to_string(), "text/plain".to_string()),
        ]);
        let mut headers = HeaderMap::new();
        apply_configured_headers(&mut headers, &configured).unwrap();

        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert!(headers.get(TRANSFER_ENCODING).is_none());
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "text/plain");
    }

    #[test]
    fn test_case_variant_header_names_collapse() {
        let configured = HashMap::from([
            ("X-Mock".to_string(), "a".to_string()),
            ("x-mock".to_string(), "b".to_string()),
        ]);
        let mut headers = HeaderMap::new();
        apply_configured_headers(&mut headers, &configured).unwrap();
        assert_eq!(headers.get_all("x-mock").iter().count(), 1);
    }

    #[test]
    fn test_invalid_header_name_is_an_error() {
        let configured = HashMap::from([("bad header".to_string(), "v".to_string())]);
        let err = apply_configured_headers(&mut HeaderMap::new(), &configured).unwrap_err();
        assert!(matches!(err, HandlerError::HeaderName(_)));
    }

    #[test]
    fn test_not_matched_payload() {
        let response = not_matched("GET", "/missing").unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }
}
