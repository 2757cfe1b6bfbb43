//! Tests for the mock module.
//!
//! This module covers:
//! - Lifecycle transitions and their events
//! - Port selection and exhaustion
//! - Request handling over real TCP connections
//! - Endpoint table management

use super::*;
use crate::store::InMemoryStore;
use crate::variables::{Variable, VariableStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

fn settings(range_start: u16) -> MockServerSettings {
    MockServerSettings {
        port_range: PortRange::new(range_start, range_start + 4),
        default_port: range_start,
        stop_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

fn server(range_start: u16, variables: Vec<Variable>) -> MockServer {
    MockServer::new(
        settings(range_start),
        Arc::new(InMemoryStore::new()),
        Arc::new(VariableStore::with_variables(variables, None)),
    )
}

fn server_with_endpoints(range_start: u16, endpoints: Vec<MockEndpoint>) -> (MockServer, Uuid) {
    let server = server(range_start, vec![]);
    let mut configuration = server.create_configuration("test").unwrap();
    configuration.endpoints = endpoints;
    server.save_configuration(configuration.clone()).unwrap();
    (server, configuration.id)
}

fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

fn drain_statuses(rx: &mut tokio::sync::broadcast::Receiver<MockServerEvent>) -> Vec<MockServerStatus> {
    let mut statuses = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(MockServerEvent::StatusChanged(status)) => statuses.push(status),
            Ok(_) => {}
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => continue,
        }
    }
    statuses
}

#[tokio::test]
async fn test_start_stop_transitions() {
    let server = server(39500, vec![]);
    let mut rx = server.subscribe();
    assert_eq!(server.status(), MockServerStatus::Stopped);
    assert!(server.base_url().is_none());

    let port = server.start(None).await.unwrap();
    assert_eq!(server.status(), MockServerStatus::Running);
    assert_eq!(server.actual_port(), Some(port));
    assert_eq!(server.base_url(), Some(format!("http://localhost:{port}")));
    assert!(server.settings().port_range.contains(port));

    server.stop().await.unwrap();
    assert_eq!(server.status(), MockServerStatus::Stopped);
    assert!(server.actual_port().is_none());

    assert_eq!(
        drain_statuses(&mut rx),
        vec![
            MockServerStatus::Starting,
            MockServerStatus::Running,
            MockServerStatus::Stopping,
            MockServerStatus::Stopped,
        ]
    );

    // Listener is closed once stop returns
    assert!(TcpListener::bind(("127.0.0.1", port)).await.is_ok());
}

#[tokio::test]
async fn test_start_creates_default_configuration() {
    let server = server(39506, vec![]);
    server.start(None).await.unwrap();

    let configurations = server.configurations().unwrap();
    assert_eq!(configurations.len(), 1);
    assert_eq!(configurations[0].name, DEFAULT_CONFIGURATION_NAME);
    assert_eq!(configurations[0].port, 39506);
    assert_eq!(server.active_configuration_id(), Some(configurations[0].id));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_start_is_idempotent_while_running() {
    let server = server(39512, vec![]);
    let port = server.start(None).await.unwrap();
    let mut rx = server.subscribe();

    assert_eq!(server.start(None).await.unwrap(), port);
    assert_eq!(server.status(), MockServerStatus::Running);
    assert!(drain_statuses(&mut rx).is_empty());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_when_stopped_is_noop() {
    let server = server(39518, vec![]);
    let mut rx = server.subscribe();
    server.stop().await.unwrap();
    assert_eq!(server.status(), MockServerStatus::Stopped);
    assert!(drain_statuses(&mut rx).is_empty());
}

#[tokio::test]
async fn test_restart_keeps_active_configuration() {
    let server = server(39524, vec![]);
    let _first = server.create_configuration("first").unwrap();
    let second = server.create_configuration("second").unwrap();

    server.start(Some(second.id)).await.unwrap();
    assert_eq!(server.active_configuration_id(), Some(second.id));

    server.restart().await.unwrap();
    assert_eq!(server.status(), MockServerStatus::Running);
    assert_eq!(server.active_configuration_id(), Some(second.id));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unknown_configuration_id_falls_back_to_first() {
    let server = server(39530, vec![]);
    let first = server.create_configuration("first").unwrap();

    server.start(Some(Uuid::new_v4())).await.unwrap();
    assert_eq!(server.active_configuration_id(), Some(first.id));
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_exhausted_port_range_reports_error() {
    let server = server(39536, vec![]);
    let mut occupied = Vec::new();
    for port in 39536..=39540 {
        occupied.push(TcpListener::bind(("127.0.0.1", port)).await.unwrap());
    }

    let err = server.start(None).await.unwrap_err();
    assert!(matches!(err, MockServerError::NoAvailablePorts { start: 39536, end: 39540 }));
    assert_eq!(server.status(), MockServerStatus::Error);
    assert!(server.actual_port().is_none());

    // A later start succeeds once a port frees up
    occupied.pop();
    let port = server.start(None).await.unwrap();
    assert_eq!(port, 39540);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_preferred_port_scan_wraps_to_range_start() {
    let server = server(39542, vec![]);
    let mut configuration = server.create_configuration("wrap").unwrap();
    configuration.port = 39545;
    server.save_configuration(configuration.clone()).unwrap();

    let _a = TcpListener::bind(("127.0.0.1", 39545)).await.unwrap();
    let _b = TcpListener::bind(("127.0.0.1", 39546)).await.unwrap();

    let port = server.start(Some(configuration.id)).await.unwrap();
    assert_eq!(port, 39542);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_ping_and_missing() {
    let ping = MockEndpoint::new("GET", "/ping").with_response(MockResponse::new(200, "pong"));
    let ping_id = ping.id;
    let (server, _) = server_with_endpoints(39548, vec![ping]);
    let port = server.start(None).await.unwrap();
    let client = reqwest::Client::new();

    let response = client.get(url(port, "/ping")).send().await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "pong");

    let response = client.get(url(port, "/missing")).send().await.unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No matching mock endpoint");
    assert_eq!(body["path"], "/missing");
    assert_eq!(body["method"], "GET");

    let logs = server.request_logs();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].path, "/missing");
    assert_eq!(logs[0].response_status_code, 404);
    assert!(logs[0].matched_endpoint_id.is_none());
    assert_eq!(logs[1].path, "/ping");
    assert_eq!(logs[1].matched_endpoint_id, Some(ping_id));
    assert_eq!(logs[1].response_status_code, 200);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_request_details_are_logged() {
    let (server, _) = server_with_endpoints(
        39554,
        vec![MockEndpoint::new("POST", "/orders/{id}").with_response(MockResponse::new(201, "{}"))],
    );
    let mut rx = server.subscribe();
    let port = server.start(None).await.unwrap();

    let response = reqwest::Client::new()
        .post(url(port, "/orders/7?expand=items"))
        .header("x-trace", "abc")
        .body("{\"qty\":2}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let logs = server.request_logs();
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry.method, "POST");
    assert_eq!(entry.path, "/orders/7");
    assert_eq!(entry.query_string, "?expand=items");
    assert_eq!(entry.headers.get("x-trace").map(String::as_str), Some("abc"));
    assert_eq!(entry.body.as_deref(), Some("{\"qty\":2}"));
    assert!(entry.was_matched());

    let mut received = 0;
    while let Ok(event) = rx.try_recv() {
        if let MockServerEvent::RequestReceived(logged) = event {
            assert_eq!(logged.id, entry.id);
            received += 1;
        }
    }
    assert_eq!(received, 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_response_headers_and_substitution() {
    let endpoint = MockEndpoint::new("*", "/greet").with_response(
        MockResponse::new(200, "Hello {{user}}, {{unknown}} {{$uuid}}")
            .with_header("content-type", "text/plain")
            .with_header("X-Mock", "yes"),
    );
    let server = server(39560, vec![Variable::global("user", "Ada")]);
    let configuration = server.create_configuration("vars").unwrap();
    server.add_endpoint(configuration.id, endpoint).unwrap();
    let port = server.start(Some(configuration.id)).await.unwrap();

    let response = reqwest::Client::new()
        .delete(url(port, "/greet"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["content-type"], "text/plain");
    assert_eq!(response.headers()["x-mock"], "yes");
    assert_eq!(
        response.text().await.unwrap(),
        "Hello Ada, {{unknown}} {{$uuid}}"
    );

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_configured_header_yields_500() {
    let endpoint = MockEndpoint::new("GET", "/broken")
        .with_response(MockResponse::new(200, "x").with_header("bad header", "v"));
    let endpoint_id = endpoint.id;
    let (server, _) = server_with_endpoints(39566, vec![endpoint]);
    let port = server.start(None).await.unwrap();

    let response = reqwest::get(url(port, "/broken")).await.unwrap();
    assert_eq!(response.status(), 500);

    let logs = server.request_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].response_status_code, 500);
    assert_eq!(logs[0].matched_endpoint_id, Some(endpoint_id));

    // The listener keeps serving
    let response = reqwest::get(url(port, "/other")).await.unwrap();
    assert_eq!(response.status(), 404);
    assert_eq!(server.request_logs().len(), 2);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_delay_does_not_block_other_requests() {
    let (server, _) = server_with_endpoints(
        39572,
        vec![
            MockEndpoint::new("GET", "/slow")
                .with_response(MockResponse::new(200, "slow").with_delay_ms(1500)),
            MockEndpoint::new("GET", "/fast").with_response(MockResponse::new(200, "fast")),
        ],
    );
    let port = server.start(None).await.unwrap();

    let slow = tokio::spawn(reqwest::get(url(port, "/slow")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let fast = reqwest::get(url(port, "/fast")).await.unwrap();
    assert_eq!(fast.text().await.unwrap(), "fast");
    assert!(started.elapsed() < Duration::from_millis(1000));

    let slow = slow.await.unwrap().unwrap();
    assert_eq!(slow.text().await.unwrap(), "slow");
    let logs = server.request_logs();
    assert_eq!(logs[0].path, "/slow");
    assert!(logs[0].processing_time_ms >= 1500);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_does_not_wait_for_in_flight_handlers() {
    let (server, _) = server_with_endpoints(
        39578,
        vec![MockEndpoint::new("GET", "/slow")
            .with_response(MockResponse::new(200, "late").with_delay_ms(1500))],
    );
    let port = server.start(None).await.unwrap();

    let slow = tokio::spawn(reqwest::get(url(port, "/slow")));
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    server.stop().await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(server.status(), MockServerStatus::Stopped);

    let response = slow.await.unwrap().unwrap();
    assert_eq!(response.text().await.unwrap(), "late");
    assert_eq!(server.request_logs().len(), 1);
}

#[tokio::test]
async fn test_saving_active_configuration_applies_live() {
    let (server, configuration_id) = server_with_endpoints(39584, vec![]);
    let port = server.start(Some(configuration_id)).await.unwrap();

    assert_eq!(reqwest::get(url(port, "/late")).await.unwrap().status(), 404);

    server
        .add_endpoint(
            configuration_id,
            MockEndpoint::new("GET", "/late").with_response(MockResponse::new(202, "added")),
        )
        .unwrap();

    let response = reqwest::get(url(port, "/late")).await.unwrap();
    assert_eq!(response.status(), 202);
    assert_eq!(server.actual_port(), Some(port));

    server.stop().await.unwrap();
}

#[test]
fn test_endpoint_management() {
    let server = server(39590, vec![]);
    let configuration = server.create_configuration("table").unwrap();
    let mut rx = server.subscribe();

    let endpoint = MockEndpoint::new("GET", "/items").with_name("list items");
    let endpoint_id = endpoint.id;
    server.add_endpoint(configuration.id, endpoint.clone()).unwrap();
    assert_eq!(
        server.get_endpoint(configuration.id, endpoint_id).unwrap(),
        Some(endpoint.clone())
    );

    let updated = MockEndpoint {
        priority: 7,
        ..endpoint.clone()
    };
    server.update_endpoint(configuration.id, updated).unwrap();
    let stored = server.get_endpoint(configuration.id, endpoint_id).unwrap().unwrap();
    assert_eq!(stored.priority, 7);
    assert_eq!(stored.display_text(), "GET /items");

    // Unknown endpoint id: nothing changes
    server
        .update_endpoint(configuration.id, MockEndpoint::new("GET", "/ghost"))
        .unwrap();
    assert_eq!(server.configuration(configuration.id).unwrap().unwrap().endpoint_count(), 1);

    server.remove_endpoint(configuration.id, endpoint_id).unwrap();
    assert!(server.get_endpoint(configuration.id, endpoint_id).unwrap().is_none());

    let mut changed = 0;
    while let Ok(event) = rx.try_recv() {
        if let MockServerEvent::ConfigurationChanged(c) = event {
            assert_eq!(c.id, configuration.id);
            changed += 1;
        }
    }
    assert_eq!(changed, 3);
}

#[test]
fn test_unknown_configuration_mutations_are_noops() {
    let server = server(39596, vec![]);
    let missing = Uuid::new_v4();

    server.add_endpoint(missing, MockEndpoint::default()).unwrap();
    server.update_endpoint(missing, MockEndpoint::default()).unwrap();
    server.remove_endpoint(missing, Uuid::new_v4()).unwrap();
    assert!(server.get_endpoint(missing, Uuid::new_v4()).unwrap().is_none());
    assert!(!server.set_active_configuration(missing).unwrap());
    assert!(server.configurations().unwrap().is_empty());
}

#[test]
fn test_delete_active_configuration_falls_back() {
    let server = server(39602, vec![]);
    let first = server.create_configuration("first").unwrap();
    let second = server.create_configuration("second").unwrap();

    assert!(server.set_active_configuration(second.id).unwrap());
    server.delete_configuration(second.id).unwrap();
    assert_eq!(server.active_configuration_id(), Some(first.id));

    server.delete_configuration(first.id).unwrap();
    assert!(server.active_configuration_id().is_none());
}

#[test]
fn test_save_stamps_modified_at() {
    let server = server(39608, vec![]);
    let configuration = server.create_configuration("stamp").unwrap();
    let before = configuration.modified_at;
    std::thread::sleep(Duration::from_millis(5));

    server.save_configuration(configuration.clone()).unwrap();
    let stored = server.configuration(configuration.id).unwrap().unwrap();
    assert!(stored.modified_at > before);
    assert_eq!(stored.created_at, configuration.created_at);
}

#[tokio::test]
async fn test_client_disconnect_during_delay_still_logs() {
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpStream;

    let (server, _) = server_with_endpoints(
        39614,
        vec![MockEndpoint::new("GET", "/slow")
            .with_response(MockResponse::new(200, "late").with_delay_ms(500))],
    );
    let port = server.start(None).await.unwrap();

    let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
    stream
        .write_all(b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(stream);

    tokio::time::sleep(Duration::from_millis(1200)).await;
    let logs = server.request_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/slow");
    assert_eq!(logs[0].response_status_code, 200);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn test_configured_content_length_is_ignored() {
    let (server, _) = server_with_endpoints(
        39620,
        vec![MockEndpoint::new("GET", "/ping").with_response(
            MockResponse::new(200, "pong-pong")
                .with_header("Content-Length", "4")
                .with_header("X-Mock", "a"),
        )],
    );
    let port = server.start(None).await.unwrap();

    let response = reqwest::get(url(port, "/ping")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-mock"], "a");
    assert_eq!(response.text().await.unwrap(), "pong-pong");
    assert_eq!(server.request_logs()[0].response_status_code, 200);

    server.stop().await.unwrap();
}

#[test]
fn test_concurrent_endpoint_adds_are_not_lost() {
    let (server, configuration_id) = server_with_endpoints(39626, vec![]);
    assert!(server.set_active_configuration(configuration_id).unwrap());
    let server = Arc::new(server);

    let handles: Vec<_> = (0..16)
        .map(|t| {
            let server = server.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    let endpoint = MockEndpoint::new("GET", format!("/t{t}/e{i}"));
                    server.add_endpoint(configuration_id, endpoint).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stored = server.configuration(configuration_id).unwrap().unwrap();
    assert_eq!(stored.endpoints.len(), 400);
    let active = server.active_configuration().unwrap();
    assert_eq!(active.endpoints.len(), 400);
}
