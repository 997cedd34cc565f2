//! End-to-end failover against local mock nodes.

use std::time::Duration;

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

use steemrpc_core::policy::RetryPolicy;
use steemrpc_core::{RpcCall, RpcOutcome};
use steemrpc_http::{connect, HttpConnectionConfig};

fn fast_config() -> HttpConnectionConfig {
    HttpConnectionConfig {
        request_timeout_ms: 2_000,
        retry: RetryPolicy {
            backoff_factor: 0.0,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn unavailable_node(expected_hits: usize) -> (ServerGuard, mockito::Mock) {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(503)
        .with_body("Service Unavailable")
        .expect(expected_hits)
        .create_async()
        .await;
    (server, mock)
}

#[tokio::test]
async fn fails_over_past_two_unavailable_nodes() {
    // One attempt plus three status retries per bad node.
    let (first, first_mock) = unavailable_node(4).await;
    let (second, second_mock) = unavailable_node(4).await;

    let mut third = Server::new_async().await;
    let good = third
        .mock("POST", "/")
        .match_header("content-type", "application/json")
        .match_header("cache-control", "no-cache")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"jsonrpc": "2.0", "id": 0, "result": {"head_block_number": 42}}).to_string())
        .expect(1)
        .create_async()
        .await;

    let mut client = connect([first.url(), second.url(), third.url()], fast_config()).unwrap();

    let outcome = client
        .call(RpcCall::new("get_dynamic_global_properties").api("database_api"))
        .await;

    assert_eq!(outcome.get("head_block_number"), Some(&json!(42)));
    assert_eq!(client.stats().failovers, 2);
    assert_eq!(client.current_node().to_string(), format!("{}/", third.url()));

    first_mock.assert_async().await;
    second_mock.assert_async().await;
    good.assert_async().await;
}

#[tokio::test]
async fn sends_namespaced_request_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::Json(json!({
            "jsonrpc": "2.0",
            "id": 9,
            "method": "call",
            "params": ["database_api", "get_block", [1000]]
        })))
        .with_status(200)
        .with_body(r#"{"id":9,"result":{"block_id":"000003e8aabbccdd"}}"#)
        .create_async()
        .await;

    let mut client = connect([server.url()], fast_config()).unwrap();
    let outcome = client
        .call(RpcCall::new("get_block").api("database_api").arg(1000).id(9))
        .await;

    assert!(outcome.is_ok());
    mock.assert_async().await;
}

#[tokio::test]
async fn status_outside_forcelist_is_decoded_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(404)
        .with_body("Not Found")
        .expect(1)
        .create_async()
        .await;
    let (backup, backup_mock) = unavailable_node(0).await;

    let mut client = connect([server.url(), backup.url()], fast_config()).unwrap();
    let outcome = client.call(RpcCall::new("get_config")).await;

    assert_eq!(outcome, RpcOutcome::Empty);
    assert_eq!(client.stats().failovers, 0);
    mock.assert_async().await;
    backup_mock.assert_async().await;
}

#[tokio::test]
async fn remote_error_does_not_trigger_failover() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"id":0,"error":{"code":-32003,"message":"Unable to acquire database lock"}}"#)
        .expect(1)
        .create_async()
        .await;

    let mut client = connect([server.url()], fast_config()).unwrap();
    let outcome = client.call(RpcCall::new("get_config")).await;

    assert_eq!(
        outcome.remote_error().map(|e| e.message.as_str()),
        Some("Unable to acquire database lock")
    );
    assert_eq!(outcome.into_value(), None);
    mock.assert_async().await;
}

#[tokio::test]
async fn disabled_failover_returns_empty_after_first_node() {
    let (first, first_mock) = unavailable_node(4).await;
    let (second, second_mock) = unavailable_node(0).await;

    let mut client = connect([first.url(), second.url()], fast_config()).unwrap();
    let outcome = client
        .call(RpcCall::new("get_config").without_failover())
        .await;

    assert_eq!(outcome, RpcOutcome::Empty);
    assert_eq!(client.stats().exhausted, 1);
    first_mock.assert_async().await;
    second_mock.assert_async().await;
}

#[tokio::test]
async fn refused_connection_fails_over() {
    let mut good = Server::new_async().await;
    let mock = good
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"result":"up"}"#)
        .create_async()
        .await;

    // Nothing listens on port 1.
    let mut client = connect(["http://127.0.0.1:1", good.url().as_str()], fast_config()).unwrap();
    let outcome = client.call(RpcCall::new("get_config")).await;

    assert_eq!(outcome, RpcOutcome::Ok(json!("up")));
    assert_eq!(client.stats().failovers, 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn every_node_down_yields_empty() {
    // Two nodes, two failovers: the first node is tried again at the end.
    let (first, first_mock) = unavailable_node(8).await;
    let (second, second_mock) = unavailable_node(4).await;

    let mut client = connect([first.url(), second.url()], fast_config()).unwrap();
    let started = std::time::Instant::now();
    let outcome = client.call(RpcCall::new("get_config")).await;

    assert_eq!(outcome, RpcOutcome::Empty);
    assert_eq!(client.stats().failovers, 2);
    assert!(started.elapsed() < Duration::from_secs(10));
    first_mock.assert_async().await;
    second_mock.assert_async().await;
}
