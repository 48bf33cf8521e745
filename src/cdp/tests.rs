//! CDP layer tests against the mock transport

use super::mock::{MockCdpBrowser, MockCdpClient, MockCdpConnection};
use super::traits::*;
use super::CdpClientImpl;
use std::sync::Arc;

#[tokio::test]
async fn test_client_navigate_settles_on_ready_state() {
    let connection = MockCdpConnection::new();
    connection
        .respond_with(
            "Page.navigate",
            serde_json::json!({ "frame": { "url": "https://example.com/" } }),
        )
        .await;
    connection
        .respond_with(
            "Runtime.evaluate",
            serde_json::json!({ "result": { "type": "string", "value": "complete" } }),
        )
        .await;

    let client = CdpClientImpl::new(connection.clone() as Arc<dyn CdpConnection>);
    let result = client.navigate("https://example.com").await.unwrap();

    assert_eq!(result.url, "https://example.com/");

    let methods = connection.sent_methods().await;
    assert_eq!(methods[0], "Page.navigate");
    assert!(methods.contains(&"Runtime.evaluate".to_string()));
}

#[tokio::test]
async fn test_client_surfaces_navigation_error_text() {
    let connection = MockCdpConnection::new();
    connection
        .respond_with(
            "Page.navigate",
            serde_json::json!({ "errorText": "net::ERR_NAME_NOT_RESOLVED" }),
        )
        .await;

    let client = CdpClientImpl::new(connection as Arc<dyn CdpConnection>);
    let result = client.navigate("https://nxdomain.invalid").await;

    assert!(matches!(result, Err(crate::Error::NavigationFailed(_))));
}

#[tokio::test]
async fn test_client_surfaces_script_exception() {
    let connection = MockCdpConnection::new();
    connection
        .respond_with(
            "Runtime.evaluate",
            serde_json::json!({
                "result": { "type": "object", "subtype": "error" },
                "exceptionDetails": {
                    "exception": { "description": "ReferenceError: nope is not defined" }
                }
            }),
        )
        .await;

    let client = CdpClientImpl::new(connection as Arc<dyn CdpConnection>);
    let result = client.evaluate("nope()", false).await;

    match result {
        Err(crate::Error::ScriptExecutionFailed(message)) => {
            assert!(message.contains("ReferenceError"));
        }
        other => panic!("expected script failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_client_add_init_script_returns_identifier() {
    let connection = MockCdpConnection::new();
    connection
        .respond_with(
            "Page.addScriptToEvaluateOnNewDocument",
            serde_json::json!({ "identifier": "7" }),
        )
        .await;

    let client = CdpClientImpl::new(connection as Arc<dyn CdpConnection>);
    let id = client.add_init_script("window.__x = 1;").await.unwrap();
    assert_eq!(id, "7");
}

#[tokio::test]
async fn test_connection_failure_injection() {
    let connection = MockCdpConnection::new();
    connection.fail_on("Input.dispatchMouseEvent").await;

    let client = CdpClientImpl::new(connection as Arc<dyn CdpConnection>);
    let result = client
        .dispatch_mouse_event("mouseMoved", 10.0, 20.0, None, None)
        .await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_mock_client_eval_rules_match_by_substring() {
    let client = MockCdpClient::new();
    client
        .on_eval("document.title", EvaluationResult::String("Home".to_string()))
        .await;

    let result = client.evaluate("document.title", false).await.unwrap();
    assert_eq!(result.as_str(), Some("Home"));

    let other = client.evaluate("1 + 1", false).await.unwrap();
    assert!(matches!(other, EvaluationResult::Null));
}

#[tokio::test]
async fn test_mock_client_tracks_url_and_cookies() {
    let client = MockCdpClient::new();

    client.navigate("https://example.com/a").await.unwrap();
    assert_eq!(client.current_url().await, "https://example.com/a");

    client
        .set_cookies(&[serde_json::json!({ "name": "sid", "value": "1" })])
        .await
        .unwrap();
    let cookies = client.get_cookies().await.unwrap();
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0]["name"], "sid");
}

#[tokio::test]
async fn test_mock_client_event_subscription() {
    let client = MockCdpClient::new();
    let mut events = client.subscribe_events("*").await.unwrap();

    client
        .emit_event("Page.frameNavigated", serde_json::json!({ "frame": {} }))
        .await;

    let event = events.recv().await.unwrap();
    assert_eq!(event.method, "Page.frameNavigated");
}

#[tokio::test]
async fn test_mock_browser_hands_out_inspectable_clients() {
    let browser = MockCdpBrowser::new();

    let target = browser.create_target("https://example.com").await.unwrap();
    assert!(target.starts_with("ws://mock/"));

    let client = browser.create_client(&target).await.unwrap();
    client.evaluate("1", false).await.unwrap();

    let clients = browser.clients.lock().await;
    assert_eq!(clients.len(), 1);
    assert_eq!(clients[0].evaluated_scripts().await.len(), 1);
}

#[tokio::test]
async fn test_evaluation_result_truthiness() {
    assert!(EvaluationResult::Bool(true).is_truthy());
    assert!(!EvaluationResult::Bool(false).is_truthy());
    assert!(!EvaluationResult::Null.is_truthy());
    assert!(EvaluationResult::String("x".to_string()).is_truthy());
    assert!(!EvaluationResult::String(String::new()).is_truthy());
    assert!(!EvaluationResult::Number(0.0).is_truthy());
}
