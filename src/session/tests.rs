//! Session layer tests

use super::mock::{MockBrowserSession, MockPageSession};
use super::registry::SessionRegistry;
use super::traits::{BrowserSession, PageOptions, PageSession};
use crate::cdp::MockCdpBrowser;
use crate::session::browser::BrowserSessionImpl;
use std::sync::Arc;

#[tokio::test]
async fn test_registry_register_and_get() {
    let registry = SessionRegistry::new();
    let session = MockBrowserSession::new("crawler-1");

    let id = registry.register(session).await;
    assert_eq!(registry.count().await, 1);

    let found = registry.get(&id).await.unwrap();
    assert_eq!(found.bot_name(), "crawler-1");
}

#[tokio::test]
async fn test_registry_get_unknown_session() {
    let registry = SessionRegistry::new();
    let result = registry.get("nope").await;
    assert!(matches!(result, Err(crate::Error::SessionNotFound(_))));
}

#[tokio::test]
async fn test_registry_find_by_bot() {
    let registry = SessionRegistry::new();
    registry.register(MockBrowserSession::new("alpha")).await;
    registry.register(MockBrowserSession::new("beta")).await;

    let found = registry.find_by_bot("beta").await.unwrap();
    assert_eq!(found.bot_name(), "beta");
    assert!(registry.find_by_bot("gamma").await.is_none());
}

#[tokio::test]
async fn test_registry_terminate_closes_session() {
    let registry = SessionRegistry::new();
    let session = MockBrowserSession::new("crawler-1");
    let handle = Arc::clone(&session);

    let id = registry.register(session).await;
    registry.terminate(&id).await.unwrap();

    assert_eq!(registry.count().await, 0);
    assert!(!handle.is_connected().await);
    assert!(registry.terminate(&id).await.is_err());
}

#[tokio::test]
async fn test_registry_cleanup_drops_disconnected() {
    let registry = SessionRegistry::new();
    let alive = MockBrowserSession::new("alive");
    let dead = MockBrowserSession::new("dead");
    dead.disconnect();

    registry.register(alive).await;
    registry.register(dead).await;

    let removed = registry.cleanup().await;
    assert_eq!(removed, 1);
    assert_eq!(registry.count().await, 1);
    assert!(registry.find_by_bot("alive").await.is_some());
}

#[tokio::test]
async fn test_session_replays_init_scripts_into_new_pages() {
    let browser = MockCdpBrowser::new();
    let session = BrowserSessionImpl::new("crawler-1", Arc::clone(&browser) as Arc<dyn crate::cdp::CdpBrowser>);

    session.add_init_script("window.__a = 1;").await.unwrap();
    session.add_init_script("window.__b = 2;").await.unwrap();
    session
        .set_cookies(vec![serde_json::json!({ "name": "sid", "value": "x" })])
        .await
        .unwrap();

    session.create_page(PageOptions::default()).await.unwrap();

    let clients = browser.clients.lock().await;
    assert_eq!(clients.len(), 1);

    let scripts = clients[0].init_scripts.lock().await;
    assert_eq!(scripts.len(), 2);
    assert!(scripts[0].contains("__a"));

    let cookies = clients[0].cookies.lock().await;
    assert_eq!(cookies.len(), 1);
}

#[tokio::test]
async fn test_session_applies_user_agent_and_viewport() {
    let browser = MockCdpBrowser::new();
    let session = BrowserSessionImpl::new("crawler-1", Arc::clone(&browser) as Arc<dyn crate::cdp::CdpBrowser>);

    let options = PageOptions {
        viewport_width: 1366,
        viewport_height: 768,
        user_agent: Some("Mozilla/5.0 (Test)".to_string()),
        ..Default::default()
    };
    session.create_page(options).await.unwrap();

    let clients = browser.clients.lock().await;
    let calls = clients[0].calls.lock().await;

    let ua_call = calls
        .iter()
        .find(|(m, _)| m == "Network.setUserAgentOverride")
        .expect("user agent override sent");
    assert_eq!(ua_call.1["userAgent"], "Mozilla/5.0 (Test)");

    let metrics = calls
        .iter()
        .find(|(m, _)| m == "Emulation.setDeviceMetricsOverride")
        .expect("device metrics sent");
    assert_eq!(metrics.1["width"], 1366);
}

#[tokio::test]
async fn test_session_close_closes_pages() {
    let browser = MockCdpBrowser::new();
    let session = BrowserSessionImpl::new("crawler-1", browser as Arc<dyn crate::cdp::CdpBrowser>);

    let page = session.create_page(PageOptions::default()).await.unwrap();
    assert!(page.is_active());

    session.close().await.unwrap();
    assert!(!page.is_active());
}

#[tokio::test]
async fn test_mock_page_records_interactions() {
    let page = MockPageSession::new();
    page.add_selector("#search").await;

    page.navigate("https://example.com").await.unwrap();
    page.click("#search").await.unwrap();
    page.type_text("#search", "hello", 0).await.unwrap();
    page.press_key("Enter").await.unwrap();
    page.scroll_by(0.0, 300.0).await.unwrap();

    assert_eq!(page.navigations.lock().await.len(), 1);
    assert_eq!(page.clicks.lock().await.as_slice(), ["#search"]);
    assert_eq!(page.typed.lock().await[0].1, "hello");
    assert_eq!(page.keys.lock().await.as_slice(), ["Enter"]);
    assert_eq!(page.current_url().await.unwrap(), "https://example.com");
}

#[tokio::test]
async fn test_mock_page_missing_selector_errors() {
    let page = MockPageSession::new();
    let result = page.click("#absent").await;
    assert!(matches!(result, Err(crate::Error::ElementNotFound(_))));
}

#[tokio::test]
async fn test_mock_session_serves_seeded_pages_first() {
    let session = MockBrowserSession::new("crawler-1");
    let seeded = MockPageSession::for_session(session.id());
    seeded.add_selector("#ready").await;
    session.seed_page(Arc::clone(&seeded)).await;

    let first = session.create_page(PageOptions::default()).await.unwrap();
    assert!(first.query_exists("#ready").await.unwrap());

    let second = session.create_page(PageOptions::default()).await.unwrap();
    assert!(!second.query_exists("#ready").await.unwrap());
}
