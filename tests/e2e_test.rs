//! End-to-end integration tests
//!
//! These tests wire the launcher, session registry, task manager and
//! mock sessions through complete launch-to-termination workflows.

mod common;

use serde_json::{json, Map};
use std::sync::Arc;
use std::time::Duration;

use botweaver::bot::{BotIdentity, BrowserEngine};
use botweaver::cdp::EvaluationResult;
use botweaver::launch::CookieStore;
use botweaver::session::{BrowserSession, MockPageSession};
use botweaver::stealth::SimulatorState;
use botweaver::tasks::{TaskManager, TaskRegistry, TaskSpec, TaskStatus};

use common::{test_config, test_launcher};
use botweaver::session::MockBrowserSession;

fn search_spec(query: &str) -> TaskSpec {
    let mut parameters = Map::new();
    parameters.insert("searchQuery".to_string(), json!(query));
    TaskSpec::new("GoogleSearch", parameters)
}

fn scraping_spec(url: &str) -> TaskSpec {
    let mut parameters = Map::new();
    parameters.insert("url".to_string(), json!(url));
    TaskSpec::new("WebScraping", parameters)
}

fn config_with_dir(cookie_dir: &str) -> botweaver::config::Config {
    botweaver::config::Config {
        cookie_dir: cookie_dir.to_string(),
        ..Default::default()
    }
}

/// Test 1: full launch -> submit -> execute -> terminate flow.
///
/// Both tasks are queued before the session attaches, so the
/// higher-priority search must run before the scrape.
#[tokio::test]
async fn test_launch_execute_terminate_flow() {
    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    page.add_selector(r#"input[name="q"]"#).await;
    page.add_selector("#search").await;
    page.mock_cdp()
        .on_eval(
            "window.location.href",
            EvaluationResult::Object(json!({
                "url": "https://www.google.com/search?q=rust",
                "title": "rust - Google Search",
                "content": "results"
            })),
        )
        .await;
    session.seed_page(Arc::clone(&page)).await;

    let launcher = test_launcher(Arc::clone(&session), test_config());

    let manager = Arc::new(TaskManager::with_limits(TaskRegistry::with_builtins(), 1, 3, 1));
    let search = manager.submit(search_spec("rust"), 5).await.unwrap();
    let scrape = manager
        .submit(scraping_spec("https://news.example.org"), 1)
        .await
        .unwrap();

    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    let launched = launcher.launch_into(&bot, None, &manager).await.unwrap();

    let search_result = search.wait().await.unwrap();
    assert_eq!(search_result["status"], "completed");
    assert_eq!(
        search_result["data"]["title"],
        "rust - Google Search"
    );
    scrape.wait().await.unwrap();

    // Priority decided the execution order.
    let navigations = page.navigations.lock().await;
    assert_eq!(navigations[0], "https://www.google.com");
    assert_eq!(navigations.last().unwrap(), "https://news.example.org");
    drop(navigations);

    // Search input was actually used.
    assert_eq!(
        page.typed.lock().await.as_slice(),
        [(r#"input[name="q"]"#.to_string(), "rust".to_string())]
    );

    launcher.terminate(&launched).await.unwrap();
    assert_eq!(launcher.registry().count().await, 0);
    assert!(!session.is_connected().await);
}

/// Test 2: cookies survive a terminate and reach the next launch.
#[tokio::test]
async fn test_state_persists_across_launches() {
    let cookie_dir = test_config().cookie_dir;

    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    {
        let cdp = page.mock_cdp();
        let mut cookies = cdp.cookies.lock().await;
        cookies.push(json!({ "name": "sid", "value": "abc", "domain": ".example.org" }));
    }
    session.seed_page(page).await;

    let launcher = test_launcher(Arc::clone(&session), config_with_dir(&cookie_dir));
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    let launched = launcher.launch(&bot, None).await.unwrap();
    launcher.terminate(&launched).await.unwrap();

    let saved = CookieStore::new(&cookie_dir).load("crawler-1").await.unwrap();
    assert_eq!(saved.len(), 1);

    // A fresh session for the same bot gets them back.
    let session = MockBrowserSession::new("crawler-1");
    let launcher = test_launcher(Arc::clone(&session), config_with_dir(&cookie_dir));
    launcher.launch(&bot, None).await.unwrap();

    let restored = session.cookies.lock().await;
    assert_eq!(restored[0]["value"], "abc");
}

/// Test 3: a page that never settles fails the task after its retries.
#[tokio::test]
async fn test_unstable_page_fails_task() {
    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    page.fail_network_idle();
    session.seed_page(page).await;

    let launcher = test_launcher(Arc::clone(&session), test_config());
    let manager = Arc::new(TaskManager::with_limits(TaskRegistry::with_builtins(), 1, 2, 1));

    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    launcher.launch_into(&bot, None, &manager).await.unwrap();

    let ticket = manager
        .submit(scraping_spec("https://news.example.org"), 1)
        .await
        .unwrap();
    let id = ticket.id.clone();

    assert!(ticket.wait().await.is_err());
    assert_eq!(manager.status(&id).await, Some(TaskStatus::Failed));
}

/// Test 4: duration-bounded enhanced bots shut themselves down.
#[tokio::test]
async fn test_duration_bounded_session_lifecycle() {
    let session = MockBrowserSession::new("crawler-1");
    let launcher = test_launcher(Arc::clone(&session), test_config());

    let mut bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    bot.category = "enhanced".to_string();

    let launched = launcher
        .launch(&bot, Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(launched.simulator.state(), SimulatorState::Running);
    assert_eq!(launcher.registry().count().await, 1);

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(launcher.registry().count().await, 0);
    assert_eq!(launched.simulator.state(), SimulatorState::Stopped);
    assert!(!session.is_connected().await);
}
