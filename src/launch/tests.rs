//! Launch orchestration tests

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::cache::CacheStore;
use super::cookies::CookieStore;
use super::presets::{preset_for, DEFAULT_PRESET};
use super::{BrowserProvider, Launcher};
use crate::bot::{BotIdentity, BrowserEngine};
use crate::cdp::EvaluationResult;
use crate::config::Config;
use crate::session::{BrowserSession, MockBrowserSession, MockPageSession, SessionRegistry};
use crate::stealth::SimulatorState;
use crate::tasks::{TaskManager, TaskRegistry, TaskSpec};
use crate::Result;

struct MockProvider {
    session: Arc<MockBrowserSession>,
}

#[async_trait]
impl BrowserProvider for MockProvider {
    async fn connect(&self, _bot: &BotIdentity) -> Result<Arc<dyn BrowserSession>> {
        Ok(Arc::clone(&self.session) as Arc<dyn BrowserSession>)
    }
}

fn temp_cookie_dir() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("botweaver-test-{}", Uuid::new_v4()))
}

fn launcher_with(session: Arc<MockBrowserSession>, config: Config) -> Arc<Launcher> {
    Arc::new(Launcher::new(
        config,
        Arc::new(MockProvider { session }),
        SessionRegistry::new(),
    ))
}

fn test_config() -> Config {
    Config {
        cookie_dir: temp_cookie_dir().to_string_lossy().to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_launch_installs_fingerprint_scripts() {
    let session = MockBrowserSession::new("crawler-1");
    let launcher = launcher_with(Arc::clone(&session), test_config());
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    let launched = launcher.launch(&bot, None).await.unwrap();

    let scripts = session.init_scripts.lock().await;
    assert_eq!(scripts.len(), 6);
    assert!(scripts[0].contains("webdriver"));
    assert!(!launched.fingerprint.user_agent.is_empty());
    assert_eq!(launcher.registry().count().await, 1);
}

#[tokio::test]
async fn test_launch_without_stealth_skips_scripts() {
    let session = MockBrowserSession::new("crawler-1");
    let config = Config {
        stealth_enabled: false,
        ..test_config()
    };
    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    launcher.launch(&bot, None).await.unwrap();
    assert!(session.init_scripts.lock().await.is_empty());
}

#[tokio::test]
async fn test_user_agent_rotates_without_stealth() {
    use crate::stealth::fingerprint::WINDOWS_USER_AGENTS;

    let session = MockBrowserSession::new("crawler-1");
    let config = Config {
        stealth_enabled: false,
        ..test_config()
    };
    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    launcher.launch(&bot, None).await.unwrap();
    launcher.launch(&bot, None).await.unwrap();

    let options = session.page_options.lock().await;
    assert_eq!(options[0].user_agent.as_deref(), Some(WINDOWS_USER_AGENTS[0]));
    assert_eq!(options[1].user_agent.as_deref(), Some(WINDOWS_USER_AGENTS[1]));
}

#[tokio::test]
async fn test_launch_restores_stored_cookies() {
    let config = test_config();
    let store = CookieStore::new(&config.cookie_dir);
    store
        .save("crawler-1", &[json!({ "name": "sid", "value": "abc" })])
        .await
        .unwrap();

    let session = MockBrowserSession::new("crawler-1");
    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    launcher.launch(&bot, None).await.unwrap();

    let cookies = session.cookies.lock().await;
    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0]["name"], "sid");
}

#[tokio::test]
async fn test_simulator_starts_only_for_enhanced_bots() {
    let session = MockBrowserSession::new("crawler-1");
    let launcher = launcher_with(Arc::clone(&session), test_config());

    let plain = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    let launched = launcher.launch(&plain, None).await.unwrap();
    assert_eq!(launched.simulator.state(), SimulatorState::Idle);
    launcher.terminate(&launched).await.unwrap();

    let mut enhanced = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    enhanced.category = "enhanced".to_string();
    let launched = launcher.launch(&enhanced, None).await.unwrap();
    assert_eq!(launched.simulator.state(), SimulatorState::Running);
    launched.simulator.stop().await;
}

#[tokio::test]
async fn test_duration_bound_terminates_session() {
    let session = MockBrowserSession::new("crawler-1");
    let launcher = launcher_with(Arc::clone(&session), test_config());
    let mut bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    bot.category = "enhanced".to_string();

    let launched = launcher
        .launch(&bot, Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert_eq!(launcher.registry().count().await, 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(launcher.registry().count().await, 0);
    assert_eq!(launched.simulator.state(), SimulatorState::Stopped);
    assert!(!session.is_connected().await);
}

#[tokio::test]
async fn test_terminate_persists_cookies() {
    let config = test_config();
    let cookie_dir = config.cookie_dir.clone();

    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    {
        let cdp = page.mock_cdp();
        let mut cookies = cdp.cookies.lock().await;
        cookies.push(json!({ "name": "sid", "value": "xyz" }));
    }
    session.seed_page(page).await;

    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    let launched = launcher.launch(&bot, None).await.unwrap();
    launcher.terminate(&launched).await.unwrap();

    let store = CookieStore::new(&cookie_dir);
    let saved = store.load("crawler-1").await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["value"], "xyz");
}

#[tokio::test]
async fn test_launch_replays_stored_cache() {
    let config = test_config();
    let store = CacheStore::new(&config.cookie_dir);
    store
        .save(
            "crawler-1",
            &json!({ "assets": [{ "url": "https://cdn.example.org/app.js", "data": "x", "options": {} }] }),
        )
        .await
        .unwrap();

    let session = MockBrowserSession::new("crawler-1");
    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    launcher.launch(&bot, None).await.unwrap();

    let scripts = session.init_scripts.lock().await;
    let restore = scripts.last().unwrap();
    assert!(restore.contains("caches.open"));
    assert!(restore.contains("https://cdn.example.org/app.js"));
}

#[tokio::test]
async fn test_terminate_persists_cache_snapshot() {
    let config = test_config();
    let cookie_dir = config.cookie_dir.clone();

    let snapshot = json!({
        "assets": [{
            "url": "https://cdn.example.org/app.js",
            "data": "console.log(1)",
            "options": { "status": 200, "statusText": "OK", "headers": {} }
        }]
    });

    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    page.mock_cdp()
        .on_eval("caches.keys", EvaluationResult::Object(snapshot.clone()))
        .await;
    session.seed_page(page).await;

    let launcher = launcher_with(Arc::clone(&session), config);
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    let launched = launcher.launch(&bot, None).await.unwrap();
    launcher.terminate(&launched).await.unwrap();

    let store = CacheStore::new(&cookie_dir);
    assert_eq!(store.load("crawler-1").await.unwrap(), snapshot);
}

#[tokio::test]
async fn test_cache_store_round_trip() {
    let store = CacheStore::new(temp_cookie_dir());

    let empty = store.load("ghost").await.unwrap();
    assert!(empty.as_object().unwrap().is_empty());
    store.delete("ghost").await.unwrap();

    let snapshot = json!({ "pages": [{ "url": "https://a.example/", "data": "", "options": {} }] });
    store.save("alpha", &snapshot).await.unwrap();
    assert_eq!(store.load("alpha").await.unwrap(), snapshot);

    store.delete("alpha").await.unwrap();
    assert!(store.load("alpha").await.unwrap().as_object().unwrap().is_empty());
}

#[tokio::test]
async fn test_launch_into_binds_task_manager() {
    let session = MockBrowserSession::new("crawler-1");
    let page = MockPageSession::for_session(session.id());
    page.mock_cdp()
        .on_eval(
            "window.location.href",
            EvaluationResult::Object(json!({
                "url": "https://news.example.org/",
                "title": "News",
                "content": "headline"
            })),
        )
        .await;
    session.seed_page(Arc::clone(&page)).await;

    let launcher = launcher_with(Arc::clone(&session), test_config());
    let manager = Arc::new(TaskManager::with_limits(TaskRegistry::with_builtins(), 5, 3, 1));
    let bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);

    launcher.launch_into(&bot, None, &manager).await.unwrap();

    let mut parameters = serde_json::Map::new();
    parameters.insert("url".to_string(), json!("https://news.example.org"));
    let ticket = manager
        .submit(TaskSpec::new("WebScraping", parameters), 1)
        .await
        .unwrap();

    let result = ticket.wait().await.unwrap();
    assert_eq!(result["status"], "completed");
    assert_eq!(page.navigations.lock().await.as_slice(), ["https://news.example.org"]);
}

#[test]
fn test_launch_args_include_enabled_proxy() {
    use crate::bot::ProxyUpstream;
    use crate::launch::{launch_args, STEALTH_ARGS};

    let mut bot = BotIdentity::new("crawler-1", BrowserEngine::Chromium);
    assert_eq!(launch_args(&bot).len(), STEALTH_ARGS.len());

    bot.proxy = Some(ProxyUpstream::new("10.0.0.1", 8080));
    let args = launch_args(&bot);
    assert!(args.contains(&"--proxy-server=http://10.0.0.1:8080".to_string()));

    if let Some(proxy) = bot.proxy.as_mut() {
        proxy.enabled = false;
    }
    assert_eq!(launch_args(&bot).len(), STEALTH_ARGS.len());
}

#[test]
fn test_preset_lookup() {
    let pixel = preset_for("Pixel 8");
    assert!(pixel.mobile);
    assert_eq!(pixel.width, 412);

    assert_eq!(preset_for("Unknown Device"), DEFAULT_PRESET);
}

#[tokio::test]
async fn test_cookie_store_round_trip() {
    let store = CookieStore::new(temp_cookie_dir());

    assert!(store.load("ghost").await.unwrap().is_empty());
    store.delete("ghost").await.unwrap();

    store
        .save("alpha", &[json!({ "name": "a" }), json!({ "name": "b" })])
        .await
        .unwrap();
    store.save("beta", &[json!({ "name": "c" })]).await.unwrap();

    assert_eq!(store.load("alpha").await.unwrap().len(), 2);
    assert_eq!(store.list_bots().await.unwrap(), ["alpha", "beta"]);

    store.delete("alpha").await.unwrap();
    assert!(store.load("alpha").await.unwrap().is_empty());
}
