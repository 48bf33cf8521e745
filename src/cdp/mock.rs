//! Mock CDP implementations
//!
//! Scriptable stand-ins for the connection, client and browser traits.
//! Tests preload evaluation results and failure injections, then assert
//! on the recorded command log.

use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Mock connection with canned per-method results
#[derive(Debug, Default)]
pub struct MockCdpConnection {
    /// Canned results by method name
    responses: Mutex<HashMap<String, serde_json::Value>>,
    /// Methods that fail when called
    failing: Mutex<HashSet<String>>,
    /// Every command sent, in order
    pub sent: Mutex<Vec<(String, serde_json::Value)>>,
    closed: std::sync::atomic::AtomicBool,
}

impl MockCdpConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn respond_with(&self, method: &str, result: serde_json::Value) {
        let mut responses = self.responses.lock().await;
        responses.insert(method.to_string(), result);
    }

    pub async fn fail_on(&self, method: &str) {
        let mut failing = self.failing.lock().await;
        failing.insert(method.to_string());
    }

    pub async fn sent_methods(&self) -> Vec<String> {
        let sent = self.sent.lock().await;
        sent.iter().map(|(m, _)| m.clone()).collect()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        {
            let mut sent = self.sent.lock().await;
            sent.push((method.to_string(), params));
        }

        {
            let failing = self.failing.lock().await;
            if failing.contains(method) {
                return Err(Error::cdp(format!("{} failed (injected)", method)));
            }
        }

        let responses = self.responses.lock().await;
        let result = responses
            .get(method)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        Ok(CdpResponse {
            id: 0,
            result: Some(result),
            error: None,
        })
    }

    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        !self.closed.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Scriptable mock client
///
/// Evaluation results are matched by substring against the script text,
/// first match wins. Unmatched scripts evaluate to Null.
#[derive(Debug, Default)]
pub struct MockCdpClient {
    /// (script substring, result) pairs consulted in order
    eval_rules: Mutex<Vec<(String, EvaluationResult)>>,
    /// Methods that fail when called
    failing: Mutex<HashSet<String>>,
    /// Navigations fail with this message when set
    navigation_error: Mutex<Option<String>>,
    /// Current page URL, updated by navigate
    url: Mutex<String>,
    /// Registered init scripts
    pub init_scripts: Mutex<Vec<String>>,
    /// Installed cookies
    pub cookies: Mutex<Vec<serde_json::Value>>,
    /// Every evaluated script, in order
    pub evaluated: Mutex<Vec<String>>,
    /// Every raw method call, in order
    pub calls: Mutex<Vec<(String, serde_json::Value)>>,
    /// Event subscribers fed by emit_event
    subscribers: Mutex<Vec<mpsc::Sender<CdpEvent>>>,
}

impl MockCdpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new("about:blank".to_string()),
            ..Default::default()
        })
    }

    /// Scripts containing `pattern` will evaluate to `result`
    pub async fn on_eval(&self, pattern: &str, result: EvaluationResult) {
        let mut rules = self.eval_rules.lock().await;
        rules.push((pattern.to_string(), result));
    }

    pub async fn fail_on(&self, method: &str) {
        let mut failing = self.failing.lock().await;
        failing.insert(method.to_string());
    }

    pub async fn fail_navigation(&self, message: &str) {
        let mut error = self.navigation_error.lock().await;
        *error = Some(message.to_string());
    }

    pub async fn current_url(&self) -> String {
        self.url.lock().await.clone()
    }

    pub async fn set_url(&self, url: &str) {
        let mut current = self.url.lock().await;
        *current = url.to_string();
    }

    /// Push an event to all subscribers
    pub async fn emit_event(&self, method: &str, params: serde_json::Value) {
        let mut subscribers = self.subscribers.lock().await;
        let event = CdpEvent {
            method: method.to_string(),
            params,
            session_id: None,
        };
        subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    pub async fn evaluated_scripts(&self) -> Vec<String> {
        self.evaluated.lock().await.clone()
    }

    async fn check_failure(&self, method: &str) -> Result<(), Error> {
        let failing = self.failing.lock().await;
        if failing.contains(method) {
            return Err(Error::cdp(format!("{} failed (injected)", method)));
        }
        Ok(())
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        MockCdpConnection::new()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        self.check_failure("Page.navigate").await?;

        {
            let error = self.navigation_error.lock().await;
            if let Some(message) = error.as_ref() {
                return Err(Error::navigation_failed(message.clone()));
            }
        }

        self.set_url(url).await;

        Ok(NavigationResult {
            url: url.to_string(),
            error_text: None,
        })
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult, Error> {
        self.check_failure("Runtime.evaluate").await?;

        {
            let mut evaluated = self.evaluated.lock().await;
            evaluated.push(script.to_string());
        }

        let rules = self.eval_rules.lock().await;
        for (pattern, result) in rules.iter() {
            if script.contains(pattern.as_str()) {
                return Ok(result.clone());
            }
        }

        Ok(EvaluationResult::Null)
    }

    async fn add_init_script(&self, source: &str) -> Result<String, Error> {
        self.check_failure("Page.addScriptToEvaluateOnNewDocument").await?;

        let mut scripts = self.init_scripts.lock().await;
        scripts.push(source.to_string());
        Ok(format!("script-{}", scripts.len()))
    }

    async fn dispatch_mouse_event(
        &self,
        kind: &str,
        x: f64,
        y: f64,
        button: Option<&str>,
        click_count: Option<u32>,
    ) -> Result<(), Error> {
        self.check_failure("Input.dispatchMouseEvent").await?;

        let mut calls = self.calls.lock().await;
        calls.push((
            "Input.dispatchMouseEvent".to_string(),
            serde_json::json!({
                "type": kind,
                "x": x,
                "y": y,
                "button": button,
                "clickCount": click_count,
            }),
        ));
        Ok(())
    }

    async fn dispatch_key_event(
        &self,
        kind: &str,
        text: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), Error> {
        self.check_failure("Input.dispatchKeyEvent").await?;

        let mut calls = self.calls.lock().await;
        calls.push((
            "Input.dispatchKeyEvent".to_string(),
            serde_json::json!({ "type": kind, "text": text, "key": key }),
        ));
        Ok(())
    }

    async fn set_cookies(&self, cookies: &[serde_json::Value]) -> Result<(), Error> {
        self.check_failure("Network.setCookies").await?;

        let mut stored = self.cookies.lock().await;
        stored.extend(cookies.iter().cloned());
        Ok(())
    }

    async fn get_cookies(&self) -> Result<Vec<serde_json::Value>, Error> {
        self.check_failure("Network.getCookies").await?;
        Ok(self.cookies.lock().await.clone())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        let mut calls = self.calls.lock().await;
        calls.push((format!("{}.enable", domain), serde_json::json!({})));
        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        self.check_failure(method).await?;

        let mut calls = self.calls.lock().await;
        calls.push((method.to_string(), params));
        Ok(serde_json::json!({}))
    }

    async fn subscribe_events(&self, _event_type: &str) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (tx, rx) = mpsc::channel(100);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(tx);
        Ok(rx)
    }
}

/// Mock browser that hands out [`MockCdpClient`] instances
#[derive(Debug, Default)]
pub struct MockCdpBrowser {
    /// Clients created so far, for post-hoc inspection
    pub clients: Mutex<Vec<Arc<MockCdpClient>>>,
    next_target: std::sync::atomic::AtomicU64,
}

impl MockCdpBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, _target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        let client = MockCdpClient::new();
        let mut clients = self.clients.lock().await;
        clients.push(Arc::clone(&client));
        Ok(client)
    }

    async fn create_target(&self, url: &str) -> Result<String, Error> {
        let id = self
            .next_target
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(format!("ws://mock/devtools/page/{}?{}", id, url))
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "MockChrome/120.0.0.0".to_string(),
            user_agent: "Mozilla/5.0 (MockChrome)".to_string(),
            js_version: "12.0".to_string(),
        })
    }

    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        Ok(Vec::new())
    }

    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }
}
