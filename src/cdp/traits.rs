//! CDP layer traits
//!
//! Abstract interfaces over the DevTools transport so the session and
//! stealth layers can run against mocks in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A browser event delivered to subscribers
#[derive(Debug, Clone)]
pub struct CdpEvent {
    /// Event method (e.g. "Page.frameNavigated")
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Response to a single command
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpError>,
}

/// Protocol-level error returned by the browser
#[derive(Debug, Clone)]
pub struct CdpError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// WebSocket connection to a single DevTools target
#[async_trait]
pub trait CdpConnection: Send + Sync + std::fmt::Debug {
    /// Send a command and wait for the matching response
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, crate::Error>;

    /// Subscribe to events from this target
    async fn listen_events(&self) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;

    /// Close the connection
    async fn close(&self) -> Result<(), crate::Error>;

    /// Whether the connection is still usable
    fn is_active(&self) -> bool;
}

/// Typed command surface over a [`CdpConnection`].
///
/// Covers exactly the protocol the engine exercises: navigation, script
/// evaluation, init scripts, synthetic input and cookie transfer.
#[async_trait]
pub trait CdpClient: Send + Sync + std::fmt::Debug {
    fn connection(&self) -> Arc<dyn CdpConnection>;

    /// Navigate and wait for the document to settle
    async fn navigate(&self, url: &str) -> Result<NavigationResult, crate::Error>;

    /// Evaluate JavaScript in the page context
    async fn evaluate(&self, script: &str, await_promise: bool)
        -> Result<EvaluationResult, crate::Error>;

    /// Register a script to run before any page script on new documents.
    /// Returns the script identifier.
    async fn add_init_script(&self, source: &str) -> Result<String, crate::Error>;

    /// Dispatch a synthetic mouse event ("mouseMoved", "mousePressed", "mouseReleased")
    async fn dispatch_mouse_event(
        &self,
        kind: &str,
        x: f64,
        y: f64,
        button: Option<&str>,
        click_count: Option<u32>,
    ) -> Result<(), crate::Error>;

    /// Dispatch a synthetic key event ("keyDown", "keyUp", "char")
    async fn dispatch_key_event(
        &self,
        kind: &str,
        text: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), crate::Error>;

    /// Install cookies into the browser
    async fn set_cookies(&self, cookies: &[Value]) -> Result<(), crate::Error>;

    /// Read all cookies visible to this target
    async fn get_cookies(&self) -> Result<Vec<Value>, crate::Error>;

    /// Enable a protocol domain
    async fn enable_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Call a raw protocol method
    async fn call_method(&self, method: &str, params: Value) -> Result<Value, crate::Error>;

    /// Subscribe to events, filtered by method name ("*" for all)
    async fn subscribe_events(
        &self,
        event_type: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;
}

/// Navigation outcome
#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    /// Loader error text reported by the browser, if any
    pub error_text: Option<String>,
}

/// JavaScript evaluation result, decoded from the remote object
#[derive(Debug, Clone)]
pub enum EvaluationResult {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Object(Value),
}

impl EvaluationResult {
    /// String content, or None for non-string results
    pub fn as_str(&self) -> Option<&str> {
        match self {
            EvaluationResult::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness the way the page's JS would see it
    pub fn is_truthy(&self) -> bool {
        match self {
            EvaluationResult::String(s) => !s.is_empty(),
            EvaluationResult::Number(n) => *n != 0.0,
            EvaluationResult::Bool(b) => *b,
            EvaluationResult::Null => false,
            EvaluationResult::Object(v) => !v.is_null(),
        }
    }
}

/// Browser-level control: version probing and target lifecycle
#[async_trait]
pub trait CdpBrowser: Send + Sync + std::fmt::Debug {
    /// Attach to a target and build a client for it
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, crate::Error>;

    /// Create a new page target, returning its WebSocket URL
    async fn create_target(&self, url: &str) -> Result<String, crate::Error>;

    /// Browser version metadata
    async fn get_version(&self) -> Result<BrowserVersion, crate::Error>;

    /// List open targets
    async fn get_targets(&self) -> Result<Vec<TargetInfo>, crate::Error>;

    /// Close all connections held by this controller
    async fn close(&self) -> Result<(), crate::Error>;
}

/// Browser version metadata from /json/version
#[derive(Debug, Clone)]
pub struct BrowserVersion {
    pub protocol_version: String,
    pub product: String,
    pub user_agent: String,
    pub js_version: String,
}

/// One entry from the target list
#[derive(Debug, Clone)]
pub struct TargetInfo {
    pub target_id: String,
    pub target_type: String,
    pub title: String,
    pub url: String,
    pub attached: bool,
}
