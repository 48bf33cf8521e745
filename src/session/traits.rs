//! Session layer traits
//!
//! A browser session is one bot's browsing context: its pages share the
//! same init scripts, cookies and identity. Pages expose selector-level
//! operations so the task and behavior layers never touch raw CDP.

use async_trait::async_trait;
use std::sync::Arc;

/// Options applied when a session opens a new page
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub device_scale_factor: f64,
    pub is_mobile: bool,
    /// User agent override for this page
    pub user_agent: Option<String>,
    /// URL opened immediately after creation
    pub initial_url: Option<String>,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
            device_scale_factor: 1.0,
            is_mobile: false,
            user_agent: None,
            initial_url: None,
        }
    }
}

/// A bot's browsing context
#[async_trait]
pub trait BrowserSession: Send + Sync + std::fmt::Debug {
    /// Session id (registry key)
    fn id(&self) -> &str;

    /// Name of the bot this session belongs to
    fn bot_name(&self) -> &str;

    /// Register a script evaluated on every new document in every page
    /// opened after this call
    async fn add_init_script(&self, source: &str) -> Result<(), crate::Error>;

    /// Cookies installed into every new page
    async fn set_cookies(&self, cookies: Vec<serde_json::Value>) -> Result<(), crate::Error>;

    /// Open a new page in this session
    async fn create_page(&self, options: PageOptions) -> Result<Arc<dyn PageSession>, crate::Error>;

    /// Pages opened by this session, including closed ones until cleanup
    async fn pages(&self) -> Vec<Arc<dyn PageSession>>;

    /// Whether the underlying browser is still reachable
    async fn is_connected(&self) -> bool;

    /// Close all pages and disconnect
    async fn close(&self) -> Result<(), crate::Error>;
}

/// One page of a session
#[async_trait]
pub trait PageSession: Send + Sync + std::fmt::Debug {
    fn id(&self) -> &str;

    /// Id of the owning session
    fn session_id(&self) -> &str;

    async fn navigate(&self, url: &str) -> Result<(), crate::Error>;

    async fn current_url(&self) -> Result<String, crate::Error>;

    async fn title(&self) -> Result<String, crate::Error>;

    /// Evaluate JavaScript in the page context
    async fn evaluate(
        &self,
        script: &str,
        await_promise: bool,
    ) -> Result<crate::cdp::EvaluationResult, crate::Error>;

    /// Whether the selector currently matches an element
    async fn query_exists(&self, selector: &str) -> Result<bool, crate::Error>;

    /// Poll until the selector matches, up to `timeout_ms`
    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), crate::Error>;

    /// Viewport center of the first matching element
    async fn element_center(&self, selector: &str) -> Result<(f64, f64), crate::Error>;

    /// Click the first matching element
    async fn click(&self, selector: &str) -> Result<(), crate::Error>;

    /// Focus the element and type text with a fixed inter-key delay
    async fn type_text(&self, selector: &str, text: &str, delay_ms: u64)
        -> Result<(), crate::Error>;

    /// Move the pointer over the element without clicking
    async fn hover(&self, selector: &str) -> Result<(), crate::Error>;

    /// Press a named key (e.g. "Enter")
    async fn press_key(&self, key: &str) -> Result<(), crate::Error>;

    /// Scroll the viewport by the given offsets
    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), crate::Error>;

    /// Wait until the page has loaded and network activity has settled
    async fn wait_for_network_idle(&self, timeout_ms: u64) -> Result<(), crate::Error>;

    async fn close(&self) -> Result<(), crate::Error>;

    fn is_active(&self) -> bool;

    /// Raw protocol access for the stealth layer
    fn cdp(&self) -> Arc<dyn crate::cdp::CdpClient>;
}
