//! Mock session implementations
//!
//! In-memory page and session doubles for the task, behavior and launch
//! tests. Pages are seeded with the selectors that "exist" and record
//! every interaction for assertions.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cdp::{CdpClient, EvaluationResult, MockCdpClient};
use crate::session::traits::{BrowserSession, PageOptions, PageSession};
use crate::Error;

/// Scriptable mock page
#[derive(Debug)]
pub struct MockPageSession {
    id: String,
    session_id: String,
    cdp: Arc<MockCdpClient>,
    /// Selectors that resolve to an element
    selectors: Mutex<HashSet<String>>,
    url: Mutex<String>,
    title: Mutex<String>,
    navigation_fails: AtomicBool,
    network_idle_fails: AtomicBool,
    active: AtomicBool,
    /// Interaction log
    pub navigations: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub keys: Mutex<Vec<String>>,
    pub scrolls: Mutex<Vec<(f64, f64)>>,
    pub hovered: Mutex<Vec<String>>,
}

impl MockPageSession {
    pub fn new() -> Arc<Self> {
        Self::for_session("mock-session")
    }

    pub fn for_session(session_id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            cdp: MockCdpClient::new(),
            selectors: Mutex::new(HashSet::new()),
            url: Mutex::new("about:blank".to_string()),
            title: Mutex::new(String::new()),
            navigation_fails: AtomicBool::new(false),
            network_idle_fails: AtomicBool::new(false),
            active: AtomicBool::new(true),
            navigations: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
            typed: Mutex::new(Vec::new()),
            keys: Mutex::new(Vec::new()),
            scrolls: Mutex::new(Vec::new()),
            hovered: Mutex::new(Vec::new()),
        })
    }

    /// Make `selector` resolvable on this page
    pub async fn add_selector(&self, selector: &str) {
        let mut selectors = self.selectors.lock().await;
        selectors.insert(selector.to_string());
    }

    pub async fn set_title(&self, title: &str) {
        let mut current = self.title.lock().await;
        *current = title.to_string();
    }

    pub async fn set_url(&self, url: &str) {
        let mut current = self.url.lock().await;
        *current = url.to_string();
    }

    pub fn fail_navigation(&self) {
        self.navigation_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_network_idle(&self) {
        self.network_idle_fails.store(true, Ordering::SeqCst);
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    /// The inner mock CDP client, for eval scripting
    pub fn mock_cdp(&self) -> Arc<MockCdpClient> {
        Arc::clone(&self.cdp)
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::page_closed(&self.id))
        }
    }

    async fn ensure_selector(&self, selector: &str) -> Result<(), Error> {
        let selectors = self.selectors.lock().await;
        if selectors.contains(selector) {
            Ok(())
        } else {
            Err(Error::element_not_found(selector))
        }
    }
}

#[async_trait]
impl PageSession for MockPageSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_active()?;

        if self.navigation_fails.load(Ordering::SeqCst) {
            return Err(Error::navigation_failed(url.to_string()));
        }

        {
            let mut navigations = self.navigations.lock().await;
            navigations.push(url.to_string());
        }
        self.set_url(url).await;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(self.url.lock().await.clone())
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_active()?;
        Ok(self.title.lock().await.clone())
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        self.ensure_active()?;
        self.cdp.evaluate(script, await_promise).await
    }

    async fn query_exists(&self, selector: &str) -> Result<bool, Error> {
        self.ensure_active()?;
        let selectors = self.selectors.lock().await;
        Ok(selectors.contains(selector))
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), Error> {
        if self.query_exists(selector).await? {
            Ok(())
        } else {
            Err(Error::timeout(format!(
                "Selector {} not found within {}ms",
                selector, timeout_ms
            )))
        }
    }

    async fn element_center(&self, selector: &str) -> Result<(f64, f64), Error> {
        self.ensure_active()?;
        self.ensure_selector(selector).await?;
        Ok((100.0, 100.0))
    }

    async fn click(&self, selector: &str) -> Result<(), Error> {
        self.ensure_active()?;
        self.ensure_selector(selector).await?;

        let mut clicks = self.clicks.lock().await;
        clicks.push(selector.to_string());
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, _delay_ms: u64) -> Result<(), Error> {
        self.ensure_active()?;
        self.ensure_selector(selector).await?;

        let mut typed = self.typed.lock().await;
        typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), Error> {
        self.ensure_active()?;
        self.ensure_selector(selector).await?;

        let mut hovered = self.hovered.lock().await;
        hovered.push(selector.to_string());
        Ok(())
    }

    async fn press_key(&self, key: &str) -> Result<(), Error> {
        self.ensure_active()?;

        let mut keys = self.keys.lock().await;
        keys.push(key.to_string());
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), Error> {
        self.ensure_active()?;

        let mut scrolls = self.scrolls.lock().await;
        scrolls.push((dx, dy));
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout_ms: u64) -> Result<(), Error> {
        self.ensure_active()?;

        if self.network_idle_fails.load(Ordering::SeqCst) {
            Err(Error::timeout(format!(
                "Network did not settle within {}ms",
                timeout_ms
            )))
        } else {
            Ok(())
        }
    }

    async fn close(&self) -> Result<(), Error> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn cdp(&self) -> Arc<dyn CdpClient> {
        Arc::clone(&self.cdp) as Arc<dyn CdpClient>
    }
}

/// Mock session handing out [`MockPageSession`] pages
#[derive(Debug)]
pub struct MockBrowserSession {
    id: String,
    bot_name: String,
    connected: AtomicBool,
    pub init_scripts: Mutex<Vec<String>>,
    pub cookies: Mutex<Vec<serde_json::Value>>,
    /// Pages to serve before falling back to fresh ones
    seeded: Mutex<Vec<Arc<MockPageSession>>>,
    pub created: Mutex<Vec<Arc<MockPageSession>>>,
    /// Options each create_page call was given
    pub page_options: Mutex<Vec<PageOptions>>,
}

impl MockBrowserSession {
    pub fn new(bot_name: &str) -> Arc<Self> {
        Arc::new(Self {
            id: Uuid::new_v4().to_string(),
            bot_name: bot_name.to_string(),
            connected: AtomicBool::new(true),
            init_scripts: Mutex::new(Vec::new()),
            cookies: Mutex::new(Vec::new()),
            seeded: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
            page_options: Mutex::new(Vec::new()),
        })
    }

    /// The next create_page call returns this page
    pub async fn seed_page(&self, page: Arc<MockPageSession>) {
        let mut seeded = self.seeded.lock().await;
        seeded.push(page);
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl BrowserSession for MockBrowserSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn bot_name(&self) -> &str {
        &self.bot_name
    }

    async fn add_init_script(&self, source: &str) -> Result<(), Error> {
        let mut scripts = self.init_scripts.lock().await;
        scripts.push(source.to_string());
        Ok(())
    }

    async fn set_cookies(&self, cookies: Vec<serde_json::Value>) -> Result<(), Error> {
        let mut stored = self.cookies.lock().await;
        *stored = cookies;
        Ok(())
    }

    async fn create_page(&self, options: PageOptions) -> Result<Arc<dyn PageSession>, Error> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::browser_disconnected(self.id.clone()));
        }

        {
            let mut recorded = self.page_options.lock().await;
            recorded.push(options);
        }

        let page = {
            let mut seeded = self.seeded.lock().await;
            if seeded.is_empty() {
                MockPageSession::for_session(&self.id)
            } else {
                seeded.remove(0)
            }
        };

        let mut created = self.created.lock().await;
        created.push(Arc::clone(&page));

        Ok(page as Arc<dyn PageSession>)
    }

    async fn pages(&self) -> Vec<Arc<dyn PageSession>> {
        let created = self.created.lock().await;
        created
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn PageSession>)
            .collect()
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<(), Error> {
        self.connected.store(false, Ordering::SeqCst);

        let created = self.created.lock().await;
        for page in created.iter() {
            let _ = page.close().await;
        }
        Ok(())
    }
}
