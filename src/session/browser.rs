//! Browser session implementation
//!
//! One session per bot. Init scripts and cookies registered on the
//! session are replayed into every page it opens, so a fingerprint
//! applied once covers the whole browsing context.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cdp::CdpBrowser;
use crate::session::page::PageSessionImpl;
use crate::session::traits::{BrowserSession, PageOptions, PageSession};
use crate::Error;

/// Default [`BrowserSession`] implementation
#[derive(Debug)]
pub struct BrowserSessionImpl {
    id: String,
    bot_name: String,
    browser: Arc<dyn CdpBrowser>,
    /// Scripts applied to every new page via Page.addScriptToEvaluateOnNewDocument
    init_scripts: RwLock<Vec<String>>,
    /// Cookies installed into every new page
    cookies: RwLock<Vec<serde_json::Value>>,
    pages: Mutex<Vec<Arc<dyn PageSession>>>,
}

impl BrowserSessionImpl {
    pub fn new<S: Into<String>>(bot_name: S, browser: Arc<dyn CdpBrowser>) -> Self {
        let bot_name = bot_name.into();
        let id = Uuid::new_v4().to_string();
        info!("Opening session {} for bot {}", id, bot_name);

        Self {
            id,
            bot_name,
            browser,
            init_scripts: RwLock::new(Vec::new()),
            cookies: RwLock::new(Vec::new()),
            pages: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl BrowserSession for BrowserSessionImpl {
    fn id(&self) -> &str {
        &self.id
    }

    fn bot_name(&self) -> &str {
        &self.bot_name
    }

    async fn add_init_script(&self, source: &str) -> Result<(), Error> {
        let mut scripts = self.init_scripts.write().await;
        scripts.push(source.to_string());
        Ok(())
    }

    async fn set_cookies(&self, cookies: Vec<serde_json::Value>) -> Result<(), Error> {
        let mut stored = self.cookies.write().await;
        *stored = cookies;
        Ok(())
    }

    async fn create_page(&self, options: PageOptions) -> Result<Arc<dyn PageSession>, Error> {
        debug!("Session {} opening a page", self.id);

        let initial_url = options
            .initial_url
            .clone()
            .unwrap_or_else(|| "about:blank".to_string());

        let target_url = self.browser.create_target(&initial_url).await?;
        let cdp = self.browser.create_client(&target_url).await?;

        // Identity must be in place before any page script runs.
        {
            let scripts = self.init_scripts.read().await;
            for script in scripts.iter() {
                cdp.add_init_script(script).await?;
            }
        }

        {
            let cookies = self.cookies.read().await;
            cdp.set_cookies(&cookies).await?;
        }

        if let Some(user_agent) = &options.user_agent {
            let _ = cdp
                .call_method(
                    "Network.setUserAgentOverride",
                    serde_json::json!({ "userAgent": user_agent }),
                )
                .await?;
        }

        let _ = cdp
            .call_method(
                "Emulation.setDeviceMetricsOverride",
                serde_json::json!({
                    "width": options.viewport_width,
                    "height": options.viewport_height,
                    "deviceScaleFactor": options.device_scale_factor,
                    "mobile": options.is_mobile,
                }),
            )
            .await?;

        let page: Arc<dyn PageSession> = Arc::new(PageSessionImpl::new(self.id.clone(), cdp));

        let mut pages = self.pages.lock().await;
        pages.push(Arc::clone(&page));

        Ok(page)
    }

    async fn pages(&self) -> Vec<Arc<dyn PageSession>> {
        self.pages.lock().await.clone()
    }

    async fn is_connected(&self) -> bool {
        self.browser.get_version().await.is_ok()
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing session {} ({})", self.id, self.bot_name);

        let pages = self.pages.lock().await;
        for page in pages.iter() {
            if let Err(e) = page.close().await {
                warn!("Failed to close page {}: {}", page.id(), e);
            }
        }
        drop(pages);

        self.browser.close().await
    }
}
