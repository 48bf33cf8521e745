//! Page session implementation
//!
//! Selector-level page operations on top of a CDP client. Every method
//! checks the active flag first so callers get a PageClosed error
//! instead of a protocol timeout after the page goes away.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cdp::{CdpClient, EvaluationResult};
use crate::session::traits::PageSession;
use crate::Error;

/// Default [`PageSession`] implementation
#[derive(Debug)]
pub struct PageSessionImpl {
    id: String,
    session_id: String,
    cdp: Arc<dyn CdpClient>,
    active: Arc<RwLock<bool>>,
}

impl PageSessionImpl {
    pub fn new(session_id: String, cdp: Arc<dyn CdpClient>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            session_id,
            cdp,
            active: Arc::new(RwLock::new(true)),
        }
    }

    async fn ensure_active(&self) -> Result<(), Error> {
        if *self.active.read().await {
            Ok(())
        } else {
            Err(Error::page_closed(&self.id))
        }
    }

    /// Selector as a JS string literal
    fn quote(selector: &str) -> String {
        serde_json::Value::String(selector.to_string()).to_string()
    }
}

#[async_trait]
impl PageSession for PageSessionImpl {
    fn id(&self) -> &str {
        &self.id
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn navigate(&self, url: &str) -> Result<(), Error> {
        self.ensure_active().await?;
        self.cdp.navigate(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, Error> {
        self.ensure_active().await?;

        match self.cdp.evaluate("window.location.href", false).await? {
            EvaluationResult::String(url) => Ok(url),
            _ => Ok(String::new()),
        }
    }

    async fn title(&self) -> Result<String, Error> {
        self.ensure_active().await?;

        match self.cdp.evaluate("document.title", false).await? {
            EvaluationResult::String(title) => Ok(title),
            _ => Ok(String::new()),
        }
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        self.ensure_active().await?;
        self.cdp.evaluate(script, await_promise).await
    }

    async fn query_exists(&self, selector: &str) -> Result<bool, Error> {
        self.ensure_active().await?;

        let script = format!("document.querySelector({}) !== null", Self::quote(selector));
        Ok(self.cdp.evaluate(&script, false).await?.is_truthy())
    }

    async fn wait_for_selector(&self, selector: &str, timeout_ms: u64) -> Result<(), Error> {
        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(timeout_ms);

        loop {
            if self.query_exists(selector).await? {
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Selector {} not found within {}ms",
                    selector, timeout_ms
                )));
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        }
    }

    async fn element_center(&self, selector: &str) -> Result<(f64, f64), Error> {
        self.ensure_active().await?;

        let script = format!(
            "(() => {{ \
               const el = document.querySelector({}); \
               if (!el) return null; \
               const r = el.getBoundingClientRect(); \
               return {{ x: r.left + r.width / 2, y: r.top + r.height / 2 }}; \
             }})()",
            Self::quote(selector)
        );

        match self.cdp.evaluate(&script, false).await? {
            EvaluationResult::Object(value) => {
                let x = value.get("x").and_then(|v| v.as_f64());
                let y = value.get("y").and_then(|v| v.as_f64());
                match (x, y) {
                    (Some(x), Some(y)) => Ok((x, y)),
                    _ => Err(Error::element_not_found(selector)),
                }
            }
            _ => Err(Error::element_not_found(selector)),
        }
    }

    async fn click(&self, selector: &str) -> Result<(), Error> {
        let (x, y) = self.element_center(selector).await?;
        debug!("Clicking {} at ({:.0}, {:.0})", selector, x, y);

        self.cdp
            .dispatch_mouse_event("mouseMoved", x, y, None, None)
            .await?;
        self.cdp
            .dispatch_mouse_event("mousePressed", x, y, Some("left"), Some(1))
            .await?;
        self.cdp
            .dispatch_mouse_event("mouseReleased", x, y, Some("left"), Some(1))
            .await?;

        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str, delay_ms: u64) -> Result<(), Error> {
        self.click(selector).await?;

        for ch in text.chars() {
            self.cdp
                .dispatch_key_event("char", Some(&ch.to_string()), None)
                .await?;
            if delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
            }
        }

        Ok(())
    }

    async fn hover(&self, selector: &str) -> Result<(), Error> {
        let (x, y) = self.element_center(selector).await?;

        self.cdp
            .dispatch_mouse_event("mouseMoved", x, y, None, None)
            .await
    }

    async fn press_key(&self, key: &str) -> Result<(), Error> {
        self.ensure_active().await?;

        self.cdp.dispatch_key_event("keyDown", None, Some(key)).await?;
        self.cdp.dispatch_key_event("keyUp", None, Some(key)).await?;
        Ok(())
    }

    async fn scroll_by(&self, dx: f64, dy: f64) -> Result<(), Error> {
        self.ensure_active().await?;

        let script = format!("window.scrollBy({}, {})", dx, dy);
        self.cdp.evaluate(&script, false).await?;
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout_ms: u64) -> Result<(), Error> {
        self.ensure_active().await?;

        let deadline = tokio::time::Instant::now() + tokio::time::Duration::from_millis(timeout_ms);

        // The document must report complete on two consecutive polls with
        // no resource entries added in between before the page counts as
        // settled.
        let mut last_resource_count = -1.0;
        let mut quiet_polls = 0u32;

        loop {
            let state = self.cdp.evaluate("document.readyState", false).await;
            let resources = self
                .cdp
                .evaluate("performance.getEntriesByType('resource').length", false)
                .await;

            let complete = matches!(state, Ok(EvaluationResult::String(ref s)) if s == "complete");
            let resource_count = match resources {
                Ok(EvaluationResult::Number(n)) => n,
                _ => -1.0,
            };

            if complete && resource_count == last_resource_count {
                quiet_polls += 1;
                if quiet_polls >= 2 {
                    return Ok(());
                }
            } else {
                quiet_polls = 0;
            }
            last_resource_count = resource_count;

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::timeout(format!(
                    "Network did not settle within {}ms",
                    timeout_ms
                )));
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(250)).await;
        }
    }

    async fn close(&self) -> Result<(), Error> {
        {
            let active = self.active.read().await;
            if !*active {
                return Ok(());
            }
        }

        // Mark inactive even when the protocol call fails; the target may
        // already be gone.
        if let Err(e) = self.cdp.call_method("Page.close", serde_json::json!({})).await {
            warn!("Page.close failed for page {}: {}", self.id, e);
        }

        *self.active.write().await = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
            .try_read()
            .map(|active| *active)
            .unwrap_or(false)
    }

    fn cdp(&self) -> Arc<dyn CdpClient> {
        Arc::clone(&self.cdp)
    }
}
