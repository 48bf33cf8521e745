//! Web scraping task

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::cdp::EvaluationResult;
use crate::tasks::action::run_actions;
use crate::tasks::traits::{Task, TaskContext, TaskFactory, TaskSpec};
use crate::Result;

const PAGE_STATE_SCRIPT: &str = r#"({
    url: window.location.href,
    title: document.title,
    content: document.body.innerText
})"#;

pub struct WebScrapingFactory;

impl TaskFactory for WebScrapingFactory {
    fn kind(&self) -> &str {
        "WebScraping"
    }

    fn validate(&self, spec: &TaskSpec) -> Result<()> {
        spec.require_str("url")?;
        Ok(())
    }

    fn build(&self, spec: &TaskSpec) -> Result<Arc<dyn Task>> {
        Ok(Arc::new(WebScrapingTask {
            url: spec.require_str("url")?.to_string(),
            selector: spec
                .parameters
                .get("selector")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            actions: spec.actions.clone(),
        }))
    }
}

/// Loads a page, optionally waits for a content selector, replays the
/// action list and returns the page state.
pub struct WebScrapingTask {
    url: String,
    selector: Option<String>,
    actions: Vec<crate::tasks::action::Action>,
}

#[async_trait]
impl Task for WebScrapingTask {
    fn kind(&self) -> &str {
        "WebScraping"
    }

    async fn execute(&self, context: &TaskContext) -> Result<Value> {
        let page = &context.page;

        info!("Scraping {}", self.url);
        page.navigate(&self.url).await?;
        page.wait_for_network_idle(context.navigation_timeout_ms).await?;
        context.handle_captcha().await?;

        if let Some(selector) = &self.selector {
            debug!("Waiting for content selector {}", selector);
            page.wait_for_selector(selector, context.page_load_timeout_ms)
                .await?;
        }

        run_actions(page, &self.actions).await?;

        let state = match page.evaluate(PAGE_STATE_SCRIPT, false).await? {
            EvaluationResult::Object(value) => value,
            other => json!({
                "url": page.current_url().await?,
                "title": page.title().await?,
                "content": other.as_str().unwrap_or_default(),
            }),
        };

        Ok(json!({ "status": "completed", "data": state }))
    }
}
