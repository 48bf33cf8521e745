//! Typed CDP client
//!
//! High-level command surface over a [`CdpConnection`]. Decodes remote
//! objects into [`EvaluationResult`] values and wraps the input and
//! cookie commands the bot engine drives pages with.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Default [`CdpClient`] implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Decode a remote object into a plain result value.
    fn decode_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
            ),
            "number" => EvaluationResult::Number(
                obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0),
            ),
            "boolean" => EvaluationResult::Bool(
                obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false),
            ),
            "undefined" | "null" => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                let value = obj.value.clone().unwrap_or(serde_json::Value::Null);
                if value.is_null() && obj.subtype.as_deref() != Some("null") {
                    EvaluationResult::Null
                } else {
                    EvaluationResult::Object(value)
                }
            }
            _ => EvaluationResult::Null,
        }
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    fn connection(&self) -> Arc<dyn CdpConnection> {
        Arc::clone(&self.connection)
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams {
            url: url.to_string(),
            referrer: None,
        };

        let result = self
            .call_method("Page.navigate", serde_json::to_value(params)?)
            .await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::navigation_failed(format!("{}: {}", url, error_text)));
        }

        // Poll document.readyState; event-based load detection races when
        // the command response arrives after the load event already fired.
        let mut settled = false;
        for attempt in 0..50 {
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => {
                    debug!("Page settled after {} polls", attempt + 1);
                    settled = true;
                    break;
                }
                Ok(_) => {}
                Err(e) => debug!("readyState poll failed: {}", e),
            }
        }

        if !settled {
            debug!("readyState never reached complete, continuing anyway");
        }

        Ok(NavigationResult {
            url: result
                .get("frame")
                .and_then(|f| f.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or(url)
                .to_string(),
            error_text: None,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
        };

        let result = self
            .call_method("Runtime.evaluate", serde_json::to_value(params)?)
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let description = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|d| d.as_str())
                .unwrap_or("Unknown script error");
            return Err(Error::script_execution_failed(description.to_string()));
        }

        let response: EvaluateResponse = serde_json::from_value(result)?;
        Ok(Self::decode_remote_object(&response.result))
    }

    async fn add_init_script(&self, source: &str) -> Result<String, Error> {
        let result = self
            .call_method(
                "Page.addScriptToEvaluateOnNewDocument",
                serde_json::json!({ "source": source }),
            )
            .await?;

        result
            .get("identifier")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::cdp("No identifier in addScriptToEvaluateOnNewDocument result"))
    }

    async fn dispatch_mouse_event(
        &self,
        kind: &str,
        x: f64,
        y: f64,
        button: Option<&str>,
        click_count: Option<u32>,
    ) -> Result<(), Error> {
        let params = MouseEventParams {
            kind: kind.to_string(),
            x,
            y,
            button: button.map(|b| b.to_string()),
            click_count,
        };

        let _ = self
            .call_method("Input.dispatchMouseEvent", serde_json::to_value(params)?)
            .await?;

        Ok(())
    }

    async fn dispatch_key_event(
        &self,
        kind: &str,
        text: Option<&str>,
        key: Option<&str>,
    ) -> Result<(), Error> {
        let params = KeyEventParams {
            kind: kind.to_string(),
            text: text.map(|t| t.to_string()),
            key: key.map(|k| k.to_string()),
        };

        let _ = self
            .call_method("Input.dispatchKeyEvent", serde_json::to_value(params)?)
            .await?;

        Ok(())
    }

    async fn set_cookies(&self, cookies: &[serde_json::Value]) -> Result<(), Error> {
        if cookies.is_empty() {
            return Ok(());
        }

        debug!("Installing {} cookies", cookies.len());

        let _ = self
            .call_method(
                "Network.setCookies",
                serde_json::json!({ "cookies": cookies }),
            )
            .await?;

        Ok(())
    }

    async fn get_cookies(&self) -> Result<Vec<serde_json::Value>, Error> {
        let result = self
            .call_method("Network.getCookies", serde_json::json!({}))
            .await?;

        Ok(result
            .get("cookies")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain {}", domain);

        let method = format!("{}.enable", domain);
        let _ = self.call_method(&method, serde_json::json!({})).await?;

        Ok(())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;

        response
            .result
            .ok_or_else(|| Error::cdp(format!("No result in {} response", method)))
    }

    async fn subscribe_events(
        &self,
        event_type: &str,
    ) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        debug!("Subscribing to {} events", event_type);

        let mut source = self.connection.listen_events().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let filter = event_type.to_string();

        tokio::spawn(async move {
            while let Some(event) = source.recv().await {
                if (filter == "*" || event.method == filter) && tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }
}
