//! Browser-level CDP control
//!
//! Talks to the browser's DevTools HTTP endpoints for version metadata
//! and target lifecycle, and attaches per-target WebSocket clients.

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default [`CdpBrowser`] implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser WebSocket endpoint (e.g. "ws://localhost:9222")
    endpoint: String,
    http: reqwest::Client,
    /// Open connections by target id, closed together on shutdown
    connections: Arc<Mutex<HashMap<String, Arc<dyn CdpConnection>>>>,
}

impl CdpBrowserImpl {
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into();
        info!("Attaching browser controller to {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            connections: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// DevTools HTTP base for the ws endpoint
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replace("ws://", "http://")
            .replace("wss://", "https://")
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        debug!("Attaching to target {}", target_url);

        let connection = CdpWebSocketConnection::connect(target_url).await?;

        let target_id = target_url.rsplit('/').next().unwrap_or("unknown").to_string();
        {
            let mut connections = self.connections.lock().await;
            connections.insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);
        }

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page and Runtime are needed by every session; Network is needed
        // for cookie transfer. Other domains are enabled on demand.
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;
        client.enable_domain("Network").await?;

        Ok(client)
    }

    async fn create_target(&self, url: &str) -> Result<String, Error> {
        debug!("Creating target for {}", url);

        // /json/new creates a page and returns its WebSocket URL directly.
        let new_url = format!("{}/json/new?{}", self.http_endpoint(), url);

        let response = self.http.put(&new_url).send().await.map_err(|e| {
            Error::browser_disconnected(format!(
                "Cannot reach DevTools endpoint {}: {}",
                self.endpoint, e
            ))
        })?;

        let target: serde_json::Value = response.json().await?;

        target
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::cdp("No webSocketDebuggerUrl in new target response"))
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let url = format!("{}/json/version", self.http_endpoint());
        debug!("Fetching browser version from {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            Error::browser_disconnected(format!(
                "Cannot reach DevTools endpoint {}: {}",
                self.endpoint, e
            ))
        })?;

        let version: serde_json::Value = response.json().await?;
        let field = |key: &str| {
            version
                .get(key)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };

        Ok(BrowserVersion {
            protocol_version: field("Protocol-Version"),
            product: field("Browser"),
            user_agent: field("User-Agent"),
            js_version: field("WebKit-Version"),
        })
    }

    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        let url = format!("{}/json", self.http_endpoint());
        debug!("Fetching targets from {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| {
            Error::browser_disconnected(format!(
                "Cannot reach DevTools endpoint {}: {}",
                self.endpoint, e
            ))
        })?;

        let entries: Vec<serde_json::Value> = response.json().await?;

        let targets = entries
            .iter()
            .filter_map(|entry| {
                let target_id = entry.get("id").and_then(|v| v.as_str())?;
                let target_type = entry.get("type").and_then(|v| v.as_str())?;
                let url = entry.get("url").and_then(|v| v.as_str())?;
                Some(TargetInfo {
                    target_id: target_id.to_string(),
                    target_type: target_type.to_string(),
                    title: entry
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or("")
                        .to_string(),
                    url: url.to_string(),
                    attached: entry
                        .get("attached")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                })
            })
            .collect();

        Ok(targets)
    }

    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;

        if connections.is_empty() {
            return Ok(());
        }

        info!("Closing {} CDP connections", connections.len());

        for (target_id, connection) in connections.iter() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        connections.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_endpoint_conversion() {
        let browser = CdpBrowserImpl::new("ws://localhost:9222");
        assert_eq!(browser.http_endpoint(), "http://localhost:9222");

        let browser = CdpBrowserImpl::new("wss://remote.example:9222");
        assert_eq!(browser.http_endpoint(), "https://remote.example:9222");
    }
}
