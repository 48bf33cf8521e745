//! Proxy health probing

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::bot::ProxyUpstream;
use crate::proxy::traits::ProxyTransport;
use crate::Result;

const PROBE_URL: &str = "https://api.ipify.org";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Real transport: one throwaway client per request, routed through the
/// given upstream.
pub struct HttpProxyTransport;

#[async_trait]
impl ProxyTransport for HttpProxyTransport {
    async fn fetch_via(&self, proxy: &ProxyUpstream, url: &str) -> Result<String> {
        let mut upstream = reqwest::Proxy::all(proxy.url())?;
        if let (Some(username), Some(password)) = (&proxy.username, &proxy.password) {
            upstream = upstream.basic_auth(username, password);
        }

        let client = reqwest::Client::builder()
            .proxy(upstream)
            .timeout(PROBE_TIMEOUT)
            .build()?;

        let response = client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Probes proxies against an echo endpoint
pub struct ProxyHealthChecker {
    transport: Arc<dyn ProxyTransport>,
}

impl ProxyHealthChecker {
    pub fn new(transport: Arc<dyn ProxyTransport>) -> Self {
        Self { transport }
    }

    /// Whether the proxy can reach the probe endpoint
    pub async fn check(&self, proxy: &ProxyUpstream) -> bool {
        match self.transport.fetch_via(proxy, PROBE_URL).await {
            Ok(_) => true,
            Err(e) => {
                debug!("Proxy {}:{} is not healthy: {}", proxy.host, proxy.port, e);
                false
            }
        }
    }

    /// The subset of `proxies` that pass the probe
    pub async fn healthy_proxies(&self, proxies: &[ProxyUpstream]) -> Vec<ProxyUpstream> {
        let mut healthy = Vec::new();
        for proxy in proxies {
            if self.check(proxy).await {
                healthy.push(proxy.clone());
            }
        }
        healthy
    }
}
