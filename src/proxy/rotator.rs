//! Round-robin proxy rotation with location affinity

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bot::ProxyUpstream;
use crate::proxy::traits::ProxyTransport;
use crate::{Error, Result};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Hands out upstream proxies in round-robin order.
///
/// A location hint short-circuits rotation: the first enabled proxy
/// whose host contains the hint wins, without advancing the cursor.
pub struct ProxyRotator {
    proxies: RwLock<Vec<ProxyUpstream>>,
    cursor: AtomicUsize,
    max_retries: u32,
    retry_delay_ms: u64,
}

impl ProxyRotator {
    pub fn new(proxies: Vec<ProxyUpstream>) -> Self {
        Self::with_policy(proxies, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS)
    }

    pub fn with_policy(proxies: Vec<ProxyUpstream>, max_retries: u32, retry_delay_ms: u64) -> Self {
        Self {
            proxies: RwLock::new(proxies),
            cursor: AtomicUsize::new(0),
            max_retries,
            retry_delay_ms,
        }
    }

    /// The next proxy, honoring an optional location hint
    pub async fn next_proxy(&self, location: Option<&str>) -> Result<ProxyUpstream> {
        let proxies = self.proxies.read().await;
        let enabled: Vec<&ProxyUpstream> = proxies.iter().filter(|p| p.enabled).collect();

        if enabled.is_empty() {
            return Err(Error::configuration("No enabled proxies available"));
        }

        if let Some(location) = location {
            if let Some(proxy) = enabled.iter().find(|p| p.host.contains(location)) {
                debug!("Location hint {} matched proxy {}", location, proxy.host);
                return Ok((*proxy).clone());
            }
        }

        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % enabled.len();
        Ok(enabled[index].clone())
    }

    /// The next proxy as a credential-free URL
    pub async fn proxy_url(&self, location: Option<&str>) -> Result<String> {
        Ok(self.next_proxy(location).await?.url())
    }

    pub async fn add_proxy(&self, proxy: ProxyUpstream) {
        let mut proxies = self.proxies.write().await;
        proxies.push(proxy);
    }

    pub async fn remove_proxy(&self, host: &str, port: u16) {
        let mut proxies = self.proxies.write().await;
        proxies.retain(|p| !(p.host == host && p.port == port));
    }

    pub async fn proxies(&self) -> Vec<ProxyUpstream> {
        self.proxies.read().await.clone()
    }

    /// GET `url`, rotating to the next proxy on each failed attempt.
    ///
    /// Gives up after `max_retries` attempts with the last failure
    /// attached.
    pub async fn request(&self, transport: &Arc<dyn ProxyTransport>, url: &str) -> Result<String> {
        let mut last_error = String::from("no attempts made");

        for attempt in 0..self.max_retries {
            let proxy = self.next_proxy(None).await?;

            match transport.fetch_via(&proxy, url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    warn!(
                        "Attempt {} via {}:{} failed: {}",
                        attempt + 1,
                        proxy.host,
                        proxy.port,
                        e
                    );
                    last_error = e.to_string();

                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(tokio::time::Duration::from_millis(self.retry_delay_ms))
                            .await;
                    }
                }
            }
        }

        Err(Error::ProxyExhausted {
            attempts: self.max_retries,
            last: last_error,
        })
    }
}
