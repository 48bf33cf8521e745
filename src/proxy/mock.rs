//! Mock proxy transport

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::bot::ProxyUpstream;
use crate::proxy::traits::ProxyTransport;
use crate::{Error, Result};

/// Scripted transport recording which proxies were used
#[derive(Debug, Default)]
pub struct MockProxyTransport {
    /// Hosts whose requests fail
    failing: Mutex<HashSet<String>>,
    pub requests: Mutex<Vec<(String, String)>>,
    body: Mutex<String>,
}

impl MockProxyTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            body: Mutex::new("203.0.113.7".to_string()),
            ..Default::default()
        })
    }

    pub async fn fail_host(&self, host: &str) {
        let mut failing = self.failing.lock().await;
        failing.insert(host.to_string());
    }

    pub async fn set_body(&self, body: &str) {
        let mut current = self.body.lock().await;
        *current = body.to_string();
    }

    pub async fn used_hosts(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|(host, _)| host.clone())
            .collect()
    }
}

#[async_trait]
impl ProxyTransport for MockProxyTransport {
    async fn fetch_via(&self, proxy: &ProxyUpstream, url: &str) -> Result<String> {
        {
            let mut requests = self.requests.lock().await;
            requests.push((proxy.host.clone(), url.to_string()));
        }

        let failing = self.failing.lock().await;
        if failing.contains(&proxy.host) {
            return Err(Error::internal(format!(
                "connection refused by {}",
                proxy.host
            )));
        }

        Ok(self.body.lock().await.clone())
    }
}
