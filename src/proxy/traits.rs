//! Proxy transport seam

use async_trait::async_trait;

use crate::bot::ProxyUpstream;
use crate::Result;

/// Issues an HTTP request through a specific upstream proxy.
///
/// The rotator and health checker only need this one operation, so the
/// tests can swap in a scripted transport.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    /// GET `url` through `proxy` and return the response body
    async fn fetch_via(&self, proxy: &ProxyUpstream, url: &str) -> Result<String>;
}
