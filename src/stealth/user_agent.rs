//! User agent rotation and browser version tracking

use rand::seq::SliceRandom;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::bot::BrowserEngine;
use crate::stealth::fingerprint::{
    FingerprintOs, ANDROID_USER_AGENTS, IOS_USER_AGENTS, LINUX_USER_AGENTS, MACOS_USER_AGENTS,
    WINDOWS_USER_AGENTS,
};
use crate::{Error, Result};

const CHROME_RELEASES_URL: &str =
    "https://chromiumdash.appspot.com/fetch_releases?channel=Stable&platform=Windows&num=1";
const FIREFOX_VERSIONS_URL: &str = "https://product-details.mozilla.org/1.0/firefox_versions.json";
const WEBKIT_STATUS_URL: &str = "https://webkit.org/status/";

fn pool_for(os: FingerprintOs) -> &'static [&'static str] {
    match os {
        FingerprintOs::Windows => WINDOWS_USER_AGENTS,
        FingerprintOs::MacOs => MACOS_USER_AGENTS,
        FingerprintOs::Linux => LINUX_USER_AGENTS,
        FingerprintOs::Android => ANDROID_USER_AGENTS,
        FingerprintOs::Ios => IOS_USER_AGENTS,
    }
}

/// Picks user agents from the static per-platform pools, either at
/// random or round-robin through an instance cursor.
#[derive(Debug, Default)]
pub struct UserAgentRotator {
    cursor: AtomicUsize,
}

impl UserAgentRotator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next desktop user agent in round-robin order
    pub fn next(&self) -> String {
        let pool: Vec<&str> = WINDOWS_USER_AGENTS
            .iter()
            .chain(MACOS_USER_AGENTS.iter())
            .chain(LINUX_USER_AGENTS.iter())
            .copied()
            .collect();
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % pool.len();
        pool[index].to_string()
    }

    /// The next user agent for the platform in round-robin order
    pub fn next_for_os(&self, os: FingerprintOs) -> String {
        let pool = pool_for(os);
        let index = self.cursor.fetch_add(1, Ordering::SeqCst) % pool.len();
        pool[index].to_string()
    }

    /// A random desktop user agent
    pub fn random() -> String {
        let mut rng = rand::thread_rng();
        let pool: Vec<&str> = WINDOWS_USER_AGENTS
            .iter()
            .chain(MACOS_USER_AGENTS.iter())
            .chain(LINUX_USER_AGENTS.iter())
            .copied()
            .collect();
        pool.choose(&mut rng)
            .copied()
            .unwrap_or(WINDOWS_USER_AGENTS[0])
            .to_string()
    }

    /// A random user agent for the given platform
    pub fn random_for_os(os: FingerprintOs) -> String {
        let mut rng = rand::thread_rng();
        pool_for(os)
            .choose(&mut rng)
            .copied()
            .unwrap_or(WINDOWS_USER_AGENTS[0])
            .to_string()
    }
}

/// How many versions to retain per engine
const VERSION_HISTORY: usize = 5;

/// Tracks current stable browser versions from vendor endpoints.
///
/// Each refresh fetches the latest stable release per engine and keeps
/// the five most recent distinct versions seen.
pub struct BrowserVersionManager {
    http: reqwest::Client,
    versions: RwLock<HashMap<BrowserEngine, Vec<String>>>,
}

impl Default for BrowserVersionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserVersionManager {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            versions: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the latest stable version of every engine.
    ///
    /// A failing vendor endpoint is logged and skipped; the other
    /// engines still update.
    pub async fn refresh(&self) -> Result<()> {
        let fetches = [
            (BrowserEngine::Chromium, self.fetch_chrome_version().await),
            (BrowserEngine::Firefox, self.fetch_firefox_version().await),
            (BrowserEngine::Webkit, self.fetch_webkit_version().await),
        ];

        let mut versions = self.versions.write().await;
        for (engine, fetched) in fetches {
            match fetched {
                Ok(version) => {
                    debug!("Latest {} version: {}", engine.as_str(), version);
                    let history = versions.entry(engine).or_default();
                    if history.first().map(String::as_str) != Some(version.as_str()) {
                        history.retain(|v| v != &version);
                        history.insert(0, version);
                        history.truncate(VERSION_HISTORY);
                    }
                }
                Err(e) => warn!("Version fetch for {} failed: {}", engine.as_str(), e),
            }
        }

        Ok(())
    }

    /// The most recent version seen for the engine
    pub async fn current_version(&self, engine: BrowserEngine) -> Option<String> {
        self.versions
            .read()
            .await
            .get(&engine)
            .and_then(|history| history.first().cloned())
    }

    /// All retained versions, newest first
    pub async fn known_versions(&self, engine: BrowserEngine) -> Vec<String> {
        self.versions
            .read()
            .await
            .get(&engine)
            .cloned()
            .unwrap_or_default()
    }

    async fn fetch_chrome_version(&self) -> Result<String> {
        let releases: Value = self
            .http
            .get(CHROME_RELEASES_URL)
            .send()
            .await?
            .json()
            .await?;
        releases
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|release| release.get("version"))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::internal("Chrome release feed had no version"))
    }

    async fn fetch_firefox_version(&self) -> Result<String> {
        let versions: Value = self
            .http
            .get(FIREFOX_VERSIONS_URL)
            .send()
            .await?
            .json()
            .await?;
        versions
            .get("LATEST_FIREFOX_VERSION")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::internal("Firefox version feed had no LATEST_FIREFOX_VERSION"))
    }

    async fn fetch_webkit_version(&self) -> Result<String> {
        let body = self.http.get(WEBKIT_STATUS_URL).send().await?.text().await?;
        Self::extract_webkit_version(&body)
            .ok_or_else(|| Error::internal("WebKit status page had no Safari version"))
    }

    /// Pull the Safari version out of the status page markup
    fn extract_webkit_version(body: &str) -> Option<String> {
        let marker = "Safari ";
        let start = body.find(marker)? + marker.len();
        let rest = &body[start..];
        let version: String = rest
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();
        if version.is_empty() {
            None
        } else {
            Some(version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_for_os_matches_platform() {
        let ua = UserAgentRotator::random_for_os(FingerprintOs::MacOs);
        assert!(ua.contains("Macintosh") || ua.contains("Mac OS X"));

        let ua = UserAgentRotator::random_for_os(FingerprintOs::Android);
        assert!(ua.contains("Android"));
    }

    #[test]
    fn test_round_robin_cycles_platform_pool() {
        let rotator = UserAgentRotator::new();
        let pool = pool_for(FingerprintOs::Windows);

        let picked: Vec<String> = (0..pool.len())
            .map(|_| rotator.next_for_os(FingerprintOs::Windows))
            .collect();
        let expected: Vec<String> = pool.iter().map(|s| s.to_string()).collect();
        assert_eq!(picked, expected);

        // Wraps back to the front.
        assert_eq!(rotator.next_for_os(FingerprintOs::Windows), pool[0]);
    }

    #[test]
    fn test_random_returns_desktop_agent() {
        let ua = UserAgentRotator::random();
        assert!(ua.starts_with("Mozilla/5.0"));
        assert!(!ua.contains("Android"));
        assert!(!ua.contains("iPhone"));
    }

    #[test]
    fn test_extract_webkit_version() {
        let body = "<p>Shipped in Safari 18.2 and later</p>";
        assert_eq!(
            BrowserVersionManager::extract_webkit_version(body),
            Some("18.2".to_string())
        );
        assert_eq!(BrowserVersionManager::extract_webkit_version("<p></p>"), None);
    }

    #[tokio::test]
    async fn test_version_history_starts_empty() {
        let manager = BrowserVersionManager::new();
        assert!(manager
            .current_version(BrowserEngine::Chromium)
            .await
            .is_none());
        assert!(manager
            .known_versions(BrowserEngine::Firefox)
            .await
            .is_empty());
    }
}
