//! Per-bot Cache Storage persistence
//!
//! Snapshots the page's `window.caches` entries into one JSON file per
//! bot and replays them through an init script on the next launch, so a
//! relaunched bot keeps its warmed cache alongside its cookies.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

/// Enumerates every cache and its entries as `{name: [{url, data, options}]}`
pub const CACHE_SNAPSHOT_SCRIPT: &str = r#"(async () => {
    if (!window.caches) return null;

    const cacheNames = await window.caches.keys();
    const cacheData = {};

    for (const cacheName of cacheNames) {
        const cache = await window.caches.open(cacheName);
        const requests = await cache.keys();
        cacheData[cacheName] = await Promise.all(
            requests.map(async (request) => {
                const response = await cache.match(request);
                return {
                    url: request.url,
                    data: await response?.text(),
                    options: {
                        status: response?.status,
                        statusText: response?.statusText,
                        headers: Object.fromEntries(response?.headers || []),
                    },
                };
            })
        );
    }

    return cacheData;
})()"#;

/// Init script replaying a saved snapshot into `window.caches`
pub fn restore_script(snapshot: &Value) -> String {
    format!(
        r#"((cacheData) => {{
    if (!window.caches) return;
    Object.keys(cacheData).forEach(async (cacheName) => {{
        const cache = await window.caches.open(cacheName);
        for (const entry of cacheData[cacheName]) {{
            await cache.put(new Request(entry.url), new Response(entry.data, entry.options));
        }}
    }});
}})({})"#,
        snapshot
    )
}

pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn file_path(&self, bot_name: &str) -> PathBuf {
        self.dir.join(format!("{}_cache.json", bot_name))
    }

    /// Persist the bot's cache snapshot, creating the directory if needed
    pub async fn save(&self, bot_name: &str, snapshot: &Value) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.file_path(bot_name);
        let data = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&path, data).await?;

        let entries = snapshot.as_object().map(|m| m.len()).unwrap_or(0);
        debug!("Saved {} cache buckets for bot {}", entries, bot_name);
        Ok(())
    }

    /// Load the bot's snapshot; a missing file is an empty snapshot
    pub async fn load(&self, bot_name: &str) -> Result<Value> {
        let path = self.file_path(bot_name);

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored cache for bot {}", bot_name);
                Ok(Value::Object(serde_json::Map::new()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the bot's stored snapshot; missing files are tolerated
    pub async fn delete(&self, bot_name: &str) -> Result<()> {
        let path = self.file_path(bot_name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No cache file for bot {}", bot_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
