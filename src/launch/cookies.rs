//! Per-bot cookie persistence
//!
//! Cookies are stored as one JSON file per bot so a relaunched bot
//! resumes with the sessions it accumulated.

use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::Result;

pub struct CookieStore {
    dir: PathBuf,
}

impl CookieStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn file_path(&self, bot_name: &str) -> PathBuf {
        self.dir.join(format!("{}_cookies.json", bot_name))
    }

    /// Persist the bot's cookies, creating the store directory if needed
    pub async fn save(&self, bot_name: &str, cookies: &[Value]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.file_path(bot_name);
        let data = serde_json::to_vec_pretty(cookies)?;
        tokio::fs::write(&path, data).await?;

        debug!("Saved {} cookies for bot {}", cookies.len(), bot_name);
        Ok(())
    }

    /// Load the bot's cookies; a missing file is an empty set
    pub async fn load(&self, bot_name: &str) -> Result<Vec<Value>> {
        let path = self.file_path(bot_name);

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(serde_json::from_slice(&data)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored cookies for bot {}", bot_name);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the bot's stored cookies; missing files are tolerated
    pub async fn delete(&self, bot_name: &str) -> Result<()> {
        let path = self.file_path(bot_name);

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("No cookie file for bot {}", bot_name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Names of bots with stored cookies
    pub async fn list_bots(&self) -> Result<Vec<String>> {
        let mut bots = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(bots),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(bot) = name.strip_suffix("_cookies.json") {
                bots.push(bot.to_string());
            }
        }

        bots.sort();
        Ok(bots)
    }
}
