//! Configuration management for Botweaver

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// CDP WebSocket endpoint of the browser to attach to
    pub cdp_endpoint: String,

    /// Maximum concurrently running tasks per manager
    pub max_concurrent_tasks: usize,

    /// Task retry budget
    pub task_max_retries: u32,

    /// Fixed backoff between task retries in milliseconds
    pub task_retry_delay: u64,

    /// Network-idle readiness gate before task execution, in milliseconds
    pub page_load_timeout: u64,

    /// Navigation timeout in milliseconds
    pub navigation_timeout: u64,

    /// Enable stealth (fingerprint + evasion scripts) by default
    pub stealth_enabled: bool,

    /// Captcha solving service endpoint
    pub captcha_api_url: String,

    /// Captcha solving service API key
    pub captcha_api_key: Option<String>,

    /// Directory for per-bot cookie snapshots
    pub cookie_dir: String,

    /// Log level
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cdp_endpoint: "ws://localhost:9222".to_string(),
            max_concurrent_tasks: 5,
            task_max_retries: 3,
            task_retry_delay: 5000,
            page_load_timeout: 30000,
            navigation_timeout: 60000,
            stealth_enabled: true,
            captcha_api_url: "https://api.2captcha.com".to_string(),
            captcha_api_key: None,
            cookie_dir: "cookies".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(endpoint) = env::var("BOTWEAVER_CDP_ENDPOINT") {
            config.cdp_endpoint = endpoint;
        }

        if let Ok(max_tasks) = env::var("BOTWEAVER_MAX_CONCURRENT_TASKS") {
            config.max_concurrent_tasks = max_tasks
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_MAX_CONCURRENT_TASKS"))?;
        }

        if let Ok(retries) = env::var("BOTWEAVER_TASK_MAX_RETRIES") {
            config.task_max_retries = retries
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_TASK_MAX_RETRIES"))?;
        }

        if let Ok(delay) = env::var("BOTWEAVER_TASK_RETRY_DELAY") {
            config.task_retry_delay = delay
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_TASK_RETRY_DELAY"))?;
        }

        if let Ok(timeout) = env::var("BOTWEAVER_PAGE_LOAD_TIMEOUT") {
            config.page_load_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_PAGE_LOAD_TIMEOUT"))?;
        }

        if let Ok(timeout) = env::var("BOTWEAVER_NAVIGATION_TIMEOUT") {
            config.navigation_timeout = timeout
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_NAVIGATION_TIMEOUT"))?;
        }

        if let Ok(stealth) = env::var("BOTWEAVER_STEALTH") {
            config.stealth_enabled = stealth
                .parse()
                .map_err(|_| Error::configuration("Invalid BOTWEAVER_STEALTH"))?;
        }

        if let Ok(url) = env::var("BOTWEAVER_CAPTCHA_API_URL") {
            config.captcha_api_url = url;
        }

        if let Ok(key) = env::var("BOTWEAVER_CAPTCHA_API_KEY") {
            config.captcha_api_key = Some(key);
        }

        if let Ok(dir) = env::var("BOTWEAVER_COOKIE_DIR") {
            config.cookie_dir = dir;
        }

        if let Ok(log_level) = env::var("BOTWEAVER_LOG_LEVEL") {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::configuration(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::configuration(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.task_max_retries, 3);
        assert_eq!(config.task_retry_delay, 5000);
        assert!(config.stealth_enabled);
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            cdp_endpoint = "ws://127.0.0.1:9333"
            max_concurrent_tasks = 2
            task_max_retries = 1
            task_retry_delay = 100
            page_load_timeout = 1000
            navigation_timeout = 2000
            stealth_enabled = false
            captcha_api_url = "https://solver.example"
            cookie_dir = "/tmp/cookies"
            log_level = "debug"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cdp_endpoint, "ws://127.0.0.1:9333");
        assert_eq!(config.max_concurrent_tasks, 2);
        assert!(!config.stealth_enabled);
        assert!(config.captcha_api_key.is_none());
    }
}
