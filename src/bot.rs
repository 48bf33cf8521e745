//! Boundary DTOs consumed and produced by the engine
//!
//! Bot, proxy and task records are created by external collaborators
//! (persistence, HTTP routing) and treated as opaque data here.

use serde::{Deserialize, Serialize};

/// Browser engine selector for a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserEngine {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserEngine {
    /// Parse an engine name, defaulting to chromium for unknown values
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "firefox" => BrowserEngine::Firefox,
            "webkit" => BrowserEngine::Webkit,
            _ => BrowserEngine::Chromium,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserEngine::Chromium => "chromium",
            BrowserEngine::Firefox => "firefox",
            BrowserEngine::Webkit => "webkit",
        }
    }
}

/// Bot record read at launch time to parametrize context creation.
///
/// Immutable once a session is launched; a new fingerprint may still be
/// regenerated per launch by the owning FingerprintManager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    pub name: String,
    /// Device class label matched against the emulation preset table
    pub device: String,
    pub browser: BrowserEngine,
    pub os: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyUpstream>,
}

impl BotIdentity {
    pub fn new<S: Into<String>>(name: S, browser: BrowserEngine) -> Self {
        Self {
            name: name.into(),
            device: "Desktop Chrome".to_string(),
            browser,
            os: "Windows".to_string(),
            category: "default".to_string(),
            proxy: None,
        }
    }
}

/// Upstream proxy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyUpstream {
    pub host: String,
    pub port: u16,
    /// "http" or "https"
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl ProxyUpstream {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            protocol: "http".to_string(),
            username: None,
            password: None,
            enabled: true,
        }
    }

    /// Proxy URL without credentials
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

/// Task record as exchanged with external collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub parameters: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<crate::tasks::Action>,
    #[serde(default)]
    pub priority: i32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}
