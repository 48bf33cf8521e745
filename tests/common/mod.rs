//! Shared helpers for the integration tests

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use botweaver::bot::BotIdentity;
use botweaver::config::Config;
use botweaver::launch::{BrowserProvider, Launcher};
use botweaver::session::{BrowserSession, MockBrowserSession, SessionRegistry};
use botweaver::Result;

/// Provider handing out one prepared mock session
pub struct MockProvider {
    pub session: Arc<MockBrowserSession>,
}

#[async_trait]
impl BrowserProvider for MockProvider {
    async fn connect(&self, _bot: &BotIdentity) -> Result<Arc<dyn BrowserSession>> {
        Ok(Arc::clone(&self.session) as Arc<dyn BrowserSession>)
    }
}

/// Config pointed at a fresh temp directory for persistence
pub fn test_config() -> Config {
    Config {
        cookie_dir: std::env::temp_dir()
            .join(format!("botweaver-e2e-{}", Uuid::new_v4()))
            .to_string_lossy()
            .to_string(),
        ..Default::default()
    }
}

pub fn test_launcher(session: Arc<MockBrowserSession>, config: Config) -> Arc<Launcher> {
    Arc::new(Launcher::new(
        config,
        Arc::new(MockProvider { session }),
        SessionRegistry::new(),
    ))
}
