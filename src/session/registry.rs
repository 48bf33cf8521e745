//! Session registry
//!
//! Central ownership of live browser sessions, keyed by session id.
//! Components hold the id and look the session up when they need it;
//! termination removes the entry and closes everything it owns.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::session::traits::BrowserSession;
use crate::Error;

/// Registry of live sessions
#[derive(Debug, Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<dyn BrowserSession>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session, returning its id
    pub async fn register(&self, session: Arc<dyn BrowserSession>) -> String {
        let id = session.id().to_string();
        info!("Registering session {} ({})", id, session.bot_name());

        let mut sessions = self.sessions.write().await;
        sessions.insert(id.clone(), session);
        id
    }

    pub async fn get(&self, id: &str) -> Result<Arc<dyn BrowserSession>, Error> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::session_not_found(id))
    }

    /// Find the session belonging to a bot
    pub async fn find_by_bot(&self, bot_name: &str) -> Option<Arc<dyn BrowserSession>> {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .find(|s| s.bot_name() == bot_name)
            .cloned()
    }

    /// Remove and close a session
    pub async fn terminate(&self, id: &str) -> Result<(), Error> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(id)
                .ok_or_else(|| Error::session_not_found(id))?
        };

        info!("Terminating session {} ({})", id, session.bot_name());
        session.close().await
    }

    pub async fn list(&self) -> Vec<String> {
        let sessions = self.sessions.read().await;
        sessions.keys().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions whose browser is no longer reachable
    pub async fn cleanup(&self) -> usize {
        let ids: Vec<String> = {
            let sessions = self.sessions.read().await;
            sessions.keys().cloned().collect()
        };

        let mut removed = 0;
        for id in ids {
            let session = {
                let sessions = self.sessions.read().await;
                sessions.get(&id).cloned()
            };

            if let Some(session) = session {
                if !session.is_connected().await {
                    warn!("Session {} lost its browser, removing", id);
                    let mut sessions = self.sessions.write().await;
                    sessions.remove(&id);
                    removed += 1;
                }
            }
        }

        removed
    }
}
