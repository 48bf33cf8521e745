//! Mock solving service

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::captcha::traits::{CaptchaApi, RecaptchaChallenge};
use crate::{Error, Result};

/// Scripted solver recording the challenges it receives
#[derive(Debug)]
pub struct MockCaptchaApi {
    token: Mutex<String>,
    failing: AtomicBool,
    pub challenges: Mutex<Vec<RecaptchaChallenge>>,
}

impl MockCaptchaApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            token: Mutex::new("mock-token".to_string()),
            failing: AtomicBool::new(false),
            challenges: Mutex::new(Vec::new()),
        })
    }

    pub async fn set_token(&self, token: &str) {
        let mut current = self.token.lock().await;
        *current = token.to_string();
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptchaApi for MockCaptchaApi {
    async fn solve_recaptcha(&self, challenge: &RecaptchaChallenge) -> Result<String> {
        let mut challenges = self.challenges.lock().await;
        challenges.push(challenge.clone());

        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::captcha("solver unavailable (injected)"));
        }

        Ok(self.token.lock().await.clone())
    }
}
