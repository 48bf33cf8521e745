//! Captcha solving service seam

use async_trait::async_trait;

use crate::Result;

/// A reCAPTCHA challenge as found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecaptchaChallenge {
    pub site_key: String,
    pub page_url: String,
    pub invisible: bool,
    pub enterprise: bool,
}

/// External solving service
#[async_trait]
pub trait CaptchaApi: Send + Sync {
    /// Submit the challenge and return the response token
    async fn solve_recaptcha(&self, challenge: &RecaptchaChallenge) -> Result<String>;
}
