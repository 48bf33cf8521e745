//! On-page reCAPTCHA handling

use std::sync::Arc;
use tracing::{debug, info};

use crate::captcha::traits::{CaptchaApi, RecaptchaChallenge};
use crate::cdp::EvaluationResult;
use crate::session::PageSession;
use crate::{Error, Result};

const DETECT_SCRIPT: &str = r#"document.querySelector('iframe[src^="https://www.google.com/recaptcha/api2/anchor"]') !== null"#;

const INVISIBLE_SCRIPT: &str = r#"(() => {
    const script = document.querySelector('script[src*="google.com/recaptcha/api.js"]');
    return script ? (script.getAttribute('src') || '').includes('size=invisible') : false;
})()"#;

const ENTERPRISE_SCRIPT: &str = r#"document.querySelector('script[src*="google.com/recaptcha/enterprise.js"]') !== null"#;

const SITE_KEY_SCRIPT: &str = r#"(() => {
    const element = document.querySelector('.g-recaptcha');
    return element ? element.getAttribute('data-sitekey') : null;
})()"#;

/// Detects, solves and answers reCAPTCHA challenges on a page
pub struct CaptchaSolver {
    api: Arc<dyn CaptchaApi>,
}

impl CaptchaSolver {
    pub fn new(api: Arc<dyn CaptchaApi>) -> Self {
        Self { api }
    }

    /// Whether the page currently shows a challenge frame
    pub async fn detect(&self, page: &Arc<dyn PageSession>) -> Result<bool> {
        Ok(page.evaluate(DETECT_SCRIPT, false).await?.is_truthy())
    }

    /// Describe the challenge on the page.
    ///
    /// Fails when no site key can be extracted.
    pub async fn inspect(&self, page: &Arc<dyn PageSession>) -> Result<RecaptchaChallenge> {
        let site_key = match page.evaluate(SITE_KEY_SCRIPT, false).await? {
            EvaluationResult::String(key) if !key.is_empty() => key,
            _ => return Err(Error::captcha("No reCAPTCHA site key found on page")),
        };

        let invisible = page.evaluate(INVISIBLE_SCRIPT, false).await?.is_truthy();
        let enterprise = page.evaluate(ENTERPRISE_SCRIPT, false).await?.is_truthy();
        let page_url = page.current_url().await?;

        Ok(RecaptchaChallenge {
            site_key,
            page_url,
            invisible,
            enterprise,
        })
    }

    /// Solve the challenge on the page and inject the token.
    ///
    /// Returns the response token on success.
    pub async fn solve(&self, page: &Arc<dyn PageSession>) -> Result<String> {
        let challenge = self.inspect(page).await?;
        debug!(
            "Solving challenge for {} (invisible: {}, enterprise: {})",
            challenge.page_url, challenge.invisible, challenge.enterprise
        );

        let token = self.api.solve_recaptcha(&challenge).await?;
        self.inject_token(page, &token).await?;

        info!("Challenge solved for {}", challenge.page_url);
        Ok(token)
    }

    /// Place the token where the page expects it and fire the callback
    async fn inject_token(&self, page: &Arc<dyn PageSession>, token: &str) -> Result<()> {
        let encoded = serde_json::Value::String(token.to_string()).to_string();
        let script = format!(
            r#"(function() {{
                const token = {token};
                const area = document.querySelector('#g-recaptcha-response')
                    || document.querySelector('textarea[name="g-recaptcha-response"]');
                if (area) {{
                    area.style.display = 'block';
                    area.value = token;
                }}
                if (window.grecaptcha && window.grecaptcha.enterprise) {{
                    window.grecaptcha.enterprise.execute(token);
                }} else if (window.grecaptcha) {{
                    window.grecaptcha.execute(token);
                }}
            }})();"#,
            token = encoded,
        );

        page.evaluate(&script, false).await?;
        Ok(())
    }
}
