//! 2captcha-compatible API client
//!
//! Speaks the createTask/getTaskResult protocol: one POST to enqueue
//! the challenge, then polling until the worker farm produces a token.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::captcha::traits::{CaptchaApi, RecaptchaChallenge};
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(5);
const SOLVE_TIMEOUT: Duration = Duration::from_secs(120);

pub struct TwoCaptchaClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl TwoCaptchaClient {
    pub fn new<S: Into<String>>(base_url: S, api_key: S) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response: Value = self.http.post(&url).json(&body).send().await?.json().await?;

        let error_id = response.get("errorId").and_then(|v| v.as_i64()).unwrap_or(0);
        if error_id != 0 {
            let code = response
                .get("errorCode")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            return Err(Error::captcha(format!("API error {}: {}", error_id, code)));
        }

        Ok(response)
    }

    async fn create_task(&self, challenge: &RecaptchaChallenge) -> Result<u64> {
        let task_type = if challenge.enterprise {
            "RecaptchaV2EnterpriseTaskProxyless"
        } else {
            "RecaptchaV2TaskProxyless"
        };

        let response = self
            .post(
                "createTask",
                json!({
                    "clientKey": self.api_key,
                    "task": {
                        "type": task_type,
                        "websiteURL": challenge.page_url,
                        "websiteKey": challenge.site_key,
                        "isInvisible": challenge.invisible,
                    }
                }),
            )
            .await?;

        response
            .get("taskId")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::captcha("createTask response had no taskId"))
    }

    async fn poll_result(&self, task_id: u64) -> Result<String> {
        let deadline = tokio::time::Instant::now() + SOLVE_TIMEOUT;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;

            let response = self
                .post(
                    "getTaskResult",
                    json!({ "clientKey": self.api_key, "taskId": task_id }),
                )
                .await?;

            let status = response.get("status").and_then(|v| v.as_str()).unwrap_or("");
            match status {
                "ready" => {
                    return response
                        .get("solution")
                        .and_then(|s| s.get("gRecaptchaResponse"))
                        .and_then(|v| v.as_str())
                        .map(str::to_string)
                        .ok_or_else(|| Error::captcha("Solved task had no token"));
                }
                "processing" => debug!("Task {} still processing", task_id),
                other => {
                    return Err(Error::captcha(format!(
                        "Unexpected task status: {}",
                        other
                    )))
                }
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::captcha("Solving timed out"));
            }
        }
    }
}

#[async_trait]
impl CaptchaApi for TwoCaptchaClient {
    async fn solve_recaptcha(&self, challenge: &RecaptchaChallenge) -> Result<String> {
        let task_id = self.create_task(challenge).await?;
        debug!("Created solving task {}", task_id);
        self.poll_result(task_id).await
    }
}
