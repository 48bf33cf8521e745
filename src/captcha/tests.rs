//! Captcha layer tests

use super::mock::MockCaptchaApi;
use super::solver::CaptchaSolver;
use crate::cdp::EvaluationResult;
use crate::session::{MockPageSession, PageSession};
use std::sync::Arc;

const SITE_KEY: &str = "6LcAbCdEfGhIjKlMnOpQrStUvWxYz";

async fn page_with_challenge() -> Arc<MockPageSession> {
    let page = MockPageSession::new();
    page.set_url("https://target.example/login").await;

    let cdp = page.mock_cdp();
    cdp.on_eval("api2/anchor", EvaluationResult::Bool(true)).await;
    cdp.on_eval(
        "data-sitekey",
        EvaluationResult::String(SITE_KEY.to_string()),
    )
    .await;
    cdp.on_eval("enterprise.js", EvaluationResult::Bool(true)).await;

    page
}

#[tokio::test]
async fn test_detect_challenge_frame() {
    let page = page_with_challenge().await;
    let solver = CaptchaSolver::new(MockCaptchaApi::new());

    let page_dyn = Arc::clone(&page) as Arc<dyn PageSession>;
    assert!(solver.detect(&page_dyn).await.unwrap());

    // A page without the frame reports no challenge.
    let clean = MockPageSession::new() as Arc<dyn PageSession>;
    assert!(!solver.detect(&clean).await.unwrap());
}

#[tokio::test]
async fn test_inspect_builds_challenge() {
    let page = page_with_challenge().await as Arc<dyn PageSession>;
    let solver = CaptchaSolver::new(MockCaptchaApi::new());

    let challenge = solver.inspect(&page).await.unwrap();
    assert_eq!(challenge.site_key, SITE_KEY);
    assert_eq!(challenge.page_url, "https://target.example/login");
    assert!(challenge.enterprise);
    assert!(!challenge.invisible);
}

#[tokio::test]
async fn test_inspect_without_site_key_errors() {
    let page = MockPageSession::new() as Arc<dyn PageSession>;
    let solver = CaptchaSolver::new(MockCaptchaApi::new());

    let result = solver.inspect(&page).await;
    assert!(matches!(result, Err(crate::Error::Captcha(_))));
}

#[tokio::test]
async fn test_solve_injects_token() {
    let page = page_with_challenge().await;
    let api = MockCaptchaApi::new();
    api.set_token("resolved-response-token").await;
    let solver = CaptchaSolver::new(Arc::clone(&api) as Arc<dyn super::CaptchaApi>);

    let page_dyn = Arc::clone(&page) as Arc<dyn PageSession>;
    let token = solver.solve(&page_dyn).await.unwrap();
    assert_eq!(token, "resolved-response-token");

    let challenges = api.challenges.lock().await;
    assert_eq!(challenges.len(), 1);
    assert_eq!(challenges[0].site_key, SITE_KEY);

    let scripts = page.mock_cdp().evaluated_scripts().await;
    let injection = scripts
        .iter()
        .find(|s| s.contains("g-recaptcha-response"))
        .expect("token injection script");
    assert!(injection.contains("resolved-response-token"));
}

#[tokio::test]
async fn test_solve_propagates_api_failure() {
    let page = page_with_challenge().await as Arc<dyn PageSession>;
    let api = MockCaptchaApi::new();
    api.fail();
    let solver = CaptchaSolver::new(api as Arc<dyn super::CaptchaApi>);

    let result = solver.solve(&page).await;
    assert!(matches!(result, Err(crate::Error::Captcha(_))));
}
