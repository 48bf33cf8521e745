//! Captcha detection and solving

pub mod client;
pub mod mock;
pub mod solver;
pub mod traits;

#[cfg(test)]
mod tests;

pub use client::TwoCaptchaClient;
pub use mock::MockCaptchaApi;
pub use solver::CaptchaSolver;
pub use traits::{CaptchaApi, RecaptchaChallenge};
