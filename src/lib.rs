//! Botweaver: browser bot fleet engine
//!
//! Drives fleets of browser bots over the Chrome DevTools Protocol:
//! priority-scheduled task execution, human behavior simulation,
//! fingerprint-based identity management, proxy rotation and captcha
//! solving.

pub mod bot;
pub mod config;
pub mod error;

pub mod captcha;
pub mod cdp;
pub mod launch;
pub mod proxy;
pub mod session;
pub mod stealth;
pub mod tasks;

// Re-exports
pub use error::{Error, Result};

/// Botweaver library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
