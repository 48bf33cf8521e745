//! Proxy rotation and health checking

pub mod health;
pub mod mock;
pub mod rotator;
pub mod traits;

#[cfg(test)]
mod tests;

pub use health::{HttpProxyTransport, ProxyHealthChecker};
pub use mock::MockProxyTransport;
pub use rotator::ProxyRotator;
pub use traits::ProxyTransport;
