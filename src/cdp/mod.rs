//! Chrome DevTools Protocol layer
//!
//! WebSocket transport, typed client and browser-level control for the
//! DevTools protocol. Everything above this layer (sessions, stealth,
//! tasks) talks to traits so tests can substitute the mocks.
//!
//! - `traits`: connection/client/browser interfaces
//! - `types`: wire-format structs
//! - `connection`: WebSocket transport
//! - `client`: typed command surface
//! - `browser`: version probing and target lifecycle
//! - `mock`: scriptable test doubles

pub mod browser;
pub mod client;
pub mod connection;
pub mod mock;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod tests;

pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, CdpError, CdpEvent, CdpResponse,
    EvaluationResult, NavigationResult, TargetInfo,
};

pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::CdpWebSocketConnection;

pub use mock::{MockCdpBrowser, MockCdpClient, MockCdpConnection};
