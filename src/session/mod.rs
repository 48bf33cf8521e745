//! Session layer
//!
//! Browser sessions (one per bot) and the pages they own, plus the
//! registry that keeps ownership of every live session in one place.
//!
//! - `traits`: session and page interfaces
//! - `browser`: CDP-backed session
//! - `page`: selector-level page operations
//! - `registry`: live-session ownership
//! - `mock`: in-memory doubles

pub mod browser;
pub mod mock;
pub mod page;
pub mod registry;
pub mod traits;

#[cfg(test)]
pub mod tests;

pub use browser::BrowserSessionImpl;
pub use page::PageSessionImpl;
pub use registry::SessionRegistry;
pub use traits::{BrowserSession, PageOptions, PageSession};

pub use mock::{MockBrowserSession, MockPageSession};
