//! Task layer
//!
//! - `action`: tagged interaction steps
//! - `traits`: task and factory interfaces
//! - `registry`: type-tag to factory mapping
//! - `manager`: priority queue and bounded executor
//! - `google_search` / `web_scraping`: built-in task types

pub mod action;
pub mod google_search;
pub mod manager;
pub mod registry;
pub mod traits;
pub mod web_scraping;


pub use action::{run_actions, Action};
pub use manager::{TaskManager, TaskStatus, TaskTicket};
pub use registry::TaskRegistry;
pub use traits::{Task, TaskContext, TaskFactory, TaskSpec};
