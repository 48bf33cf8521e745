//! Anti-detection layer
//!
//! - `fingerprint`: identity generation and per-session caching
//! - `evasion`: init scripts that present the identity to page scripts
//! - `behavior`: human-like mouse/scroll simulation
//! - `user_agent`: UA rotation and browser version tracking

pub mod behavior;
pub mod evasion;
pub mod fingerprint;
pub mod user_agent;


pub use behavior::{bezier_path, BehaviorSimulator, SimulatorOptions, SimulatorState};
pub use evasion::evasion_scripts;
pub use fingerprint::{Fingerprint, FingerprintManager, FingerprintOs};
pub use user_agent::{BrowserVersionManager, UserAgentRotator};
