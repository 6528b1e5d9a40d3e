//! Platform coordinator
//!
//! The [`Platform`] owns the command registry and execution lock, the tick
//! producers and their statistics, and the enable/disable lifecycle:
//! - **Dispatch:** resolve, permission-check and run commands one at a time
//! - **Completion:** suggest aliases and flags without running anything
//! - **Lifecycle:** `Created → Enabled → Disabled`, each transition once

mod core;
mod error;
mod lifecycle;

pub use core::{Platform, StartupSnapshot};
pub use error::PlatformError;
pub use lifecycle::{Lifecycle, LifecycleState};
