//! TickStats - tick, GC and CPU statistics for embedded diagnostics
//!
//! A host application (typically a game server) drives one or both tick
//! producers from its main loop. Subscribers such as [`TickStatistics`]
//! receive every tick once the producer has been started.
//!
//! # Architecture
//!
//! ```text
//!     host main loop
//!          │ on_tick()                       │ on_tick(duration_ms)
//!          ▼                                 ▼
//!  ┌────────────────┐              ┌────────────────────┐
//!  │ SimpleTickHook │              │ SimpleTickReporter │
//!  └───────┬────────┘              └─────────┬──────────┘
//!          │ TickHookCallback                │ TickReporterCallback
//!          └──────────────┬──────────────────┘
//!                         ▼
//!                 ┌────────────────┐
//!                 │ TickStatistics │  rolling TPS / MSPT windows
//!                 └────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tickstats::{SimpleTickHook, TickHook, TickStatistics, TpsWindow};
//!
//! let stats = Arc::new(TickStatistics::new());
//! let hook = SimpleTickHook::new();
//! hook.add_callback(stats.clone());
//! hook.start()?;
//! hook.on_tick(); // from the host loop
//! println!("{:.2}", stats.tps(TpsWindow::Seconds5));
//! ```

mod cpu;
mod gc;
mod rolling;
mod statistics;
pub mod tick;

pub use cpu::CpuMonitor;
pub use gc::{GarbageCollectorStatistics, GcSnapshot, delta_since};
pub use rolling::RollingAverage;
pub use statistics::{DurationSummary, TPS, TickStatistics, TpsWindow};
pub use tick::{
    CallbackId, SimpleTickHook, SimpleTickReporter, TickHook, TickHookCallback, TickReporter, TickReporterCallback,
};
