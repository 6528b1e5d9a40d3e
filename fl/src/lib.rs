//! Flare - in-process diagnostics coordinator
//!
//! Flare lives inside a long-running host (a game server) and gives its
//! operators a small set of diagnostic commands: a tick profiler, health and
//! TPS reports, a slow-tick monitor, GC statistics and an activity log.
//!
//! # Core Concepts
//!
//! - **Platform**: owns the command registry, the execution lock and the
//!   enable/disable lifecycle
//! - **Host**: the embedding application, seen through [`host::PlatformHost`]
//! - **Sender**: whoever issued a command, seen through
//!   [`command::CommandSender`]
//! - **Producers**: tick hook and tick reporter from `tickstats`, feeding
//!   [`tickstats::TickStatistics`]
//!
//! # Modules
//!
//! - [`platform`] - Coordinator, lifecycle and errors
//! - [`command`] - Command descriptors, arguments, dispatch and completion
//! - [`modules`] - Built-in command modules
//! - [`api`] - Process-wide read-only statistics handle
//! - [`config`] - Configuration types and loading
//! - [`console`] - Console host used by the `fl` binary

pub mod activity;
pub mod api;
pub mod bytebin;
pub mod cli;
pub mod command;
pub mod config;
pub mod console;
pub mod host;
pub mod modules;
pub mod platform;

#[cfg(test)]
pub(crate) mod testing;

pub use api::PlatformApi;
pub use command::{CommandSender, Message, Tone};
pub use config::Config;
pub use host::PlatformHost;
pub use platform::{Platform, PlatformError};

/// Version reported in the command banner
pub const VERSION: &str = env!("GIT_DESCRIBE");
