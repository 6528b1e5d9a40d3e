//! The embedding application as seen by the platform

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use tickstats::{GcSnapshot, TickHook, TickReporter};

use crate::api::PlatformApi;
use crate::command::CommandSender;

/// Work handed to the host's asynchronous execution facility
pub type Task = BoxFuture<'static, ()>;

/// Services the host provides to the platform
///
/// Only identity and storage location are mandatory; every other capability
/// has a neutral default so small hosts stay small.
pub trait PlatformHost: Send + Sync {
    /// Version string shown in the command banner
    fn version(&self) -> String;

    /// Directory for configuration, activity log and saved artifacts
    fn plugin_directory(&self) -> PathBuf;

    /// Name the root command is registered under
    fn command_name(&self) -> String {
        "flare".to_string()
    }

    /// Run `task` in the background
    ///
    /// The default spawns onto the ambient Tokio runtime and must be called
    /// from within one.
    fn execute_async(&self, task: Task) {
        tokio::spawn(task);
    }

    /// Senders eligible for broadcast replies
    fn command_senders(&self) -> Vec<Arc<dyn CommandSender>> {
        Vec::new()
    }

    fn create_tick_hook(&self) -> Option<Arc<dyn TickHook>> {
        None
    }

    fn create_tick_reporter(&self) -> Option<Arc<dyn TickReporter>> {
        None
    }

    /// Cumulative garbage collector statistics
    fn poll_gc_statistics(&self) -> GcSnapshot {
        GcSnapshot::new()
    }

    /// Receive the API handle once the platform is enabled
    fn register_api(&self, _api: Arc<PlatformApi>) {}
}
