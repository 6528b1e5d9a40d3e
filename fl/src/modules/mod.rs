//! Built-in command modules
//!
//! Each module contributes one or more commands and owns whatever background
//! state those commands start (a profiling session, a tick monitor).

mod activity;
mod format;
mod gc;
mod health;
mod profiler;
mod tick_monitoring;

use eyre::Result;

use crate::command::{Command, RegistryError};

pub use activity::ActivityLogModule;
pub use gc::GcModule;
pub use health::HealthModule;
pub use profiler::ProfilerModule;
pub use tick_monitoring::{ReportPredicate, TickMonitor, TickMonitoringModule};

/// A group of related commands sharing setup and teardown
pub trait CommandModule: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Hand every command of this module to `sink`, in listing order
    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError>;

    /// Release background resources; calling it again is a no-op
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Built-in modules in listing order
pub fn default_modules() -> Vec<Box<dyn CommandModule>> {
    vec![
        Box::new(ProfilerModule::new()),
        Box::new(HealthModule),
        Box::new(TickMonitoringModule::new()),
        Box::new(GcModule),
        Box::new(ActivityLogModule),
    ]
}
