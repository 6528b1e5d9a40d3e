//! Console host
//!
//! Hosts the platform in a standalone process: a simulated game loop drives
//! the tick producers and an interactive console issues commands with full
//! permissions.

mod repl;
mod server;

use std::path::PathBuf;
use std::sync::Arc;

use colored::{ColoredString, Colorize};
use tickstats::{GcSnapshot, TickHook, TickReporter};
use tokio::runtime::Handle;
use tracing::info;

use crate::api::PlatformApi;
use crate::command::{CommandSender, Message, Tone};
use crate::host::{PlatformHost, Task};

pub use repl::{run_repl, split_args};
pub use server::{GcSimulator, SimulatedServer};

/// The operator at the terminal
pub struct ConsoleSender;

impl CommandSender for ConsoleSender {
    fn name(&self) -> String {
        "Console".to_string()
    }

    fn has_permission(&self, _node: &str) -> bool {
        true
    }

    fn reply(&self, message: Message) {
        println!("{}", paint(&message));
    }
}

/// Colour a message by its tone
pub fn paint(message: &Message) -> ColoredString {
    let text = message.text.as_str();
    match message.tone {
        Tone::Plain => text.normal(),
        Tone::Info => text.cyan(),
        Tone::Highlight => text.yellow().bold(),
        Tone::Success => text.green(),
        Tone::Warning => text.bright_yellow(),
        Tone::Error => text.red(),
    }
}

/// Host backed by a [`SimulatedServer`]
pub struct ConsoleHost {
    plugin_dir: PathBuf,
    runtime: Handle,
    server: Arc<SimulatedServer>,
    console: Arc<ConsoleSender>,
}

impl ConsoleHost {
    pub fn new(plugin_dir: PathBuf, runtime: Handle, server: Arc<SimulatedServer>) -> Self {
        Self {
            plugin_dir,
            runtime,
            server,
            console: Arc::new(ConsoleSender),
        }
    }

    pub fn console(&self) -> Arc<ConsoleSender> {
        Arc::clone(&self.console)
    }
}

impl PlatformHost for ConsoleHost {
    fn version(&self) -> String {
        crate::VERSION.to_string()
    }

    fn plugin_directory(&self) -> PathBuf {
        self.plugin_dir.clone()
    }

    fn execute_async(&self, task: Task) {
        self.runtime.spawn(task);
    }

    fn command_senders(&self) -> Vec<Arc<dyn CommandSender>> {
        let console: Arc<dyn CommandSender> = self.console.clone();
        vec![console]
    }

    fn create_tick_hook(&self) -> Option<Arc<dyn TickHook>> {
        let hook: Arc<dyn TickHook> = self.server.hook();
        Some(hook)
    }

    fn create_tick_reporter(&self) -> Option<Arc<dyn TickReporter>> {
        let reporter: Arc<dyn TickReporter> = self.server.reporter();
        Some(reporter)
    }

    fn poll_gc_statistics(&self) -> GcSnapshot {
        self.server.gc_statistics()
    }

    fn register_api(&self, _api: Arc<PlatformApi>) {
        info!("Platform API available to the console host");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(paint(&Message::error("boom")).to_string(), "boom");
        assert_eq!(paint(&Message::plain("ok")).to_string(), "ok");
    }

    #[tokio::test]
    async fn test_console_host_capabilities() {
        let server = Arc::new(SimulatedServer::new(20));
        let host = ConsoleHost::new(PathBuf::from("/tmp/flare"), Handle::current(), server);
        assert!(host.create_tick_hook().is_some());
        assert!(host.create_tick_reporter().is_some());
        assert_eq!(host.command_senders().len(), 1);
        assert!(host.command_senders()[0].has_permission("flare.anything"));
        assert_eq!(host.command_name(), "flare");
    }
}
