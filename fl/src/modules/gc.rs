//! `gc` command

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tickstats::delta_since;

use super::CommandModule;
use super::format::format_duration;
use crate::command::{Arguments, Command, CommandExecutor, CommandResponseHandler, CommandSender, Message, RegistryError};
use crate::platform::Platform;

pub struct GcModule;

impl CommandModule for GcModule {
    fn name(&self) -> &'static str {
        "gc"
    }

    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
        sink(Command::builder().aliases(["gc"]).executor(GcCommand).build()?);
        Ok(())
    }
}

struct GcCommand;

#[async_trait]
impl CommandExecutor for GcCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        _args: &Arguments,
    ) -> Result<()> {
        let current = platform.host().poll_gc_statistics();
        if current.is_empty() {
            resp.reply_prefixed(Message::error("No garbage collector statistics are available on this platform."));
            return Ok(());
        }

        let (statistics, uptime) = match (platform.startup_gc_statistics(), platform.normal_operation_uptime()) {
            (Some(baseline), Some(uptime)) => {
                resp.reply_prefixed(Message::highlight(format!(
                    "Garbage collector statistics for the last {}:",
                    format_duration(uptime)
                )));
                (delta_since(&current, baseline), Some(uptime))
            }
            _ => {
                resp.reply_prefixed(Message::highlight("Garbage collector statistics since the process started:"));
                (current, None)
            }
        };

        for (name, stats) in &statistics {
            resp.reply(Message::info(format!("{name} collector:")));
            resp.reply(Message::plain(format!(
                "  {:.2}ms avg, {} total collections",
                stats.average_collection_time(),
                stats.collections
            )));
            if let Some(uptime) = uptime
                && stats.collections > 0
            {
                resp.reply(Message::plain(format!(
                    "  {:.1}s avg frequency",
                    stats.average_collection_frequency(uptime) / 1000.0
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSender, TestHost};

    #[tokio::test]
    async fn test_no_collectors() {
        let platform = Platform::new(Arc::new(TestHost::new())).unwrap();
        let sender = Arc::new(RecordingSender::admin());
        platform.dispatch(sender.clone(), vec!["gc".to_string()]).await;
        assert_eq!(
            sender.texts(),
            vec!["[flare] No garbage collector statistics are available on this platform."]
        );
    }

    #[tokio::test]
    async fn test_totals_before_snapshot() {
        let host = Arc::new(TestHost::new());
        host.set_gc("old", 2, 30);
        host.set_gc("young", 10, 50);
        let platform = Platform::new(host.clone()).unwrap();
        let sender = Arc::new(RecordingSender::admin());

        platform.dispatch(sender.clone(), vec!["gc".to_string()]).await;
        assert_eq!(
            sender.texts(),
            vec![
                "[flare] Garbage collector statistics since the process started:",
                "old collector:",
                "  15.00ms avg, 2 total collections",
                "young collector:",
                "  5.00ms avg, 10 total collections",
            ]
        );
    }
}
