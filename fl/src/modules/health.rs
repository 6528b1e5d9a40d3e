//! `tps` and `health` commands

use std::sync::Arc;

use async_trait::async_trait;
use eyre::Result;
use tickstats::{CpuMonitor, TickStatistics, TpsWindow, delta_since};
use tracing::debug;

use super::CommandModule;
use super::format::{format_duration, format_durations, format_load, format_tps};
use crate::command::{Arguments, Command, CommandExecutor, CommandResponseHandler, CommandSender, Message, RegistryError};
use crate::platform::Platform;

pub struct HealthModule;

impl CommandModule for HealthModule {
    fn name(&self) -> &'static str {
        "health"
    }

    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
        sink(Command::builder().aliases(["tps"]).executor(TpsCommand).build()?);
        sink(
            Command::builder()
                .aliases(["health", "healthreport", "hr"])
                .executor(HealthReportCommand)
                .build()?,
        );
        Ok(())
    }
}

struct TpsCommand;

#[async_trait]
impl CommandExecutor for TpsCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        _args: &Arguments,
    ) -> Result<()> {
        debug!("TpsCommand::execute: called");
        let Some(statistics) = platform.tick_statistics() else {
            resp.reply_prefixed(Message::error("TPS data is not available on this platform."));
            return Ok(());
        };

        report_tps(resp, statistics, &TpsWindow::ALL);
        report_durations(resp, statistics);
        report_cpu(resp);
        Ok(())
    }
}

struct HealthReportCommand;

#[async_trait]
impl CommandExecutor for HealthReportCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        _args: &Arguments,
    ) -> Result<()> {
        debug!("HealthReportCommand::execute: called");
        resp.reply_prefixed(Message::highlight("Generating server health report..."));

        match platform.normal_operation_uptime() {
            Some(uptime) => resp.reply(Message::info(format!("Uptime: {}", format_duration(uptime)))),
            None => resp.reply(Message::info("Uptime: not yet available")),
        }

        if let Some(statistics) = platform.tick_statistics() {
            report_tps(resp, statistics, &[TpsWindow::Seconds10, TpsWindow::Minutes1]);
            report_durations(resp, statistics);
        }
        report_cpu(resp);

        let current = platform.host().poll_gc_statistics();
        if !current.is_empty() {
            let since_startup = match platform.startup_gc_statistics() {
                Some(baseline) => delta_since(&current, baseline),
                None => current,
            };
            let collections: u64 = since_startup.values().map(|s| s.collections).sum();
            let time_ms: u64 = since_startup.values().map(|s| s.time_ms).sum();
            resp.reply(Message::info("Garbage collection since startup:"));
            resp.reply(Message::plain(format!(" {collections} collections, {time_ms}ms total")));
        }
        Ok(())
    }
}

fn report_tps(resp: &CommandResponseHandler, statistics: &TickStatistics, windows: &[TpsWindow]) {
    let labels: Vec<&str> = windows.iter().map(|w| w.label()).collect();
    let values: Vec<String> = windows.iter().map(|w| format_tps(statistics.tps(*w))).collect();
    resp.reply(Message::info(format!("TPS from last {}:", labels.join(", "))));
    resp.reply(Message::plain(format!(" {}", values.join(", "))));
}

fn report_durations(resp: &CommandResponseHandler, statistics: &TickStatistics) {
    if let (Some(short), Some(long)) = (statistics.duration_10s(), statistics.duration_1m()) {
        resp.reply(Message::info("Tick durations (min/med/95%ile/max ms) from last 10s, 1m:"));
        resp.reply(Message::plain(format!(
            " {};  {}",
            format_durations(&short),
            format_durations(&long)
        )));
    }
}

fn report_cpu(resp: &CommandResponseHandler) {
    if let Some(monitor) = CpuMonitor::get() {
        resp.reply(Message::info("CPU usage from last 10s, 1m, 15m:"));
        resp.reply(Message::plain(format!(
            " {}, {}, {} (process)",
            format_load(monitor.process_load_10s()),
            format_load(monitor.process_load_1m()),
            format_load(monitor.process_load_15m())
        )));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSender, TestHost};

    #[tokio::test]
    async fn test_tps_without_producers() {
        let platform = Platform::new(Arc::new(TestHost::new())).unwrap();
        let sender = Arc::new(RecordingSender::admin());
        platform.dispatch(sender.clone(), vec!["tps".to_string()]).await;
        assert_eq!(sender.texts(), vec!["[flare] TPS data is not available on this platform."]);
    }

    #[tokio::test]
    async fn test_tps_reports_windows_and_durations() {
        let host = Arc::new(TestHost::with_producers());
        let platform = Platform::new(host.clone()).unwrap();
        let statistics = platform.tick_statistics().unwrap().clone();
        statistics.record_duration(50.0);

        let sender = Arc::new(RecordingSender::admin());
        platform.dispatch(sender.clone(), vec!["tps".to_string()]).await;

        let texts = sender.texts();
        assert_eq!(texts[0], "TPS from last 5s, 10s, 1m, 5m, 15m:");
        assert_eq!(texts[1], " 20.00, 20.00, 20.00, 20.00, 20.00");
        assert_eq!(texts[2], "Tick durations (min/med/95%ile/max ms) from last 10s, 1m:");
        assert_eq!(texts[3], " 50.0/50.0/50.0/50.0;  50.0/50.0/50.0/50.0");
    }

    #[tokio::test]
    async fn test_health_report_by_alias() {
        let host = Arc::new(TestHost::with_producers());
        host.set_gc("young", 4, 20);
        let platform = Platform::new(host.clone()).unwrap();

        let sender = Arc::new(RecordingSender::with_permissions(&["flare.health"]));
        platform.dispatch(sender.clone(), vec!["HR".to_string()]).await;

        let texts = sender.texts();
        assert_eq!(texts[0], "[flare] Generating server health report...");
        assert_eq!(texts[1], "Uptime: not yet available");
        assert_eq!(texts[2], "TPS from last 10s, 1m:");
        assert!(texts.contains(&" 4 collections, 20ms total".to_string()));
    }
}
