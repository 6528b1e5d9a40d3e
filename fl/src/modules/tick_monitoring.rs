//! `tickmonitor` command
//!
//! Measures the time between tick hook callbacks. The first `warmup` ticks
//! fix an average; afterwards every tick matching the report predicate is
//! broadcast to the operator who started the monitor and to permitted
//! senders.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use eyre::Result;
use tickstats::{CallbackId, TickHook, TickHookCallback};
use tracing::{debug, info};

use super::CommandModule;
use crate::command::{Arguments, Command, CommandExecutor, CommandResponseHandler, CommandSender, Message, RegistryError};
use crate::platform::Platform;

/// When a tick is worth reporting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportPredicate {
    /// Duration exceeds the average by more than this percentage
    PercentIncrease(f64),
    /// Duration exceeds this many milliseconds
    DurationOver(f64),
}

impl ReportPredicate {
    pub fn should_report(&self, duration_ms: f64, increase_percent: f64) -> bool {
        match *self {
            ReportPredicate::PercentIncrease(threshold) => increase_percent > threshold,
            ReportPredicate::DurationOver(threshold) => duration_ms > threshold,
        }
    }

    fn describe(&self) -> String {
        match self {
            ReportPredicate::PercentIncrease(p) => {
                format!("Reporting ticks more than {p}% slower than average.")
            }
            ReportPredicate::DurationOver(ms) => format!("Reporting ticks longer than {ms}ms."),
        }
    }
}

#[derive(Default)]
struct MonitorState {
    last_tick: Option<Instant>,
    warmup_count: u64,
    warmup_total_ms: f64,
    average_ms: Option<f64>,
}

/// Tick hook subscriber reporting slow ticks
pub struct TickMonitor {
    resp: CommandResponseHandler,
    predicate: ReportPredicate,
    warmup_ticks: u64,
    state: Mutex<MonitorState>,
}

impl TickMonitor {
    pub fn new(resp: CommandResponseHandler, predicate: ReportPredicate, warmup_ticks: u64) -> Self {
        Self {
            resp,
            predicate,
            warmup_ticks: warmup_ticks.max(1),
            state: Mutex::new(MonitorState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Account for tick `tick` observed at `now`, returning what to report
    pub fn record_tick(&self, tick: u64, now: Instant) -> Option<Message> {
        let mut state = self.state();
        let last = state.last_tick.replace(now)?;
        let duration_ms = now.saturating_duration_since(last).as_secs_f64() * 1000.0;

        let Some(average_ms) = state.average_ms else {
            state.warmup_count += 1;
            state.warmup_total_ms += duration_ms;
            if state.warmup_count < self.warmup_ticks {
                return None;
            }
            let average_ms = state.warmup_total_ms / state.warmup_count as f64;
            state.average_ms = Some(average_ms);
            debug!(average_ms, "TickMonitor::record_tick: warmup complete");
            return Some(Message::success(format!(
                "Analysis is now complete. Average tick duration: {average_ms:.2}ms"
            )));
        };

        let increase_ms = duration_ms - average_ms;
        let increase_percent = if average_ms > 0.0 {
            increase_ms / average_ms * 100.0
        } else {
            0.0
        };
        if !self.predicate.should_report(duration_ms, increase_percent) {
            return None;
        }

        Some(Message::warning(format!(
            "Tick #{tick} lasted {duration_ms:.2}ms ({increase_percent:+.0}% / {increase_ms:+.2}ms vs average {average_ms:.2}ms)"
        )))
    }
}

impl TickHookCallback for TickMonitor {
    fn on_tick(&self, current_tick: u64) {
        if let Some(message) = self.record_tick(current_tick, Instant::now()) {
            self.resp.broadcast_prefixed(message);
        }
    }
}

struct ActiveMonitor {
    hook: Arc<dyn TickHook>,
    callback_id: CallbackId,
}

type ActiveSlot = Arc<Mutex<Option<ActiveMonitor>>>;

fn take_active(slot: &ActiveSlot) -> Option<ActiveMonitor> {
    slot.lock().unwrap_or_else(|p| p.into_inner()).take()
}

pub struct TickMonitoringModule {
    active: ActiveSlot,
}

impl TickMonitoringModule {
    pub fn new() -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for TickMonitoringModule {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandModule for TickMonitoringModule {
    fn name(&self) -> &'static str {
        "tickmonitor"
    }

    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
        sink(
            Command::builder()
                .aliases(["tickmonitor", "tickmonitoring"])
                .argument_usage("threshold", Some("percentage increase"))
                .argument_usage("threshold-tick", Some("tick duration"))
                .executor(TickMonitorCommand {
                    active: Arc::clone(&self.active),
                })
                .build()?,
        );
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if let Some(active) = take_active(&self.active) {
            active.hook.remove_callback(active.callback_id);
            info!("Tick monitor closed");
        }
        Ok(())
    }
}

struct TickMonitorCommand {
    active: ActiveSlot,
}

#[async_trait]
impl CommandExecutor for TickMonitorCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        args: &Arguments,
    ) -> Result<()> {
        let Some(hook) = platform.tick_hook() else {
            resp.reply_prefixed(Message::error("Tick monitoring is not supported on this platform."));
            return Ok(());
        };

        if let Some(active) = take_active(&self.active) {
            active.hook.remove_callback(active.callback_id);
            resp.broadcast_prefixed(Message::info("Tick monitor disabled."));
            return Ok(());
        }

        let defaults = &platform.config().tick_monitor;
        let predicate = match args.double_flag("threshold-tick")? {
            Some(ms) => ReportPredicate::DurationOver(ms),
            None => ReportPredicate::PercentIncrease(
                args.double_flag("threshold")?
                    .unwrap_or(defaults.report_threshold_percent as f64),
            ),
        };

        let monitor = Arc::new(TickMonitor::new(resp.clone(), predicate, defaults.warmup_ticks));
        let callback_id = hook.add_callback(monitor);
        *self.active.lock().unwrap_or_else(|p| p.into_inner()) = Some(ActiveMonitor {
            hook: Arc::clone(hook),
            callback_id,
        });
        info!(?predicate, callback_id, "Tick monitor started");

        resp.broadcast_prefixed(Message::info(format!("Tick monitor started. {}", predicate.describe())));
        resp.broadcast(Message::plain(format!(
            "The average tick duration will be measured over the next {} ticks.",
            defaults.warmup_ticks
        )));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingSender, TestHost};
    use std::time::Duration;

    fn monitor(predicate: ReportPredicate, warmup: u64) -> (TickMonitor, Arc<RecordingSender>) {
        let sender = Arc::new(RecordingSender::admin());
        let resp = CommandResponseHandler::new(Arc::new(TestHost::new()), sender.clone());
        (TickMonitor::new(resp, predicate, warmup), sender)
    }

    /// Feed `durations` (ms) as consecutive ticks starting at tick 0
    fn feed(monitor: &TickMonitor, durations: &[u64]) -> Vec<Option<Message>> {
        let mut now = Instant::now();
        let mut out = vec![monitor.record_tick(0, now)];
        for (i, ms) in durations.iter().enumerate() {
            now += Duration::from_millis(*ms);
            out.push(monitor.record_tick(i as u64 + 1, now));
        }
        out
    }

    #[test]
    fn test_warmup_then_percent_reports() {
        let (monitor, _) = monitor(ReportPredicate::PercentIncrease(100.0), 3);
        let out = feed(&monitor, &[50, 50, 50, 80, 150]);

        assert!(out[..3].iter().all(Option::is_none));
        assert_eq!(
            out[3].as_ref().map(|m| m.text.as_str()),
            Some("Analysis is now complete. Average tick duration: 50.00ms")
        );
        assert!(out[4].is_none());

        let report = out[5].as_ref().unwrap();
        assert_eq!(report.tone, crate::command::Tone::Warning);
        assert_eq!(report.text, "Tick #5 lasted 150.00ms (+200% / +100.00ms vs average 50.00ms)");
    }

    #[test]
    fn test_duration_predicate() {
        let (monitor, _) = monitor(ReportPredicate::DurationOver(100.0), 1);
        let out = feed(&monitor, &[50, 99, 120]);
        assert!(out[1].is_some());
        assert!(out[2].is_none());
        assert!(out[3].as_ref().unwrap().text.starts_with("Tick #3 lasted 120.00ms"));
    }

    #[test]
    fn test_on_tick_broadcasts_to_starter() {
        let (monitor, sender) = monitor(ReportPredicate::PercentIncrease(100.0), 1);
        monitor.on_tick(0);
        monitor.on_tick(1);
        assert_eq!(sender.texts().len(), 1);
        assert!(sender.texts()[0].starts_with("[flare] Analysis is now complete."));
    }

    #[tokio::test]
    async fn test_command_toggles_and_close_removes() {
        let host = Arc::new(TestHost::with_producers());
        let module = TickMonitoringModule::new();
        let active = module.active.clone();
        let platform = Platform::with_modules(host.clone(), Default::default(), vec![Box::new(module)]).unwrap();
        let hook = host.hook.clone().unwrap();
        let sender = Arc::new(RecordingSender::admin());

        platform
            .dispatch(sender.clone(), vec!["tickmonitor".into(), "--threshold".into(), "50".into()])
            .await;
        assert_eq!(hook.callback_count(), 1);
        assert_eq!(
            sender.texts()[0],
            "[flare] Tick monitor started. Reporting ticks more than 50% slower than average."
        );

        platform.dispatch(sender.clone(), vec!["tickmonitoring".into()]).await;
        assert_eq!(hook.callback_count(), 0);
        assert_eq!(sender.texts().last().unwrap(), "[flare] Tick monitor disabled.");

        platform.dispatch(sender.clone(), vec!["tickmonitor".into()]).await;
        assert!(active.lock().unwrap().is_some());
        platform.disable().unwrap();
        assert_eq!(hook.callback_count(), 0);
        assert!(active.lock().unwrap().is_none());
    }
}
