//! `profiler` command
//!
//! A profiling session records every tick duration delivered by the tick
//! reporter until it is stopped, cancelled or times out. Stopping turns the
//! recording into a JSON report that is uploaded to the viewer or written to
//! the plugin directory.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use eyre::{Context, Result};
use serde::Serialize;
use tickstats::{CallbackId, DurationSummary, RollingAverage, TickReporter, TickReporterCallback};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::CommandModule;
use super::format::format_duration;
use crate::activity::Activity;
use crate::command::{Arguments, Command, CommandExecutor, CommandResponseHandler, CommandSender, Message, RegistryError};
use crate::platform::Platform;

const MIN_TIMEOUT_SECS: u64 = 10;

/// One hour at 20 TPS
const MAX_RECORDED_TICKS: usize = 20 * 60 * 60;

const SLOWEST_TICKS: usize = 10;

const REPORT_CONTENT_TYPE: &str = "application/json";

const ACTIVITY_KIND: &str = "Profiler";

#[derive(Default)]
struct TickRecorder {
    durations: Mutex<Vec<f64>>,
}

impl TickRecorder {
    fn durations(&self) -> MutexGuard<'_, Vec<f64>> {
        self.durations.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl TickReporterCallback for TickRecorder {
    fn on_tick(&self, duration_ms: f64) {
        let mut durations = self.durations();
        if durations.len() < MAX_RECORDED_TICKS {
            durations.push(duration_ms);
        }
    }
}

struct Session {
    id: Uuid,
    started_at: DateTime<Local>,
    started: Instant,
    timeout: Option<Duration>,
    reporter: Arc<dyn TickReporter>,
    callback_id: CallbackId,
    recorder: Arc<TickRecorder>,
}

impl Session {
    fn detach(&self) {
        self.reporter.remove_callback(self.callback_id);
    }
}

type SessionSlot = Arc<Mutex<Option<Session>>>;

fn lock(slot: &SessionSlot) -> MutexGuard<'_, Option<Session>> {
    slot.lock().unwrap_or_else(|p| p.into_inner())
}

/// A tick that made the slowest list
#[derive(Debug, Clone, Serialize)]
pub struct SlowTick {
    pub index: usize,
    pub duration_ms: f64,
}

/// Result of a profiling session
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub id: Uuid,
    pub platform_version: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub duration_secs: f64,
    pub ticks: usize,
    pub durations: Option<DurationSummary>,
    pub slowest_ticks: Vec<SlowTick>,
}

impl ProfileReport {
    fn from_session(session: &Session, platform_version: String) -> Self {
        let durations = session.recorder.durations().clone();

        let summary = (!durations.is_empty()).then(|| {
            let mut average = RollingAverage::new(durations.len());
            for duration in &durations {
                average.add(*duration);
            }
            DurationSummary::from_average(&average)
        });

        let mut slowest_ticks: Vec<SlowTick> = durations
            .iter()
            .enumerate()
            .map(|(index, duration_ms)| SlowTick {
                index,
                duration_ms: *duration_ms,
            })
            .collect();
        slowest_ticks.sort_by(|a, b| b.duration_ms.total_cmp(&a.duration_ms));
        slowest_ticks.truncate(SLOWEST_TICKS);

        Self {
            id: session.id,
            platform_version,
            started_at: session.started_at,
            ended_at: Local::now(),
            duration_secs: session.started.elapsed().as_secs_f64(),
            ticks: durations.len(),
            durations: summary,
            slowest_ticks,
        }
    }
}

pub struct ProfilerModule {
    session: SessionSlot,
}

impl ProfilerModule {
    pub fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(None)),
        }
    }
}

impl Default for ProfilerModule {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandModule for ProfilerModule {
    fn name(&self) -> &'static str {
        "profiler"
    }

    fn register_commands(&self, sink: &mut dyn FnMut(Command)) -> Result<(), RegistryError> {
        sink(
            Command::builder()
                .aliases(["profiler", "sampler"])
                .argument_usage("info", None)
                .argument_usage("stop", None)
                .argument_usage("cancel", None)
                .argument_usage("timeout", Some("timeout seconds"))
                .argument_usage("save-to-file", None)
                .executor(ProfilerCommand {
                    session: Arc::clone(&self.session),
                })
                .build()?,
        );
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if let Some(session) = lock(&self.session).take() {
            session.detach();
            info!(id = %session.id, "Profiler session cancelled on close");
        }
        Ok(())
    }
}

struct ProfilerCommand {
    session: SessionSlot,
}

#[async_trait]
impl CommandExecutor for ProfilerCommand {
    async fn execute(
        &self,
        platform: &Arc<Platform>,
        _sender: &Arc<dyn CommandSender>,
        resp: &CommandResponseHandler,
        args: &Arguments,
    ) -> Result<()> {
        if args.bool_flag("info") {
            self.info(resp);
            return Ok(());
        }

        if args.bool_flag("cancel") {
            let session = lock(&self.session).take();
            match session {
                Some(session) => {
                    session.detach();
                    info!(id = %session.id, "Profiler cancelled");
                    resp.broadcast_prefixed(Message::info("Profiler has been cancelled."));
                }
                None => resp.reply_prefixed(Message::error("There isn't an active profiler running.")),
            }
            return Ok(());
        }

        if args.bool_flag("stop") {
            let session = lock(&self.session).take();
            return match session {
                Some(session) => finish(platform, resp, session, args.bool_flag("save-to-file")).await,
                None => {
                    resp.reply_prefixed(Message::error("There isn't an active profiler running."));
                    Ok(())
                }
            };
        }

        self.start(platform, resp, args)
    }
}

impl ProfilerCommand {
    fn start(&self, platform: &Arc<Platform>, resp: &CommandResponseHandler, args: &Arguments) -> Result<()> {
        let timeout_secs = args.int_flag("timeout")?;
        if let Some(secs) = timeout_secs
            && secs < MIN_TIMEOUT_SECS
        {
            resp.reply_prefixed(Message::error(format!(
                "The timeout must be at least {MIN_TIMEOUT_SECS} seconds."
            )));
            return Ok(());
        }

        let id = {
            let mut slot = lock(&self.session);
            if slot.is_some() {
                resp.reply_prefixed(Message::error("A profiler is already running!"));
                return Ok(());
            }
            let Some(reporter) = platform.tick_reporter() else {
                resp.reply_prefixed(Message::error(
                    "This platform does not report tick durations, so the profiler cannot run.",
                ));
                return Ok(());
            };

            let recorder = Arc::new(TickRecorder::default());
            let callback_id = reporter.add_callback(recorder.clone());
            let id = Uuid::now_v7();
            *slot = Some(Session {
                id,
                started_at: Local::now(),
                started: Instant::now(),
                timeout: timeout_secs.map(Duration::from_secs),
                reporter: Arc::clone(reporter),
                callback_id,
                recorder,
            });
            id
        };
        info!(%id, owner = %resp.sender_name(), ?timeout_secs, "Profiler started");

        resp.broadcast_prefixed(Message::success("Profiler now active!"));
        match timeout_secs {
            Some(secs) => {
                resp.broadcast(Message::plain(format!(
                    "The results will be automatically returned after the profiler has been running for {secs} seconds."
                )));
                self.schedule_timeout(platform, resp, id, secs, args.bool_flag("save-to-file"));
            }
            None => resp.broadcast(Message::plain(format!(
                "Use '/{} profiler --stop' to stop profiling and upload the results.",
                resp.command_name()
            ))),
        }
        Ok(())
    }

    fn schedule_timeout(
        &self,
        platform: &Arc<Platform>,
        resp: &CommandResponseHandler,
        id: Uuid,
        secs: u64,
        save_to_file: bool,
    ) {
        let slot = Arc::clone(&self.session);
        let task_platform = Arc::clone(platform);
        let resp = resp.clone();
        platform.host().execute_async(Box::pin(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            let session = {
                let mut guard = lock(&slot);
                let current = guard.as_ref().is_some_and(|session| session.id == id);
                if current { guard.take() } else { None }
            };
            match session {
                Some(session) => {
                    if let Err(e) = finish(&task_platform, &resp, session, save_to_file).await {
                        warn!(%id, error = ?e, "Failed to complete timed profiler");
                    }
                }
                None => debug!(%id, "schedule_timeout: session already ended"),
            }
        }));
    }

    fn info(&self, resp: &CommandResponseHandler) {
        let slot = lock(&self.session);
        let Some(session) = slot.as_ref() else {
            resp.reply_prefixed(Message::info("There isn't an active profiler running."));
            return;
        };

        let elapsed = session.started.elapsed();
        let ticks = session.recorder.durations().len();
        resp.reply_prefixed(Message::info(format!(
            "Profiler has been running for {}, {} ticks recorded.",
            format_duration(elapsed),
            ticks
        )));
        match session.timeout {
            Some(timeout) => resp.reply(Message::plain(format!(
                "It is due to complete in {}.",
                format_duration(timeout.saturating_sub(elapsed))
            ))),
            None => resp.reply(Message::plain(format!(
                "It will run until stopped with '/{} profiler --stop'.",
                resp.command_name()
            ))),
        }
    }
}

/// Detach the session and deliver its report
async fn finish(
    platform: &Arc<Platform>,
    resp: &CommandResponseHandler,
    session: Session,
    save_to_file: bool,
) -> Result<()> {
    session.detach();
    let report = ProfileReport::from_session(&session, platform.host().version());
    info!(id = %report.id, ticks = report.ticks, "Profiler stopped");
    resp.broadcast_prefixed(Message::info(format!(
        "Profiler stopped after {}, {} ticks recorded. Processing results...",
        format_duration(Duration::from_secs_f64(report.duration_secs)),
        report.ticks
    )));

    let payload = serde_json::to_vec_pretty(&report).context("Failed to serialize profile")?;
    let owner = resp.sender_name();

    if !save_to_file {
        match platform.upload_client() {
            Some(client) => match client.post_content(payload.clone(), REPORT_CONTENT_TYPE).await {
                Ok(key) => {
                    let url = format!("{}{}", platform.viewer_url(), key);
                    resp.broadcast_prefixed(Message::success("Profiler results:"));
                    resp.broadcast(Message::highlight(url.clone()));
                    platform.activity_log().add(Activity::url(&owner, ACTIVITY_KIND, &url)).await;
                    return Ok(());
                }
                Err(e) => {
                    warn!(error = %e, "Failed to upload profile");
                    resp.broadcast_prefixed(Message::error(format!(
                        "An error occurred whilst uploading the results ({e}), saving them instead."
                    )));
                }
            },
            None => resp.broadcast_prefixed(Message::error("Uploads are unavailable, saving the results instead.")),
        }
    }

    let path = platform.resolve_save_file("profile", "json");
    tokio::fs::write(&path, &payload)
        .await
        .with_context(|| format!("Failed to write profile to {}", path.display()))?;
    resp.broadcast_prefixed(Message::success(format!("Profile written to: {}", path.display())));
    platform.activity_log().add(Activity::file(&owner, ACTIVITY_KIND, &path)).await;
    Ok(())
}
