//! Platform implementation

use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use eyre::{Context, Result};
use tickstats::{CpuMonitor, GcSnapshot, TickHook, TickReporter, TickStatistics};
use tracing::{debug, info, warn};

use super::{Lifecycle, LifecycleState, PlatformError};
use crate::activity::ActivityLog;
use crate::api::{self, PlatformApi};
use crate::bytebin::BytebinClient;
use crate::command::{CommandDispatcher, CommandRegistry, CommandSender};
use crate::config::Config;
use crate::host::PlatformHost;
use crate::modules::{self, CommandModule};

/// GC statistics captured shortly after enable
#[derive(Debug, Clone)]
pub struct StartupSnapshot {
    pub gc: GcSnapshot,
    pub captured_at: DateTime<Local>,
    captured: Instant,
}

/// The in-process diagnostics coordinator
pub struct Platform {
    host: Arc<dyn PlatformHost>,
    config: Config,
    dispatcher: CommandDispatcher,
    activity_log: ActivityLog,
    upload_client: Mutex<Option<BytebinClient>>,
    tick_hook: Option<Arc<dyn TickHook>>,
    tick_reporter: Option<Arc<dyn TickReporter>>,
    tick_statistics: Option<Arc<TickStatistics>>,
    lifecycle: Lifecycle,
    startup: OnceLock<StartupSnapshot>,
    api: Mutex<Option<Arc<PlatformApi>>>,
}

impl Platform {
    /// Platform with the built-in modules and the configuration in the plugin directory
    pub fn new(host: Arc<dyn PlatformHost>) -> Result<Arc<Self>> {
        let config = Config::load(None, &host.plugin_directory())?;
        Self::with_config(host, config)
    }

    /// Platform with the built-in modules
    pub fn with_config(host: Arc<dyn PlatformHost>, config: Config) -> Result<Arc<Self>> {
        Self::with_modules(host, config, modules::default_modules())
    }

    /// Platform with an explicit module list, in listing order
    pub fn with_modules(
        host: Arc<dyn PlatformHost>,
        config: Config,
        modules: Vec<Box<dyn CommandModule>>,
    ) -> Result<Arc<Self>> {
        debug!(modules = modules.len(), "Platform::with_modules: called");
        let registry = CommandRegistry::new(modules).context("Invalid command registry")?;
        let upload_client = BytebinClient::from_config(&config).context("Failed to create upload client")?;
        let activity_log = ActivityLog::load(host.plugin_directory().join(ActivityLog::FILE_NAME));

        let tick_hook = host.create_tick_hook();
        let tick_reporter = host.create_tick_reporter();
        let tick_statistics = (tick_hook.is_some() || tick_reporter.is_some()).then(|| Arc::new(TickStatistics::new()));

        Ok(Arc::new(Self {
            host,
            config,
            dispatcher: CommandDispatcher::new(registry),
            activity_log,
            upload_client: Mutex::new(Some(upload_client)),
            tick_hook,
            tick_reporter,
            tick_statistics,
            lifecycle: Lifecycle::new(),
            startup: OnceLock::new(),
            api: Mutex::new(None),
        }))
    }

    /// Start producers and background monitoring, then publish the API
    pub fn enable(self: &Arc<Self>) -> Result<(), PlatformError> {
        self.lifecycle.enable()?;
        info!(version = %self.host.version(), "Enabling platform");

        if let (Some(hook), Some(statistics)) = (&self.tick_hook, &self.tick_statistics) {
            hook.add_callback(statistics.clone());
            if let Err(e) = hook.start() {
                warn!(error = %e, "Failed to start tick hook");
            }
        }
        if let (Some(reporter), Some(statistics)) = (&self.tick_reporter, &self.tick_statistics) {
            reporter.add_callback(statistics.clone());
            if let Err(e) = reporter.start() {
                warn!(error = %e, "Failed to start tick reporter");
            }
        }

        CpuMonitor::ensure_monitoring();

        let platform = Arc::downgrade(self);
        self.host.execute_async(Box::pin(async move {
            if let Some(platform) = platform.upgrade() {
                platform.capture_startup_snapshot();
            }
        }));

        let api = Arc::new(PlatformApi::new(Arc::downgrade(self)));
        self.host.register_api(Arc::clone(&api));
        api::register(Arc::clone(&api));
        *self.api.lock().unwrap_or_else(|p| p.into_inner()) = Some(api);

        info!("Platform enabled");
        Ok(())
    }

    /// Stop producers, close modules and release resources
    ///
    /// Individual failures are logged; teardown always runs to the end.
    pub fn disable(&self) -> Result<(), PlatformError> {
        let previous = self.lifecycle.disable()?;
        info!(?previous, "Disabling platform");

        if let Some(hook) = &self.tick_hook
            && let Err(e) = hook.close()
        {
            warn!(error = %e, "Failed to close tick hook");
        }
        if let Some(reporter) = &self.tick_reporter
            && let Err(e) = reporter.close()
        {
            warn!(error = %e, "Failed to close tick reporter");
        }

        let failures = self.dispatcher.registry().close_modules();
        if failures > 0 {
            warn!(failures, "Some command modules failed to close");
        }

        if let Some(api) = self.api.lock().unwrap_or_else(|p| p.into_inner()).take() {
            api::unregister(&api);
        }
        drop(self.upload_client.lock().unwrap_or_else(|p| p.into_inner()).take());

        info!("Platform disabled");
        Ok(())
    }

    fn capture_startup_snapshot(&self) {
        let snapshot = StartupSnapshot {
            gc: self.host.poll_gc_statistics(),
            captured_at: Local::now(),
            captured: Instant::now(),
        };
        debug!(collectors = snapshot.gc.len(), "Platform::capture_startup_snapshot: captured");
        if self.startup.set(snapshot).is_err() {
            debug!("Platform::capture_startup_snapshot: already captured");
        }
    }

    /// Run a command in the background through the host's task facility
    pub fn execute_command(self: &Arc<Self>, sender: Arc<dyn CommandSender>, args: Vec<String>) {
        debug!(sender = %sender.name(), ?args, "Platform::execute_command: called");
        let platform = Arc::clone(self);
        self.host.execute_async(Box::pin(async move {
            platform.dispatch(sender, args).await;
        }));
    }

    /// Run a command and wait for it to finish
    pub async fn dispatch(self: &Arc<Self>, sender: Arc<dyn CommandSender>, args: Vec<String>) {
        self.dispatcher.dispatch(self, sender, args).await;
    }

    pub fn tab_complete_command(&self, sender: &dyn CommandSender, args: &[String]) -> Vec<String> {
        self.dispatcher.complete(self, sender, args)
    }

    pub fn has_permission_for_any_command(&self, sender: &dyn CommandSender) -> bool {
        !self.dispatcher.registry().visible_commands(sender).is_empty()
    }

    /// Whether a command is executing right now
    pub fn is_command_running(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub fn host(&self) -> &Arc<dyn PlatformHost> {
        &self.host
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn viewer_url(&self) -> &str {
        &self.config.viewer_url
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// The upload client; `None` once disabled
    pub fn upload_client(&self) -> Option<BytebinClient> {
        self.upload_client.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.activity_log
    }

    pub fn tick_hook(&self) -> Option<&Arc<dyn TickHook>> {
        self.tick_hook.as_ref()
    }

    pub fn tick_reporter(&self) -> Option<&Arc<dyn TickReporter>> {
        self.tick_reporter.as_ref()
    }

    pub fn tick_statistics(&self) -> Option<&Arc<TickStatistics>> {
        self.tick_statistics.as_ref()
    }

    pub fn startup_gc_statistics(&self) -> Option<&GcSnapshot> {
        self.startup.get().map(|snapshot| &snapshot.gc)
    }

    /// When the startup snapshot was taken
    pub fn normal_operation_start(&self) -> Option<DateTime<Local>> {
        self.startup.get().map(|snapshot| snapshot.captured_at)
    }

    pub fn normal_operation_uptime(&self) -> Option<Duration> {
        self.startup.get().map(|snapshot| snapshot.captured.elapsed())
    }

    /// `<plugin dir>/<prefix>-<timestamp>.<extension>`, creating the directory
    pub fn resolve_save_file(&self, prefix: &str, extension: &str) -> PathBuf {
        let dir = self.host.plugin_directory();
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(dir = %dir.display(), error = %e, "Failed to create plugin directory");
        }
        let timestamp = Local::now().format("%Y-%m-%d_%H.%M.%S");
        dir.join(format!("{prefix}-{timestamp}.{extension}"))
    }

    pub(crate) fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestHost;
    use serial_test::serial;
    use tickstats::TpsWindow;

    async fn wait_for_snapshot(platform: &Platform) {
        for _ in 0..100 {
            if platform.startup_gc_statistics().is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("startup snapshot was never captured");
    }

    #[tokio::test]
    #[serial]
    async fn test_enable_wires_producers() {
        let host = Arc::new(TestHost::with_producers());
        host.set_gc("young", 3, 12);
        let platform = Platform::new(host.clone()).unwrap();
        let hook = host.hook.clone().unwrap();
        let reporter = host.reporter.clone().unwrap();

        platform.enable().unwrap();
        assert!(hook.is_running());
        assert!(reporter.is_running());
        assert_eq!(hook.callback_count(), 1);

        reporter.on_tick(42.0);
        let statistics = platform.tick_statistics().unwrap();
        assert_eq!(statistics.duration_10s().map(|d| d.max), Some(42.0));
        assert!((statistics.tps(TpsWindow::Seconds5) - 20.0).abs() < 1e-9);

        wait_for_snapshot(&platform).await;
        assert_eq!(platform.startup_gc_statistics().unwrap()["young"].collections, 3);
        assert!(platform.normal_operation_start().is_some());
        assert!(host.api.lock().unwrap().is_some());
        assert!(api::get().is_some());

        assert_eq!(platform.enable(), Err(PlatformError::AlreadyEnabled));

        platform.disable().unwrap();
        assert!(!hook.is_running());
        assert!(!reporter.is_running());
        assert!(platform.upload_client().is_none());
        assert!(api::get().is_none());
        assert_eq!(platform.disable(), Err(PlatformError::AlreadyDisabled));
        assert_eq!(platform.enable(), Err(PlatformError::Disabled));
    }

    #[tokio::test]
    #[serial]
    async fn test_without_producers() {
        let platform = Platform::new(Arc::new(TestHost::new())).unwrap();
        assert!(platform.tick_statistics().is_none());
        platform.enable().unwrap();
        platform.disable().unwrap();
        assert_eq!(platform.state(), LifecycleState::Disabled);
    }

    #[test]
    fn test_disable_never_enabled() {
        let platform = Platform::new(Arc::new(TestHost::with_producers())).unwrap();
        assert!(platform.disable().is_ok());
    }

    #[test]
    fn test_resolve_save_file() {
        let host = Arc::new(TestHost::new());
        let platform = Platform::new(host.clone()).unwrap();
        let path = platform.resolve_save_file("profile", "json");
        assert_eq!(path.parent().unwrap(), host.plugin_directory());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("profile-"));
        assert!(name.ends_with(".json"));
    }

    #[test]
    fn test_statistics_ignore_ticks_before_enable() {
        let host = Arc::new(TestHost::with_producers());
        let platform = Platform::new(host.clone()).unwrap();
        host.reporter.clone().unwrap().on_tick(10.0);
        let statistics = platform.tick_statistics().unwrap();
        assert!(!statistics.is_duration_supported());
    }
}
