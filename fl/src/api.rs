//! Read-only statistics handle for other code in the host process
//!
//! The enabled platform registers one [`PlatformApi`] process-wide; it is
//! removed again on disable. The handle holds the platform weakly, so every
//! accessor returns `None` once the platform is gone.

use std::sync::{Arc, RwLock, Weak};

use tickstats::{CpuMonitor, DurationSummary, GcSnapshot, TpsWindow, delta_since};
use tracing::debug;

use crate::platform::Platform;

static INSTANCE: RwLock<Option<Arc<PlatformApi>>> = RwLock::new(None);

/// Publish `api` as the process-wide handle, replacing any previous one
pub fn register(api: Arc<PlatformApi>) {
    debug!("api::register: called");
    *INSTANCE.write().unwrap_or_else(|p| p.into_inner()) = Some(api);
}

/// Remove `api` if it is the registered handle
pub fn unregister(api: &Arc<PlatformApi>) -> bool {
    let mut instance = INSTANCE.write().unwrap_or_else(|p| p.into_inner());
    match instance.as_ref() {
        Some(current) if Arc::ptr_eq(current, api) => {
            debug!("api::unregister: removed");
            *instance = None;
            true
        }
        _ => false,
    }
}

/// The registered handle, if a platform is enabled
pub fn get() -> Option<Arc<PlatformApi>> {
    INSTANCE.read().unwrap_or_else(|p| p.into_inner()).clone()
}

pub struct PlatformApi {
    platform: Weak<Platform>,
}

impl PlatformApi {
    pub fn new(platform: Weak<Platform>) -> Self {
        Self { platform }
    }

    pub fn version(&self) -> Option<String> {
        self.platform.upgrade().map(|platform| platform.host().version())
    }

    /// Ticks per second over `window`; `None` without a tick hook
    pub fn tps(&self, window: TpsWindow) -> Option<f64> {
        let platform = self.platform.upgrade()?;
        platform.tick_statistics().map(|statistics| statistics.tps(window))
    }

    /// Tick durations over the last 10 seconds; `None` without a tick reporter
    pub fn mspt_10s(&self) -> Option<DurationSummary> {
        self.platform.upgrade()?.tick_statistics()?.duration_10s()
    }

    /// Tick durations over the last minute
    pub fn mspt_1m(&self) -> Option<DurationSummary> {
        self.platform.upgrade()?.tick_statistics()?.duration_1m()
    }

    /// Process CPU load over 10s, 1m and 15m, each in `[0, 1]`
    pub fn cpu_process(&self) -> Option<[f64; 3]> {
        self.platform.upgrade()?;
        let monitor = CpuMonitor::get()?;
        Some([
            monitor.process_load_10s(),
            monitor.process_load_1m(),
            monitor.process_load_15m(),
        ])
    }

    /// Garbage collection since the startup snapshot
    pub fn gc(&self) -> Option<GcSnapshot> {
        let platform = self.platform.upgrade()?;
        let current = platform.host().poll_gc_statistics();
        Some(match platform.startup_gc_statistics() {
            Some(baseline) => delta_since(&current, baseline),
            None => current,
        })
    }
}
