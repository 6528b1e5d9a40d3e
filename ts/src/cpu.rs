//! Process-wide CPU usage monitor
//!
//! One background thread per process samples the CPU time consumed by this
//! process once a second and keeps rolling load averages.

use std::sync::{Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use nix::sys::resource::{UsageWho, getrusage};
use nix::sys::time::TimeValLike;

use crate::rolling::RollingAverage;

const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

static MONITOR: OnceLock<CpuMonitor> = OnceLock::new();

/// Rolling CPU load of the current process, in `[0, 1]` of all cores
pub struct CpuMonitor {
    load_10s: Mutex<RollingAverage>,
    load_1m: Mutex<RollingAverage>,
    load_15m: Mutex<RollingAverage>,
}

impl CpuMonitor {
    fn new() -> Self {
        Self {
            load_10s: Mutex::new(RollingAverage::new(10)),
            load_1m: Mutex::new(RollingAverage::new(60)),
            load_15m: Mutex::new(RollingAverage::new(15 * 60)),
        }
    }

    /// Start the sampling thread unless it is already running in this process
    pub fn ensure_monitoring() -> &'static CpuMonitor {
        let mut created = false;
        let monitor = MONITOR.get_or_init(|| {
            created = true;
            CpuMonitor::new()
        });

        if created {
            let spawned = thread::Builder::new()
                .name("tickstats-cpu-monitor".to_string())
                .spawn(move || monitor.run());
            match spawned {
                Ok(_) => info!("CPU monitor started"),
                Err(e) => warn!("Failed to start CPU monitor thread: {}", e),
            }
        } else {
            debug!("CpuMonitor::ensure_monitoring: already running");
        }
        monitor
    }

    /// The monitor, if `ensure_monitoring` has been called in this process
    pub fn get() -> Option<&'static CpuMonitor> {
        MONITOR.get()
    }

    pub fn process_load_10s(&self) -> f64 {
        mean_of(&self.load_10s)
    }

    pub fn process_load_1m(&self) -> f64 {
        mean_of(&self.load_1m)
    }

    pub fn process_load_15m(&self) -> f64 {
        mean_of(&self.load_15m)
    }

    fn record(&self, load: f64) {
        for window in [&self.load_10s, &self.load_1m, &self.load_15m] {
            window.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).add(load);
        }
    }

    fn run(&self) {
        let cpus = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        let mut last_wall = Instant::now();
        let mut last_cpu = process_cpu_time();

        loop {
            thread::sleep(SAMPLE_INTERVAL);

            let now = Instant::now();
            let cpu = process_cpu_time();
            if let (Some(previous), Some(current)) = (last_cpu, cpu) {
                let load = compute_load(current.saturating_sub(previous), now - last_wall, cpus);
                self.record(load);
            }
            last_wall = now;
            last_cpu = cpu;
        }
    }
}

fn mean_of(window: &Mutex<RollingAverage>) -> f64 {
    window.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).mean()
}

/// User plus system CPU time consumed by this process
fn process_cpu_time() -> Option<Duration> {
    let usage = getrusage(UsageWho::RUSAGE_SELF).ok()?;
    let micros = usage.user_time().num_microseconds() + usage.system_time().num_microseconds();
    Some(Duration::from_micros(micros.max(0) as u64))
}

/// Fraction of all cores used during `wall`
fn compute_load(cpu: Duration, wall: Duration, cpus: usize) -> f64 {
    let capacity = wall.as_secs_f64() * cpus.max(1) as f64;
    if capacity <= 0.0 {
        return 0.0;
    }
    (cpu.as_secs_f64() / capacity).clamp(0.0, 1.0)
}
