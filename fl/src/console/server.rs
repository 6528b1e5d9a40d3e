//! Simulated game loop
//!
//! Runs fixed-rate ticks on a dedicated thread with randomised work and the
//! occasional lag spike, feeding the tick hook, tick reporter and a pair of
//! pretend garbage collectors.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use eyre::{Context, Result};
use rand::Rng;
use tickstats::{GarbageCollectorStatistics, GcSnapshot, SimpleTickHook, SimpleTickReporter};
use tracing::{debug, info, warn};

const SPIKE_CHANCE: f64 = 0.01;

/// Collections of a young and an old generation collector
#[derive(Debug, Default)]
pub struct GcSimulator {
    snapshot: GcSnapshot,
}

impl GcSimulator {
    pub const YOUNG: &'static str = "G1 Young Generation";
    pub const OLD: &'static str = "G1 Old Generation";

    /// Young collections every 100 ticks, old ones every 2400
    pub fn on_tick(&mut self, tick: u64, rng: &mut impl Rng) {
        if tick == 0 {
            return;
        }
        if tick % 100 == 0 {
            self.collect(Self::YOUNG, rng.random_range(2..8));
        }
        if tick % 2400 == 0 {
            self.collect(Self::OLD, rng.random_range(40..120));
        }
    }

    fn collect(&mut self, name: &str, time_ms: u64) {
        let stats = self.snapshot.entry(name.to_string()).or_default();
        *stats = GarbageCollectorStatistics::new(stats.collections + 1, stats.time_ms + time_ms);
    }

    pub fn snapshot(&self) -> GcSnapshot {
        self.snapshot.clone()
    }
}

/// How long one simulated tick works for
fn tick_work(rng: &mut impl Rng, interval: Duration) -> Duration {
    let load = if rng.random_bool(SPIKE_CHANCE) {
        rng.random_range(1.5..4.0)
    } else {
        rng.random_range(0.2..0.6)
    };
    interval.mul_f64(load)
}

/// A fixed-rate tick loop on its own thread
pub struct SimulatedServer {
    tps: u32,
    hook: Arc<SimpleTickHook>,
    reporter: Arc<SimpleTickReporter>,
    gc: Arc<Mutex<GcSimulator>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedServer {
    pub fn new(tps: u32) -> Self {
        Self {
            tps: tps.max(1),
            hook: Arc::new(SimpleTickHook::new()),
            reporter: Arc::new(SimpleTickReporter::new()),
            gc: Arc::new(Mutex::new(GcSimulator::default())),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn hook(&self) -> Arc<SimpleTickHook> {
        Arc::clone(&self.hook)
    }

    pub fn reporter(&self) -> Arc<SimpleTickReporter> {
        Arc::clone(&self.reporter)
    }

    pub fn gc_statistics(&self) -> GcSnapshot {
        self.gc.lock().unwrap_or_else(|p| p.into_inner()).snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start ticking; a second call is a no-op
    pub fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!("SimulatedServer::start: already running");
            return Ok(());
        }

        let interval = Duration::from_secs_f64(1.0 / self.tps as f64);
        let (hook, reporter, gc, running) = (
            self.hook(),
            self.reporter(),
            Arc::clone(&self.gc),
            Arc::clone(&self.running),
        );
        let handle = thread::Builder::new()
            .name("flare-server-loop".to_string())
            .spawn(move || run_loop(interval, &hook, &reporter, &gc, &running))
            .inspect_err(|_| self.running.store(false, Ordering::Release))
            .context("Failed to spawn server loop thread")?;

        *self.handle.lock().unwrap_or_else(|p| p.into_inner()) = Some(handle);
        info!(tps = self.tps, "Simulated server started");
        Ok(())
    }

    /// Stop ticking and wait for the loop thread
    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        let handle = self.handle.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("Server loop thread panicked");
            }
            info!("Simulated server stopped");
        }
    }
}

impl Drop for SimulatedServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    interval: Duration,
    hook: &SimpleTickHook,
    reporter: &SimpleTickReporter,
    gc: &Mutex<GcSimulator>,
    running: &AtomicBool,
) {
    let mut rng = rand::rng();
    let mut tick: u64 = 0;

    while running.load(Ordering::Acquire) {
        let start = Instant::now();
        thread::sleep(tick_work(&mut rng, interval));

        hook.on_tick();
        gc.lock().unwrap_or_else(|p| p.into_inner()).on_tick(tick, &mut rng);

        let elapsed = start.elapsed();
        reporter.on_tick(elapsed.as_secs_f64() * 1000.0);
        tick += 1;

        if let Some(remaining) = interval.checked_sub(elapsed) {
            thread::sleep(remaining);
        }
    }
}
