//! Tick rate and tick duration aggregation
//!
//! Fed by both tick producers and read concurrently by diagnostic commands.
//! All state sits behind one internal mutex that is independent of any
//! lock held by the caller.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;

use crate::rolling::RollingAverage;
use crate::tick::{TickHookCallback, TickReporterCallback};

/// Target ticks per second of the host
pub const TPS: u32 = 20;

/// A TPS sample is taken every this many ticks
const TPS_SAMPLE_INTERVAL: u64 = 20;

/// Windows for which TPS is averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TpsWindow {
    Seconds5,
    Seconds10,
    Minutes1,
    Minutes5,
    Minutes15,
}

impl TpsWindow {
    pub const ALL: [TpsWindow; 5] = [
        TpsWindow::Seconds5,
        TpsWindow::Seconds10,
        TpsWindow::Minutes1,
        TpsWindow::Minutes5,
        TpsWindow::Minutes15,
    ];

    pub fn seconds(self) -> usize {
        match self {
            TpsWindow::Seconds5 => 5,
            TpsWindow::Seconds10 => 10,
            TpsWindow::Minutes1 => 60,
            TpsWindow::Minutes5 => 300,
            TpsWindow::Minutes15 => 900,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TpsWindow::Seconds5 => "5s",
            TpsWindow::Seconds10 => "10s",
            TpsWindow::Minutes1 => "1m",
            TpsWindow::Minutes5 => "5m",
            TpsWindow::Minutes15 => "15m",
        }
    }

    fn index(self) -> usize {
        match self {
            TpsWindow::Seconds5 => 0,
            TpsWindow::Seconds10 => 1,
            TpsWindow::Minutes1 => 2,
            TpsWindow::Minutes5 => 3,
            TpsWindow::Minutes15 => 4,
        }
    }
}

/// Snapshot of a tick duration window, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationSummary {
    pub min: f64,
    pub median: f64,
    pub mean: f64,
    pub percentile95: f64,
    pub max: f64,
}

impl DurationSummary {
    pub fn from_average(average: &RollingAverage) -> Self {
        Self {
            min: average.min(),
            median: average.median(),
            mean: average.mean(),
            percentile95: average.percentile(0.95),
            max: average.max(),
        }
    }
}

/// Time-weighted TPS average
///
/// Starts pre-filled with perfect samples so early readings are not skewed
/// by an empty window.
struct TpsRollingAverage {
    size: usize,
    samples: VecDeque<(f64, Duration)>,
}

impl TpsRollingAverage {
    fn new(size: usize) -> Self {
        let perfect = (TPS as f64, Duration::from_secs(1));
        Self {
            size,
            samples: std::iter::repeat_n(perfect, size).collect(),
        }
    }

    fn add(&mut self, tps: f64, elapsed: Duration) {
        if self.samples.len() == self.size {
            self.samples.pop_front();
        }
        self.samples.push_back((tps, elapsed));
    }

    fn average(&self) -> f64 {
        let (weighted, time) = self
            .samples
            .iter()
            .fold((0.0, 0.0), |(weighted, time), (tps, elapsed)| {
                let secs = elapsed.as_secs_f64();
                (weighted + tps * secs, time + secs)
            });
        if time == 0.0 { 0.0 } else { weighted / time }
    }
}

struct TickState {
    last_sample: Option<Instant>,
    tps: [TpsRollingAverage; 5],
    duration_supported: bool,
    duration_10s: RollingAverage,
    duration_1m: RollingAverage,
}

/// Aggregator of tick rate (from a tick hook) and tick duration (from a tick reporter)
pub struct TickStatistics {
    state: Mutex<TickState>,
}

impl TickStatistics {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TickState {
                last_sample: None,
                tps: TpsWindow::ALL.map(|window| TpsRollingAverage::new(window.seconds())),
                duration_supported: false,
                duration_10s: RollingAverage::new(TPS as usize * 10),
                duration_1m: RollingAverage::new(TPS as usize * 60),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, TickState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record a hook tick observed at `now`
    ///
    /// Only every 20th tick produces a TPS sample; the first sample only
    /// primes the clock.
    pub fn record_tick_at(&self, current_tick: u64, now: Instant) {
        if current_tick % TPS_SAMPLE_INTERVAL != 0 {
            return;
        }

        let mut state = self.state();
        let Some(last) = state.last_sample.replace(now) else {
            debug!("TickStatistics::record_tick_at: priming clock at tick {}", current_tick);
            return;
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed.is_zero() {
            return;
        }

        let tps = TPS_SAMPLE_INTERVAL as f64 / elapsed.as_secs_f64();
        for average in state.tps.iter_mut() {
            average.add(tps, elapsed);
        }
    }

    /// Record the duration of one tick, in milliseconds
    pub fn record_duration(&self, duration_ms: f64) {
        let mut state = self.state();
        state.duration_supported = true;
        state.duration_10s.add(duration_ms);
        state.duration_1m.add(duration_ms);
    }

    pub fn tps(&self, window: TpsWindow) -> f64 {
        self.state().tps[window.index()].average()
    }

    /// TPS for every window, shortest first
    pub fn tps_all(&self) -> [(TpsWindow, f64); 5] {
        let state = self.state();
        TpsWindow::ALL.map(|window| (window, state.tps[window.index()].average()))
    }

    /// Whether a tick reporter has ever delivered a duration
    pub fn is_duration_supported(&self) -> bool {
        self.state().duration_supported
    }

    pub fn duration_10s(&self) -> Option<DurationSummary> {
        let state = self.state();
        (state.duration_supported && !state.duration_10s.is_empty())
            .then(|| DurationSummary::from_average(&state.duration_10s))
    }

    pub fn duration_1m(&self) -> Option<DurationSummary> {
        let state = self.state();
        (state.duration_supported && !state.duration_1m.is_empty())
            .then(|| DurationSummary::from_average(&state.duration_1m))
    }
}

impl Default for TickStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl TickHookCallback for TickStatistics {
    fn on_tick(&self, current_tick: u64) {
        self.record_tick_at(current_tick, Instant::now());
    }
}

impl TickReporterCallback for TickStatistics {
    fn on_tick(&self, duration_ms: f64) {
        self.record_duration(duration_ms);
    }
}
