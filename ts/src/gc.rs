//! Garbage collector statistics
//!
//! The host knows what its collectors are; this crate only does the
//! bookkeeping between two snapshots.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Collector name to cumulative statistics, ordered by name
pub type GcSnapshot = BTreeMap<String, GarbageCollectorStatistics>;

/// Cumulative statistics of one collector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GarbageCollectorStatistics {
    /// Number of collections
    pub collections: u64,
    /// Total time spent collecting, in milliseconds
    pub time_ms: u64,
}

impl GarbageCollectorStatistics {
    pub fn new(collections: u64, time_ms: u64) -> Self {
        Self { collections, time_ms }
    }

    /// Statistics accumulated since `baseline`
    pub fn since(&self, baseline: &Self) -> Self {
        Self {
            collections: self.collections.saturating_sub(baseline.collections),
            time_ms: self.time_ms.saturating_sub(baseline.time_ms),
        }
    }

    /// Mean time per collection in milliseconds, 0 when nothing ran
    pub fn average_collection_time(&self) -> f64 {
        if self.collections == 0 {
            return 0.0;
        }
        self.time_ms as f64 / self.collections as f64
    }

    /// Mean time between collections in milliseconds over `uptime`
    pub fn average_collection_frequency(&self, uptime: Duration) -> f64 {
        if self.collections == 0 {
            return 0.0;
        }
        let running_ms = (uptime.as_millis() as f64 - self.time_ms as f64).max(0.0);
        running_ms / self.collections as f64
    }
}

/// Per-collector statistics accumulated since `baseline`
///
/// Collectors missing from the baseline are reported in full.
pub fn delta_since(current: &GcSnapshot, baseline: &GcSnapshot) -> GcSnapshot {
    current
        .iter()
        .map(|(name, stats)| {
            let delta = match baseline.get(name) {
                Some(base) => stats.since(base),
                None => *stats,
            };
            (name.clone(), delta)
        })
        .collect()
}
