//! Host-driven tick duration reporter

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use eyre::Result;
use log::debug;

use super::{CallbackId, Subscribers, TickReporter, TickReporterCallback};

/// Tick reporter whose durations are pushed by the host's main loop
pub struct SimpleTickReporter {
    subscribers: Subscribers<dyn TickReporterCallback>,
    running: AtomicBool,
}

impl SimpleTickReporter {
    pub fn new() -> Self {
        Self {
            subscribers: Subscribers::new(),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn callback_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Report how long the tick that just finished took
    pub fn on_tick(&self, duration_ms: f64) {
        if !self.is_running() {
            return;
        }
        for callback in self.subscribers.snapshot() {
            callback.on_tick(duration_ms);
        }
    }
}

impl Default for SimpleTickReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickReporter for SimpleTickReporter {
    fn start(&self) -> Result<()> {
        debug!("SimpleTickReporter::start: called");
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        debug!("SimpleTickReporter::close: called");
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn add_callback(&self, callback: Arc<dyn TickReporterCallback>) -> CallbackId {
        let id = self.subscribers.add(callback);
        debug!("SimpleTickReporter::add_callback: id={}", id);
        id
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        debug!("SimpleTickReporter::remove_callback: id={}", id);
        self.subscribers.remove(id)
    }
}
