//! Host-driven tick hook

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use eyre::Result;
use log::debug;

use super::{CallbackId, Subscribers, TickHook, TickHookCallback};

/// Tick hook whose ticks are pushed by the host's main loop
///
/// The host calls [`SimpleTickHook::on_tick`] once per tick. Ticks arriving
/// before `start()` or after `close()` are ignored.
pub struct SimpleTickHook {
    subscribers: Subscribers<dyn TickHookCallback>,
    tick: AtomicU64,
    running: AtomicBool,
}

impl SimpleTickHook {
    pub fn new() -> Self {
        Self {
            subscribers: Subscribers::new(),
            tick: AtomicU64::new(0),
            running: AtomicBool::new(false),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn callback_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver one tick to every subscriber, then advance the tick counter
    pub fn on_tick(&self) {
        if !self.is_running() {
            return;
        }
        let current = self.tick.fetch_add(1, Ordering::AcqRel);
        for callback in self.subscribers.snapshot() {
            callback.on_tick(current);
        }
    }
}

impl Default for SimpleTickHook {
    fn default() -> Self {
        Self::new()
    }
}

impl TickHook for SimpleTickHook {
    fn start(&self) -> Result<()> {
        debug!("SimpleTickHook::start: called");
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn close(&self) -> Result<()> {
        debug!("SimpleTickHook::close: called");
        self.running.store(false, Ordering::Release);
        Ok(())
    }

    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Acquire)
    }

    fn add_callback(&self, callback: Arc<dyn TickHookCallback>) -> CallbackId {
        let id = self.subscribers.add(callback);
        debug!("SimpleTickHook::add_callback: id={}", id);
        id
    }

    fn remove_callback(&self, id: CallbackId) -> bool {
        debug!("SimpleTickHook::remove_callback: id={}", id);
        self.subscribers.remove(id)
    }
}
