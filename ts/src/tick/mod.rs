//! Periodic tick producers
//!
//! Two independent producers exist because hosts expose different things:
//! - A [`TickHook`] fires once per host tick and carries the tick number.
//! - A [`TickReporter`] fires once per host tick and carries how long the
//!   tick took to process, in milliseconds.
//!
//! Both support multiple subscribers and only deliver ticks between
//! `start()` and `close()`.

mod hook;
mod reporter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use eyre::Result;

pub use hook::SimpleTickHook;
pub use reporter::SimpleTickReporter;

/// Handle returned by `add_callback`, used to unsubscribe
pub type CallbackId = u64;

/// Subscriber of a [`TickHook`]
pub trait TickHookCallback: Send + Sync {
    fn on_tick(&self, current_tick: u64);
}

/// Subscriber of a [`TickReporter`]
pub trait TickReporterCallback: Send + Sync {
    fn on_tick(&self, duration_ms: f64);
}

/// Producer invoking callbacks on every host tick
pub trait TickHook: Send + Sync {
    /// Begin delivering ticks to subscribers
    fn start(&self) -> Result<()>;

    /// Stop delivering ticks. Safe to call when never started.
    fn close(&self) -> Result<()>;

    /// Number of ticks observed since start
    fn current_tick(&self) -> u64;

    fn add_callback(&self, callback: Arc<dyn TickHookCallback>) -> CallbackId;

    /// Returns false when no subscriber has that id
    fn remove_callback(&self, id: CallbackId) -> bool;
}

/// Producer reporting the duration of every host tick
pub trait TickReporter: Send + Sync {
    /// Begin delivering tick durations to subscribers
    fn start(&self) -> Result<()>;

    /// Stop delivering tick durations. Safe to call when never started.
    fn close(&self) -> Result<()>;

    fn add_callback(&self, callback: Arc<dyn TickReporterCallback>) -> CallbackId;

    /// Returns false when no subscriber has that id
    fn remove_callback(&self, id: CallbackId) -> bool;
}

/// Subscriber list shared by both producer kinds
///
/// Callbacks are invoked on a snapshot, so a callback may subscribe or
/// unsubscribe without deadlocking the producer.
pub(crate) struct Subscribers<C: ?Sized> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(CallbackId, Arc<C>)>>,
}

impl<C: ?Sized> Subscribers<C> {
    pub(crate) fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn add(&self, callback: Arc<C>) -> CallbackId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        match self.entries.write() {
            Ok(mut entries) => entries.push((id, callback)),
            Err(poisoned) => poisoned.into_inner().push((id, callback)),
        }
        id
    }

    pub(crate) fn remove(&self, id: CallbackId) -> bool {
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    pub(crate) fn snapshot(&self) -> Vec<Arc<C>> {
        let entries = match self.entries.read() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.iter().map(|(_, callback)| Arc::clone(callback)).collect()
    }

    pub(crate) fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
