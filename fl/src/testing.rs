//! Test doubles shared by unit tests

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;
use tickstats::{GarbageCollectorStatistics, GcSnapshot, SimpleTickHook, SimpleTickReporter, TickHook, TickReporter};

use crate::api::PlatformApi;
use crate::command::{CommandSender, Message};
use crate::host::PlatformHost;

pub(crate) struct RecordingSender {
    name: String,
    permissions: Vec<String>,
    messages: Mutex<Vec<Message>>,
}

impl RecordingSender {
    pub(crate) fn named(name: &str, permissions: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            messages: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_permissions(permissions: &[&str]) -> Self {
        Self::named("tester", permissions)
    }

    pub(crate) fn admin() -> Self {
        Self::with_permissions(&["flare"])
    }

    pub(crate) fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.text).collect()
    }

    pub(crate) fn clear(&self) {
        self.messages.lock().unwrap().clear();
    }
}

impl CommandSender for RecordingSender {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn has_permission(&self, node: &str) -> bool {
        self.permissions.iter().any(|p| p == node)
    }

    fn reply(&self, message: Message) {
        self.messages.lock().unwrap().push(message);
    }
}

pub(crate) struct TestHost {
    dir: TempDir,
    senders: Mutex<Vec<Arc<dyn CommandSender>>>,
    pub(crate) hook: Option<Arc<SimpleTickHook>>,
    pub(crate) reporter: Option<Arc<SimpleTickReporter>>,
    gc: Mutex<GcSnapshot>,
    pub(crate) api: Mutex<Option<Arc<PlatformApi>>>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            senders: Mutex::new(Vec::new()),
            hook: None,
            reporter: None,
            gc: Mutex::new(GcSnapshot::new()),
            api: Mutex::new(None),
        }
    }

    pub(crate) fn with_producers() -> Self {
        Self {
            hook: Some(Arc::new(SimpleTickHook::new())),
            reporter: Some(Arc::new(SimpleTickReporter::new())),
            ..Self::new()
        }
    }

    pub(crate) fn add_sender(&self, sender: Arc<dyn CommandSender>) {
        self.senders.lock().unwrap().push(sender);
    }

    pub(crate) fn set_gc(&self, name: &str, collections: u64, time_ms: u64) {
        self.gc
            .lock()
            .unwrap()
            .insert(name.to_string(), GarbageCollectorStatistics::new(collections, time_ms));
    }
}

impl PlatformHost for TestHost {
    fn version(&self) -> String {
        "1.2.3".to_string()
    }

    fn plugin_directory(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    fn command_senders(&self) -> Vec<Arc<dyn CommandSender>> {
        self.senders.lock().unwrap().clone()
    }

    fn create_tick_hook(&self) -> Option<Arc<dyn TickHook>> {
        self.hook.clone().map(|hook| hook as Arc<dyn TickHook>)
    }

    fn create_tick_reporter(&self) -> Option<Arc<dyn TickReporter>> {
        self.reporter.clone().map(|reporter| reporter as Arc<dyn TickReporter>)
    }

    fn poll_gc_statistics(&self) -> GcSnapshot {
        self.gc.lock().unwrap().clone()
    }

    fn register_api(&self, api: Arc<PlatformApi>) {
        *self.api.lock().unwrap() = Some(api);
    }
}
