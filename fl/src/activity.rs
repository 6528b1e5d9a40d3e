//! Record of diagnostic actions taken by operators

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Mutex as AsyncMutex;

use chrono::Utc;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Entries kept in memory and on disk
pub const MAX_ENTRIES: usize = 10;

/// What an activity produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityData {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// One logged action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub user: String,
    /// Unix time in milliseconds
    pub time: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: ActivityData,
}

impl Activity {
    pub const DATA_TYPE_URL: &'static str = "url";
    pub const DATA_TYPE_FILE: &'static str = "file";

    /// An artifact uploaded to `url`
    pub fn url(user: &str, kind: &str, url: &str) -> Self {
        Self::now(user, kind, Self::DATA_TYPE_URL, url)
    }

    /// An artifact written to `path`
    pub fn file(user: &str, kind: &str, path: &Path) -> Self {
        Self::now(user, kind, Self::DATA_TYPE_FILE, &path.display().to_string())
    }

    fn now(user: &str, kind: &str, data_type: &str, value: &str) -> Self {
        Self {
            user: user.to_string(),
            time: Utc::now().timestamp_millis(),
            kind: kind.to_string(),
            data: ActivityData {
                kind: data_type.to_string(),
                value: value.to_string(),
            },
        }
    }

    /// File activities whose file has since been removed
    pub fn is_expired(&self) -> bool {
        self.data.kind == Self::DATA_TYPE_FILE && !Path::new(&self.data.value).exists()
    }
}

/// Newest-first activity list persisted as JSON
pub struct ActivityLog {
    path: PathBuf,
    entries: Mutex<VecDeque<Activity>>,
    /// Orders file writes so the newest snapshot lands last
    write_lock: AsyncMutex<()>,
}

impl ActivityLog {
    pub const FILE_NAME: &'static str = "activity.json";

    /// Load from `path`; unreadable or missing files give an empty log
    pub fn load(path: PathBuf) -> Self {
        debug!(path = %path.display(), "ActivityLog::load: called");
        let entries = match read_entries(&path) {
            Ok(entries) => entries.into_iter().filter(|a| !a.is_expired()).take(MAX_ENTRIES).collect(),
            Err(e) => {
                if path.exists() {
                    warn!(path = %path.display(), error = %e, "Failed to load activity log");
                }
                VecDeque::new()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
            write_lock: AsyncMutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries_guard(&self) -> MutexGuard<'_, VecDeque<Activity>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Record `activity` as the newest entry and persist; write failures are logged
    pub async fn add(&self, activity: Activity) {
        debug!(kind = %activity.kind, user = %activity.user, "ActivityLog::add: called");
        let _write = self.write_lock.lock().await;
        let snapshot: Vec<Activity> = {
            let mut entries = self.entries_guard();
            entries.push_front(activity);
            entries.truncate(MAX_ENTRIES);
            entries.iter().cloned().collect()
        };
        if let Err(e) = write_entries(&self.path, &snapshot).await {
            warn!(path = %self.path.display(), error = %e, "Failed to save activity log");
        }
    }

    /// Entries, newest first
    pub fn entries(&self) -> Vec<Activity> {
        self.entries_guard().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries_guard().is_empty()
    }
}

fn read_entries(path: &Path) -> Result<Vec<Activity>> {
    let content = fs::read_to_string(path).context("Failed to read activity log")?;
    let entries = serde_json::from_str(&content).context("Failed to parse activity log")?;
    Ok(entries)
}

async fn write_entries(path: &Path, entries: &[Activity]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context("Failed to create activity log directory")?;
    }
    let content = serde_json::to_string_pretty(entries).context("Failed to serialize activity log")?;
    tokio::fs::write(path, content).await.context("Failed to write activity log")?;
    Ok(())
}
