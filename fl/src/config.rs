//! Flare configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// File name of the configuration inside the plugin directory
pub const CONFIG_FILE_NAME: &str = "config.yml";

/// Main Flare configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the web viewer; upload keys are appended to it
    #[serde(rename = "viewer-url")]
    pub viewer_url: String,

    /// Base URL of the bytebin service used to upload artifacts
    #[serde(rename = "bytebin-url")]
    pub bytebin_url: String,

    /// User agent sent with uploads
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Upload request timeout in seconds
    #[serde(rename = "upload-timeout-secs")]
    pub upload_timeout_secs: u64,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Tick monitor defaults
    #[serde(rename = "tick-monitor")]
    pub tick_monitor: TickMonitorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            viewer_url: "https://spark.lucko.me/".to_string(),
            bytebin_url: "https://bytebin.lucko.me/".to_string(),
            user_agent: "flare-plugin".to_string(),
            upload_timeout_secs: 30,
            log_level: None,
            tick_monitor: TickMonitorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// An explicit path must load. Otherwise `<plugin_dir>/config.yml` is
    /// tried and defaults are used when it is missing or unreadable.
    pub fn load(config_path: Option<&PathBuf>, plugin_dir: &Path) -> Result<Self> {
        debug!(?config_path, plugin_dir = %plugin_dir.display(), "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let plugin_config = plugin_dir.join(CONFIG_FILE_NAME);
        if plugin_config.exists() {
            match Self::load_from_file(&plugin_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", plugin_config.display(), e);
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialised
    pub fn load_log_level(config_path: Option<&PathBuf>, plugin_dir: &Path) -> Option<String> {
        let path = config_path
            .cloned()
            .unwrap_or_else(|| plugin_dir.join(CONFIG_FILE_NAME));
        let content = fs::read_to_string(path).ok()?;
        let config: Self = serde_yaml::from_str(&content).ok()?;
        config.log_level
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Write the configuration as YAML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Tick monitor defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickMonitorConfig {
    /// Report ticks exceeding the average by more than this percentage
    #[serde(rename = "report-threshold-percent")]
    pub report_threshold_percent: u64,

    /// Ticks observed before the average tick duration is fixed
    #[serde(rename = "warmup-ticks")]
    pub warmup_ticks: u64,
}

impl Default for TickMonitorConfig {
    fn default() -> Self {
        Self {
            report_threshold_percent: 100,
            warmup_ticks: 120,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.viewer_url, "https://spark.lucko.me/");
        assert_eq!(config.bytebin_url, "https://bytebin.lucko.me/");
        assert_eq!(config.upload_timeout(), Duration::from_secs(30));
        assert_eq!(config.tick_monitor.report_threshold_percent, 100);
        assert_eq!(config.tick_monitor.warmup_ticks, 120);
        assert!(config.log_level.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp = tempdir().unwrap();
        let config = Config::load(None, temp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = tempdir().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE_NAME),
            "viewer-url: https://viewer.example/\ntick-monitor:\n  warmup-ticks: 40\n",
        )
        .unwrap();

        let config = Config::load(None, temp.path()).unwrap();
        assert_eq!(config.viewer_url, "https://viewer.example/");
        assert_eq!(config.bytebin_url, "https://bytebin.lucko.me/");
        assert_eq!(config.tick_monitor.warmup_ticks, 40);
        assert_eq!(config.tick_monitor.report_threshold_percent, 100);
    }

    #[test]
    fn test_malformed_plugin_config_falls_back() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "viewer-url: [unterminated").unwrap();
        let config = Config::load(None, temp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope.yml");
        assert!(Config::load(Some(&missing), temp.path()).is_err());
    }

    #[test]
    fn test_save_and_log_level() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join(CONFIG_FILE_NAME);
        let config = Config {
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load_log_level(Some(&path), temp.path()), Some("debug".to_string()));
        assert_eq!(Config::load(Some(&path), temp.path()).unwrap(), config);
    }
}
