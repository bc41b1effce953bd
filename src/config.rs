//! Configuration file support for labelcheck.
//!
//! This module provides serialization and deserialization of user settings:
//! preferences that tune the session and the recent-files lists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTOSAVE_DEBOUNCE, DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_EXCLUDED_LABEL,
    DEFAULT_GATING_LABEL, DEFAULT_UNDO_CAPACITY, MAX_RECENT_FILES,
};
use crate::event::FileKind;
use crate::session::SessionConfig;

/// Log level setting for the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Get the display name for this log level.
    pub fn name(&self) -> &'static str {
        match self {
            LogLevel::Error => "Error",
            LogLevel::Warn => "Warn",
            LogLevel::Info => "Info",
            LogLevel::Debug => "Debug",
            LogLevel::Trace => "Trace",
        }
    }

    /// Get all log levels in order from least to most verbose.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ]
    }

    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Persisted application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the configuration file format
    pub version: u32,

    /// Application name (for identification)
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// User preferences
    #[serde(default)]
    pub preferences: UserPreferences,

    /// Recently opened files
    #[serde(default)]
    pub recent: RecentFiles,
}

fn default_app_name() -> String {
    "labelcheck".to_string()
}

/// User preferences section of the config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferences {
    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Whether corrections are saved automatically
    #[serde(default = "default_autosave")]
    pub autosave: bool,

    /// Minimum seconds between automatic saves
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,

    /// Number of correction batches kept for undo
    #[serde(default = "default_undo_capacity")]
    pub undo_capacity: usize,

    /// Preprocessing label that admits records to classification
    #[serde(default = "default_gating_label")]
    pub gating_label: String,

    /// Label value hidden from the selectable labels
    #[serde(default = "default_excluded_label")]
    pub excluded_label: String,
}

fn default_autosave() -> bool {
    true
}

fn default_autosave_interval_secs() -> u64 {
    DEFAULT_AUTOSAVE_INTERVAL.as_secs()
}

fn default_undo_capacity() -> usize {
    DEFAULT_UNDO_CAPACITY
}

fn default_gating_label() -> String {
    DEFAULT_GATING_LABEL.to_string()
}

fn default_excluded_label() -> String {
    DEFAULT_EXCLUDED_LABEL.to_string()
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            autosave: default_autosave(),
            autosave_interval_secs: default_autosave_interval_secs(),
            undo_capacity: default_undo_capacity(),
            gating_label: default_gating_label(),
            excluded_label: default_excluded_label(),
        }
    }
}

impl From<&UserPreferences> for SessionConfig {
    fn from(prefs: &UserPreferences) -> Self {
        Self {
            autosave: prefs.autosave,
            autosave_interval: Duration::from_secs(prefs.autosave_interval_secs),
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            undo_capacity: prefs.undo_capacity,
            gating_label: prefs.gating_label.clone(),
            excluded_label: prefs.excluded_label.clone(),
        }
    }
}

/// Most-recently-used file lists, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFiles {
    /// Recently opened data files
    #[serde(default)]
    pub data_files: Vec<PathBuf>,

    /// Recently opened label-code lists
    #[serde(default)]
    pub label_files: Vec<PathBuf>,
}

impl RecentFiles {
    /// Move `path` to the front of the list for `kind`.
    ///
    /// An existing entry is moved rather than duplicated; the list is capped
    /// at [`MAX_RECENT_FILES`] entries.
    pub fn push(&mut self, path: PathBuf, kind: FileKind) {
        let list = match kind {
            FileKind::Data => &mut self.data_files,
            FileKind::Labels => &mut self.label_files,
        };
        list.retain(|p| p != &path);
        list.insert(0, path);
        list.truncate(MAX_RECENT_FILES);
    }

    /// List for `kind`.
    pub fn get(&self, kind: FileKind) -> &[PathBuf] {
        match kind {
            FileKind::Data => &self.data_files,
            FileKind::Labels => &self.label_files,
        }
    }
}

impl AppConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self {
            version: CONFIG_VERSION,
            app_name: default_app_name(),
            preferences: UserPreferences::default(),
            recent: RecentFiles::default(),
        }
    }

    /// Session settings derived from the preferences.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::from(&self.preferences)
    }

    /// Serialize the configuration to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;

        // Validate version compatibility
        if config.version > CONFIG_VERSION {
            return Err(ConfigError::VersionTooNew {
                file_version: config.version,
                supported_version: CONFIG_VERSION,
            });
        }

        Ok(config)
    }

    /// Get the default filename for the settings file.
    pub fn default_filename() -> &'static str {
        "settings.json"
    }

    /// Get the default config file path for auto-load/save.
    pub fn default_path() -> Option<PathBuf> {
        // Try to use XDG config directory, fall back to home directory
        if let Some(config_dir) = dirs::config_dir() {
            Some(config_dir.join("labelcheck").join(Self::default_filename()))
        } else {
            dirs::home_dir().map(|home_dir| {
                home_dir
                    .join(".config")
                    .join("labelcheck")
                    .join(Self::default_filename())
            })
        }
    }

    /// Load configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = self.to_json()?;
        std::fs::write(path, json)?;
        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Try to load configuration from the default path.
    /// Returns None if the file doesn't exist or can't be read.
    pub fn load_from_default_path() -> Option<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            log::debug!("No config file found at {:?}", path);
            return None;
        }

        match Self::load_from(&path) {
            Ok(config) => {
                log::info!("Loaded configuration from {:?}", path);
                Some(config)
            }
            Err(e) => {
                log::warn!("Failed to load config file {:?}: {}", path, e);
                None
            }
        }
    }

    /// Save configuration to the default path.
    pub fn save_to_default_path(&self) -> Result<(), ConfigError> {
        let path = Self::default_path().ok_or_else(|| {
            ConfigError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory",
            ))
        })?;
        self.save_to(&path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Configuration version is newer than supported
    #[error(
        "Configuration file version {file_version} is newer than supported version {supported_version}"
    )]
    VersionTooNew {
        /// Version found in the file
        file_version: u32,
        /// Highest version this build reads
        supported_version: u32,
    },

    /// I/O error when reading/writing config
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = AppConfig::new();
        let json = config.to_json().unwrap();
        let parsed = AppConfig::from_json(&json).unwrap();

        assert_eq!(parsed.version, CONFIG_VERSION);
        assert_eq!(parsed.preferences.autosave_interval_secs, 300);
        assert_eq!(parsed.preferences.undo_capacity, 50);
        assert_eq!(parsed.preferences.gating_label, "object");
        assert_eq!(parsed.preferences.excluded_label, "not_included");
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"version": 1, "preferences": {"log_level": "debug"}}"#;
        let config = AppConfig::from_json(json).unwrap();

        assert_eq!(config.app_name, "labelcheck");
        assert_eq!(config.preferences.log_level, LogLevel::Debug);
        assert!(config.preferences.autosave);
        assert!(config.recent.data_files.is_empty());
    }

    #[test]
    fn test_version_too_new() {
        let json = r#"{"version": 999}"#;
        let result = AppConfig::from_json(json);
        assert!(matches!(result, Err(ConfigError::VersionTooNew { .. })));
    }

    #[test]
    fn test_recent_files_mru() {
        let mut recent = RecentFiles::default();
        for i in 0..12 {
            recent.push(PathBuf::from(format!("f{i}.csv")), FileKind::Data);
        }
        recent.push(PathBuf::from("f5.csv"), FileKind::Data);
        recent.push(PathBuf::from("labels.csv"), FileKind::Labels);

        let data = recent.get(FileKind::Data);
        assert_eq!(data.len(), MAX_RECENT_FILES);
        assert_eq!(data[0], PathBuf::from("f5.csv"));
        assert_eq!(data[1], PathBuf::from("f11.csv"));
        assert_eq!(data.iter().filter(|p| **p == PathBuf::from("f5.csv")).count(), 1);
        assert_eq!(recent.get(FileKind::Labels), [PathBuf::from("labels.csv")]);
    }

    #[test]
    fn test_session_config_from_preferences() {
        let mut config = AppConfig::new();
        config.preferences.autosave_interval_secs = 30;
        config.preferences.undo_capacity = 7;

        let session = config.session_config();
        assert_eq!(session.autosave_interval, Duration::from_secs(30));
        assert_eq!(session.undo_capacity, 7);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut config = AppConfig::new();
        config.recent.push(PathBuf::from("/data/a.csv"), FileKind::Data);
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.recent, config.recent);
    }

    #[test]
    fn test_log_level_filter() {
        assert_eq!(LogLevel::Warn.to_level_filter(), log::LevelFilter::Warn);
        assert_eq!(LogLevel::all().len(), 5);
    }
}
