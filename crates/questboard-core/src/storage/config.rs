//! TOML-based application configuration.
//!
//! Stores:
//! - The fixed timezone every period key is computed in
//! - Storage backend and document file names
//! - Backup retention
//! - Streak policy
//! - Notification sink settings
//! - Times of day for the maintenance jobs
//!
//! Configuration is stored at `<data dir>/config.toml`.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::streak::StreakPolicy;

/// Which backend holds the catalog, ledger and user documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One pretty-printed JSON file per document
    #[default]
    Json,
    /// One SQLite database holding every document
    Sqlite,
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
    #[serde(default = "default_users_file")]
    pub users_file: String,
    #[serde(default = "default_sqlite_file")]
    pub sqlite_file: String,
}

/// Backup retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_keep_days")]
    pub keep_days: u32,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Endpoint receiving `{"chat_id", "text"}` posts. Deliveries are only
    /// logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_expiring_within_days")]
    pub expiring_within_days: u32,
}

/// Times of day (`HH:MM`, local) for the maintenance jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_reset_time")]
    pub reset_daily: String,
    #[serde(default = "default_reset_time")]
    pub reset_weekly: String,
    #[serde(default = "default_reset_weekly_weekday")]
    pub reset_weekly_weekday: String,
    #[serde(default = "default_refresh_events")]
    pub refresh_events: String,
    #[serde(default = "default_send_daily")]
    pub send_daily: String,
    #[serde(default = "default_notify_expiring")]
    pub notify_expiring: String,
    #[serde(default = "default_backup_time")]
    pub backup: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hours east of UTC used for every date computation.
    #[serde(default = "default_timezone_offset_hours")]
    pub timezone_offset_hours: i32,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub streak: StreakPolicy,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

// Default functions
fn default_timezone_offset_hours() -> i32 {
    9
}
fn default_catalog_file() -> String {
    "quests.json".into()
}
fn default_ledger_file() -> String {
    "checklist.json".into()
}
fn default_users_file() -> String {
    "users.json".into()
}
fn default_sqlite_file() -> String {
    "questboard.db".into()
}
fn default_keep_days() -> u32 {
    7
}
fn default_true() -> bool {
    true
}
fn default_expiring_within_days() -> u32 {
    1
}
fn default_reset_time() -> String {
    "05:00".into()
}
fn default_reset_weekly_weekday() -> String {
    "mon".into()
}
fn default_refresh_events() -> String {
    "05:05".into()
}
fn default_send_daily() -> String {
    "08:00".into()
}
fn default_notify_expiring() -> String {
    "20:00".into()
}
fn default_backup_time() -> String {
    "04:00".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            catalog_file: default_catalog_file(),
            ledger_file: default_ledger_file(),
            users_file: default_users_file(),
            sqlite_file: default_sqlite_file(),
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            keep_days: default_keep_days(),
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            expiring_within_days: default_expiring_within_days(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            reset_daily: default_reset_time(),
            reset_weekly: default_reset_time(),
            reset_weekly_weekday: default_reset_weekly_weekday(),
            refresh_events: default_refresh_events(),
            send_daily: default_send_daily(),
            notify_expiring: default_notify_expiring(),
            backup: default_backup_time(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone_offset_hours: default_timezone_offset_hours(),
            storage: StorageConfig::default(),
            backup: BackupConfig::default(),
            streak: StreakPolicy::default(),
            notifications: NotificationsConfig::default(),
            schedule: ScheduleConfig::default(),
        }
    }
}

/// Parse `HH:MM`.
pub fn parse_time_of_day(key: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|e| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not HH:MM: {e}"),
    })
}

pub fn parse_weekday(key: &str, value: &str) -> Result<Weekday, ConfigError> {
    value.trim().parse::<Weekday>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("'{value}' is not a weekday"),
    })
}

impl ScheduleConfig {
    /// `(key, value)` pairs of every time-of-day setting.
    pub fn times(&self) -> [(&'static str, &str); 6] {
        [
            ("schedule.reset_daily", &self.reset_daily),
            ("schedule.reset_weekly", &self.reset_weekly),
            ("schedule.refresh_events", &self.refresh_events),
            ("schedule.send_daily", &self.send_daily),
            ("schedule.notify_expiring", &self.notify_expiring),
            ("schedule.backup", &self.backup),
        ]
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as bool")))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as integer")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Path of the config file inside `dir`.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("config.toml")
    }

    /// Load from the default data directory, writing defaults on first run.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("."),
            message: e.to_string(),
        })?;
        Self::load_from(&dir)
    }

    /// Load from `dir`, writing defaults if no config file exists yet.
    pub fn load_from(dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(dir);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(dir)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
        }
    }

    /// Persist into `dir`.
    pub fn save_to(&self, dir: &Path) -> Result<(), ConfigError> {
        let path = Self::path_in(dir);
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.clone(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::create_dir_all(dir).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(&path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(-23..=23).contains(&self.timezone_offset_hours) {
            return Err(ConfigError::InvalidValue {
                key: "timezone_offset_hours".into(),
                message: format!("{} is outside -23..=23", self.timezone_offset_hours),
            });
        }
        for (key, value) in self.schedule.times() {
            parse_time_of_day(key, value)?;
        }
        parse_weekday("schedule.reset_weekly_weekday", &self.schedule.reset_weekly_weekday)?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
