//! Meetbell configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{MeetbellError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MeetbellConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl MeetbellConfig {
    /// Load config from the default path (~/.meetbell/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MeetbellError::Config(format!("Failed to read config: {e}")))?;
        let mut config: Self = toml::from_str(&content)
            .map_err(|e| MeetbellError::Config(format!("Failed to parse config: {e}")))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Save config to a path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| MeetbellError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Meetbell home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".meetbell")
    }

    /// Secrets may come from the environment instead of the file.
    fn apply_env(&mut self) {
        if self.email.password.is_empty()
            && let Ok(pw) = std::env::var("MEETBELL_SMTP_PASSWORD")
        {
            self.email.password = pw;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.scheduler.sweep_interval_secs == 0 {
            return Err(MeetbellError::Config(
                "scheduler.sweep_interval_secs must be > 0".into(),
            ));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.scheduler.retention_days) {
            return Err(MeetbellError::Config(format!(
                "scheduler.retention_days must be between 1 and {MAX_RETENTION_DAYS}"
            )));
        }
        if self.scheduler.eviction_interval_secs == 0 {
            return Err(MeetbellError::Config(
                "scheduler.eviction_interval_secs must be > 0".into(),
            ));
        }
        if self.email.enabled && (self.email.smtp_host.is_empty() || self.email.from.is_empty()) {
            return Err(MeetbellError::Config(
                "email.smtp_host and email.from are required when email is enabled".into(),
            ));
        }
        if self.webhook.enabled && self.webhook.url.is_empty() {
            return Err(MeetbellError::Config(
                "webhook.url is required when webhook is enabled".into(),
            ));
        }
        Ok(())
    }
}

/// Upper bound on `scheduler.retention_days` (ten years).
pub const MAX_RETENTION_DAYS: i64 = 3650;

/// Reminder engine cadences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_eviction_interval")]
    pub eviction_interval_secs: u64,
    /// Completed meetings older than this are deleted.
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
    /// Re-arm per-meeting timers from the store when the supervisor starts.
    #[serde(default = "bool_true")]
    pub rearm_timers_on_start: bool,
}

fn bool_true() -> bool { true }
fn default_sweep_interval() -> u64 { 60 }
fn default_eviction_interval() -> u64 { 24 * 60 * 60 }
fn default_retention_days() -> i64 { 7 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            eviction_interval_secs: default_eviction_interval(),
            retention_days: default_retention_days(),
            rearm_timers_on_start: true,
        }
    }
}

/// Meeting store backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_store_backend")]
    pub backend: String,
    #[serde(default = "default_store_path")]
    pub path: String,
}

fn default_store_backend() -> String { "sqlite".into() }
fn default_store_path() -> String { "~/.meetbell/meetings.db".into() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

impl StoreConfig {
    /// Store path with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).to_string())
    }
}

/// SMTP delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Sender address.
    #[serde(default)]
    pub from: String,
    #[serde(default = "default_display_name")]
    pub display_name: String,
}

fn default_smtp_port() -> u16 { 587 }
fn default_display_name() -> String { "Meetbell".into() }

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            display_name: default_display_name(),
        }
    }
}

/// HTTP webhook delivery. POSTs every notification as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}
