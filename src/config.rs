//! Configuration loading for docbox-admin.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.docbox-admin/config.toml` (user)
//! 3. `/etc/docbox-admin/config.toml` (system)
//! 4. Built-in defaults
//!
//! `DOCBOX_ADMIN_SERVER_BASE_URL` overrides `server.base_url` afterwards.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::DEFAULT_BASE_URL;
use crate::query::{QueryConfig, RetryConfig};
use crate::{AdminError, Result};

/// Environment variable overriding the admin API base URL.
pub const BASE_URL_ENV: &str = "DOCBOX_ADMIN_SERVER_BASE_URL";

/// Client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

/// Admin API connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the admin API (default: http://127.0.0.1:8080/api/).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Read cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    /// Seconds an entry without subscribers is kept (default: 300).
    #[serde(default = "default_gc_time")]
    pub gc_time_secs: u64,
    /// Seconds until loaded data goes stale on its own (default: 0, so a
    /// new view or key change always refetches while showing cached data).
    #[serde(default)]
    pub stale_time_secs: u64,
    /// Maximum entries kept without subscribers (default: 1000).
    #[serde(default = "default_max_retained")]
    pub max_retained: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            gc_time_secs: default_gc_time(),
            stale_time_secs: 0,
            max_retained: default_max_retained(),
        }
    }
}

fn default_gc_time() -> u64 {
    300
}

fn default_max_retained() -> u64 {
    1_000
}

/// Read retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// Attempts including the first (default: 4).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
        }
    }
}

fn default_max_attempts() -> u32 {
    4
}

fn default_initial_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

impl AdminConfig {
    /// Load configuration from the standard locations, then apply the
    /// environment override.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AdminError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            AdminError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            self.server.base_url = base_url;
        }
    }

    /// Resolve the config file path. `None` means use defaults.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(AdminError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".docbox-admin").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/docbox-admin/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.retry.max_attempts.max(1))
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .max_delay(Duration::from_millis(self.retry.max_delay_ms))
    }

    pub fn query_config(&self) -> QueryConfig {
        QueryConfig::new()
            .retry(self.retry_config())
            .gc_time(Duration::from_secs(self.cache.gc_time_secs))
            .stale_time(Some(Duration::from_secs(self.cache.stale_time_secs)))
            .max_retained(self.cache.max_retained)
    }
}
