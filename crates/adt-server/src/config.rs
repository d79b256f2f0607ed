//! Service configuration
//!
//! Layered: defaults, then an optional JSON file, then `ADT_*` environment
//! variables. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Result, ServiceError};
use crate::listener::ListenerSettings;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_CATALOG_PATH: &str = "catalog.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub listener: ListenerConfig,
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub path: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CATALOG_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Channel name; empty means the catalog path.
    pub channel: String,
    pub reconnect_seconds: u64,
    pub debounce_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            reconnect_seconds: default_reconnect_seconds(),
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Zero disables the periodic refresher.
    pub interval_seconds: u64,
}

fn default_reconnect_seconds() -> u64 {
    5
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Config {
    /// Defaults, overlaid with `path` when given, overlaid with the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_json(&text)
            .map_err(|e| ServiceError::Config(format!("'{}': {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply `ADT_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(addr) = lookup("ADT_ADDR") {
            self.server.addr = addr;
        }
        if let Some(level) = lookup("ADT_LOG_LEVEL") {
            self.server.log_level = level;
        }
        if let Some(path) = lookup("ADT_CATALOG_PATH") {
            self.catalog.path = PathBuf::from(path);
        }
        if let Some(channel) = lookup("ADT_LISTEN_CHANNEL") {
            self.listener.channel = channel;
        }
        if let Some(secs) = lookup("ADT_LISTEN_RECONNECT_SECONDS") {
            self.listener.reconnect_seconds = parse_u64("ADT_LISTEN_RECONNECT_SECONDS", &secs)?;
        }
        if let Some(secs) = lookup("ADT_REFRESH_INTERVAL_SECONDS") {
            self.refresh.interval_seconds = parse_u64("ADT_REFRESH_INTERVAL_SECONDS", &secs)?;
        }
        Ok(())
    }

    /// Replace empty or zero settings with their defaults.
    pub fn validate(&mut self) {
        if self.server.addr.trim().is_empty() {
            self.server.addr = DEFAULT_ADDR.to_string();
        }
        if self.server.log_level.trim().is_empty() {
            self.server.log_level = DEFAULT_LOG_LEVEL.to_string();
        }
        if self.catalog.path.as_os_str().is_empty() {
            self.catalog.path = PathBuf::from(DEFAULT_CATALOG_PATH);
        }
        if self.listener.reconnect_seconds == 0 {
            self.listener.reconnect_seconds = default_reconnect_seconds();
        }
        if self.listener.debounce_ms == 0 {
            self.listener.debounce_ms = default_debounce_ms();
        }
        if self.listener.poll_interval_ms == 0 {
            self.listener.poll_interval_ms = default_poll_interval_ms();
        }
    }

    pub fn listener_settings(&self) -> ListenerSettings {
        ListenerSettings {
            debounce: Duration::from_millis(self.listener.debounce_ms),
            base_backoff: Duration::from_secs(self.listener.reconnect_seconds),
        }
    }

    /// Notification channel name, defaulting to the catalog path.
    pub fn channel(&self) -> String {
        if self.listener.channel.trim().is_empty() {
            self.catalog.path.display().to_string()
        } else {
            self.listener.channel.clone()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.listener.poll_interval_ms)
    }

    /// `None` when the periodic refresher is disabled.
    pub fn refresh_interval(&self) -> Option<Duration> {
        match self.refresh.interval_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

fn parse_u64(key: &str, value: &str) -> Result<u64> {
    value.trim().parse().map_err(|_| {
        ServiceError::Config(format!(
            "{} must be a non-negative integer, got {:?}",
            key, value
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.catalog.path, PathBuf::from("catalog.json"));
        assert_eq!(config.channel(), "catalog.json");
        assert_eq!(config.listener_settings(), ListenerSettings::default());
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.refresh_interval(), None);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = Config::from_json(
            r#"{"catalog": {"path": "/srv/campaigns.json"}, "refresh": {"interval_seconds": 60}}"#,
        )
        .unwrap();
        assert_eq!(config.server.addr, DEFAULT_ADDR);
        assert_eq!(config.catalog.path, PathBuf::from("/srv/campaigns.json"));
        assert_eq!(config.channel(), "/srv/campaigns.json");
        assert_eq!(config.listener.debounce_ms, 200);
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn env_overrides_file() {
        let mut config = Config::from_json(
            r#"{"server": {"addr": "127.0.0.1:9000"}, "listener": {"channel": "a"}}"#,
        )
        .unwrap();
        let vars = env(&[
            ("ADT_ADDR", "127.0.0.1:9100"),
            ("ADT_LISTEN_CHANNEL", "tg_data_change"),
            ("ADT_LISTEN_RECONNECT_SECONDS", "7"),
            ("ADT_REFRESH_INTERVAL_SECONDS", "30"),
        ]);
        config.apply_env_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.addr, "127.0.0.1:9100");
        assert_eq!(config.channel(), "tg_data_change");
        assert_eq!(config.listener_settings().base_backoff, Duration::from_secs(7));
        assert_eq!(config.refresh_interval(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn bad_numeric_override_is_rejected() {
        let mut config = Config::default();
        let vars = env(&[("ADT_LISTEN_RECONNECT_SECONDS", "soon")]);
        let err = config.apply_env_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[test]
    fn validate_restores_zero_and_empty_values() {
        let mut config = Config::from_json(
            r#"{"server": {"addr": " ", "log_level": ""},
                "listener": {"reconnect_seconds": 0, "debounce_ms": 0, "poll_interval_ms": 0}}"#,
        )
        .unwrap();
        config.validate();
        assert_eq!(config.server.addr, DEFAULT_ADDR);
        assert_eq!(config.server.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.listener, ListenerConfig::default());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = Config::from_file(Path::new("/nonexistent/adt.json")).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
