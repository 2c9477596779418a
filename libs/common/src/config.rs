//! Gauge configuration: logging, polling cadence, static variables and the
//! channel list
//!
//! Loaded with figment from a YAML, TOML or JSON file (chosen by extension),
//! then overridden by `GAUGE_`-prefixed environment variables, where `__`
//! separates nesting levels (`GAUGE_POLLING__INTERVAL_MS=250`).

use crate::error::{Error, Result};
use figment::{
    providers::{Env, Format, Json, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "GAUGE_";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GaugeConfig {
    pub logging: LoggingConfig,
    pub polling: PollingConfig,
    /// Static variable values available to every channel
    pub variables: BTreeMap<String, f64>,
    pub channels: Vec<ChannelConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; falls back to `info,<binary>=debug`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// JSON lines in the log file
    pub json: bool,
    /// Directory for daily log files; console only when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self { interval_ms: 1000 }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// One computed output: a name bound to an expression
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ChannelConfig {
    pub name: String,
    pub expression: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            enabled: true,
            description: None,
        }
    }
}

impl GaugeConfig {
    /// Check cross-field constraints
    ///
    /// Expression syntax is not checked here; malformed expressions are
    /// reported and skipped when the channel set is compiled.
    pub fn validate(&self) -> Result<()> {
        if self.polling.interval_ms == 0 {
            return Err(Error::config("polling.interval_ms must be greater than 0"));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.name.trim().is_empty() {
                return Err(Error::config("Channel name must not be empty"));
            }
            if !seen.insert(channel.name.to_lowercase()) {
                return Err(Error::DuplicateChannel(channel.name.clone()));
            }
        }
        Ok(())
    }
}

fn file_figment(path: &Path) -> Result<Figment> {
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .ok_or_else(|| Error::config("Config file must have an extension"))?;

    let figment = match extension {
        "toml" => Figment::new().merge(Toml::file(path)),
        "yaml" | "yml" => Figment::new().merge(Yaml::file(path)),
        "json" => Figment::new().merge(Json::file(path)),
        _ => {
            return Err(Error::Config(format!(
                "Unsupported config file format: {}",
                extension
            )))
        },
    };
    Ok(figment)
}

/// Load and validate configuration from a file plus `GAUGE_*` overrides
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> Result<GaugeConfig> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let config: GaugeConfig = file_figment(path)?
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    config.validate()?;

    info!(
        path = %path.display(),
        channels = config.channels.len(),
        variables = config.variables.len(),
        "Configuration loaded"
    );
    debug!(interval_ms = config.polling.interval_ms, "Polling settings");
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tempfile::TempDir;

    const YAML: &str = r#"
logging:
  level: debug
polling:
  interval_ms: 250
variables:
  limit: 80
channels:
  - name: fan_speed
    expression: "remap(cpu.temp, 30, limit, 0, 100)"
    description: Fan duty from CPU temperature
  - name: spare
    expression: "1 +"
    enabled: false
"#;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let config = load_config_from_file(write(&dir, "gauge.yaml", YAML)).unwrap();

        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.polling.interval(), Duration::from_millis(250));
        assert_eq!(config.variables.get("limit"), Some(&80.0));
        assert_eq!(config.channels.len(), 2);
        assert!(config.channels[0].enabled);
        assert!(!config.channels[1].enabled);
        assert_eq!(
            config.channels[0].description.as_deref(),
            Some("Fan duty from CPU temperature")
        );
    }

    #[test]
    fn test_load_toml_defaults() {
        let dir = TempDir::new().unwrap();
        let toml = r#"
[[channels]]
name = "load"
expression = "avg(a, b)"
"#;
        let config = load_config_from_file(write(&dir, "gauge.toml", toml)).unwrap();
        assert_eq!(config.polling.interval_ms, 1000);
        assert_eq!(config.logging, LoggingConfig::default());
        assert!(config.variables.is_empty());
        assert_eq!(config.channels, vec![ChannelConfig::new("load", "avg(a, b)")]);
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"channels": [{"name": "x", "expression": "1"}]}"#;
        let config = load_config_from_file(write(&dir, "gauge.json", json)).unwrap();
        assert_eq!(config.channels.len(), 1);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let err = load_config_from_file(write(&dir, "gauge.ini", "")).unwrap_err();
        assert!(err.to_string().contains("Unsupported config file format"));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_config_from_file(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_duplicate_channel_names() {
        let config = GaugeConfig {
            channels: vec![ChannelConfig::new("Fan", "1"), ChannelConfig::new("fan", "2")],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::DuplicateChannel(name)) if name == "fan"
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = GaugeConfig {
            polling: PollingConfig { interval_ms: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(GaugeConfig::default().validate().is_ok());
    }
}
