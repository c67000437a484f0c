//! Configuration for the Sense Guardian engine.

use crate::core::Thresholds;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the engine and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time between simulated readings
    #[serde(with = "duration_serde")]
    pub tick_interval: Duration,

    /// Instantaneous alert bounds
    pub thresholds: Thresholds,

    /// IANA timezone used when printing timestamps
    pub display_timezone: String,

    /// Fallback `tracing` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            thresholds: Thresholds::default(),
            display_timezone: "UTC".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if !value.is_object() {
            return Err(ConfigError::ParseError("expected a JSON object".to_string()));
        }

        let config: Config =
            serde_json::from_value(value).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sense-guardian")
            .join("config.json")
    }

    /// The display timezone.
    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.display_timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidTimezone(self.display_timezone.clone()))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.timezone()?;

        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidValue("tick_interval must be positive".into()));
        }

        let t = &self.thresholds;
        if t.heart_low >= t.heart_high {
            return Err(ConfigError::InvalidValue(format!(
                "heart_low ({}) must be below heart_high ({})",
                t.heart_low, t.heart_high
            )));
        }
        if t.motion_low >= t.motion_high || t.sound_low >= t.sound_high {
            return Err(ConfigError::InvalidValue(
                "channel lower bounds must be below upper bounds".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidTimezone(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidTimezone(tz) => write!(f, "Unknown timezone: {tz}"),
            ConfigError::InvalidValue(e) => write!(f, "Invalid value: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tick_interval, Duration::from_secs(3));
        assert_eq!(config.thresholds.heart_high, 100.0);
        assert_eq!(config.timezone().unwrap(), chrono_tz::UTC);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let config =
            Config::from_json(r#"{"tick_interval": 5, "display_timezone": "America/New_York"}"#)
                .unwrap();
        assert_eq!(config.tick_interval, Duration::from_secs(5));
        assert_eq!(config.timezone().unwrap(), chrono_tz::America::New_York);
        assert_eq!(config.thresholds, Thresholds::default());
    }

    #[test]
    fn test_roundtrip_through_json() {
        let mut config = Config::default();
        config.thresholds.sound_high = 85.0;
        let json = serde_json::to_string(&config).unwrap();
        let back = Config::from_json(&json).unwrap();
        assert_eq!(back.thresholds.sound_high, 85.0);
        assert_eq!(back.tick_interval, config.tick_interval);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_json(r#"{"display_timezone": "Mars/Olympus"}"#),
            Err(ConfigError::InvalidTimezone(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"tick_interval": 0}"#),
            Err(ConfigError::InvalidValue(_))
        ));
        let mut inverted = Config::default();
        inverted.thresholds.heart_low = 120.0;
        let json = serde_json::to_string(&inverted).unwrap();
        assert!(matches!(Config::from_json(&json), Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(matches!(Config::from_json("[]"), Err(ConfigError::ParseError(_))));
        assert!(matches!(Config::from_json("3"), Err(ConfigError::ParseError(_))));
        assert!(matches!(Config::from_json("null"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir()
            .join(format!("sense-guardian-config-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join("config.json");
        assert_eq!(Config::load_from(&path).unwrap().thresholds, Thresholds::default());

        let mut config = Config::default();
        config.tick_interval = Duration::from_secs(7);
        config.display_timezone = "Europe/London".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.tick_interval, Duration::from_secs(7));
        assert_eq!(loaded.timezone().unwrap(), chrono_tz::Europe::London);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
