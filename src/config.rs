//! Configuration system using Figment.
//!
//! Settings load from a TOML file merged over compiled defaults, with
//! environment overrides prefixed `FURNACE_` (nested keys split on `__`,
//! e.g. `FURNACE_SERIAL__BAUD_RATE=19200`). The furnace table is static
//! input: a list of `{port, name}` pairs whose identifiers the core treats
//! as opaque strings.

use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::ReadMode;
use crate::error::AppResult;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File or environment extraction failed.
    #[error("Configuration load error: {0}")]
    Load(#[from] figment::Error),
    /// Values parsed but are logically invalid.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Application-wide settings.
    pub application: ApplicationSettings,
    /// Serial line parameters shared by every furnace.
    pub serial: SerialSettings,
    /// Static furnace table.
    pub furnaces: Vec<FurnaceEntry>,
}

/// Application-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationSettings {
    /// Polling cadence for continuous readout.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// Display event channel capacity per subscriber.
    pub broadcast_channel_capacity: usize,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            broadcast_channel_capacity: 64,
        }
    }
}

/// Serial line parameters, fixed for all furnaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Symbol rate.
    pub baud_rate: u32,
    /// Write-to-read settle delay in milliseconds.
    pub settle_delay_ms: u64,
    /// Reply timeout in milliseconds; bounds worst-case exchange latency.
    pub read_timeout_ms: u64,
}

impl SerialSettings {
    /// Settle delay as a [`Duration`].
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            settle_delay_ms: 50,
            read_timeout_ms: 1000,
        }
    }
}

/// One furnace: line identifier plus display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FurnaceEntry {
    /// Opaque serial line identifier (e.g. `COM1`, `/dev/ttyUSB0`).
    pub port: String,
    /// Display name shown on the panel.
    pub name: String,
    /// Initially selected read mode.
    #[serde(default)]
    pub mode: ReadMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application: ApplicationSettings::default(),
            serial: SerialSettings::default(),
            furnaces: vec![
                FurnaceEntry {
                    port: "COM1".to_string(),
                    name: "Piec Fluke 9142 MID".to_string(),
                    mode: ReadMode::default(),
                },
                FurnaceEntry {
                    port: "COM2".to_string(),
                    name: "Piec Fluke 9144".to_string(),
                    mode: ReadMode::default(),
                },
                FurnaceEntry {
                    port: "COM3".to_string(),
                    name: "Piec Fluke 9142".to_string(),
                    mode: ReadMode::default(),
                },
            ],
        }
    }
}

impl Settings {
    /// Load from the default path (`config/default.toml`), compiled defaults
    /// and `FURNACE_` environment overrides included.
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/default.toml")
    }

    /// Load from a specific TOML file. A missing file falls back to the
    /// compiled defaults; a present but malformed one is an error.
    pub fn load_from(path: impl AsRef<Path>) -> AppResult<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("FURNACE_").split("__"))
            .extract()
            .map_err(ConfigError::from)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.furnaces.is_empty() {
            return Err(ConfigError::Validation(
                "at least one furnace entry is required".to_string(),
            ));
        }
        for entry in &self.furnaces {
            if entry.port.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "furnace '{}' has an empty port identifier",
                    entry.name
                )));
            }
        }
        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation("baud_rate must be non-zero".to_string()));
        }
        if self.application.poll_interval.is_zero() {
            return Err(ConfigError::Validation(
                "poll_interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn defaults_reproduce_the_three_port_table() {
        let settings = Settings::default();
        assert_eq!(settings.application.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.serial.settle_delay(), Duration::from_millis(50));
        assert_eq!(settings.serial.read_timeout(), Duration::from_secs(1));
        assert_eq!(settings.furnaces.len(), 3);
        assert_eq!(settings.furnaces[0].port, "COM1");
        assert_eq!(settings.furnaces[1].name, "Piec Fluke 9144");
        assert_eq!(settings.furnaces[0].mode, ReadMode::Furnace);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = Settings::load_from("/nonexistent/furnace.toml").expect("defaults should load");
        assert_eq!(settings.furnaces.len(), 3);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        writeln!(
            file,
            r#"
[application]
poll_interval = "500ms"

[serial]
baud_rate = 19200

[[furnaces]]
port = "/dev/ttyUSB0"
name = "Piec testowy"
mode = "all"
"#
        )
        .expect("failed to write temp config");

        let settings = Settings::load_from(file.path()).expect("failed to load settings");
        assert_eq!(
            settings.application.poll_interval,
            Duration::from_millis(500)
        );
        assert_eq!(settings.serial.baud_rate, 19200);
        // A furnace table in the file replaces the default table entirely.
        assert_eq!(settings.furnaces.len(), 1);
        assert_eq!(settings.furnaces[0].port, "/dev/ttyUSB0");
        assert_eq!(settings.furnaces[0].mode, ReadMode::All);
        // The untouched section keeps its defaults.
        assert_eq!(settings.serial.read_timeout_ms, 1000);
    }

    #[test]
    fn empty_furnace_table_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        writeln!(file, "furnaces = []").expect("failed to write temp config");

        let err = Settings::load_from(file.path()).err();
        assert!(err.is_some());
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("at least one furnace"), "got: {message}");
    }

    #[test]
    fn blank_port_fails_validation() {
        let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
        writeln!(
            file,
            r#"
[[furnaces]]
port = "  "
name = "Piec"
"#
        )
        .expect("failed to write temp config");

        assert!(Settings::load_from(file.path()).is_err());
    }
}
