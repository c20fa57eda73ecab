//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::Duration;

use airwatch_core::{
    AqiTables, DEFAULT_BROADCAST_BUFFER, DEFAULT_CAPACITY, PipelineConfig, ThresholdConfig,
    TrendConfig, ValidatorConfig,
};

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// History buffer settings.
    pub history: HistoryConfig,
    /// Safe ranges used for status analysis.
    pub thresholds: ThresholdConfig,
    /// Noise floors for trend detection.
    pub trend: TrendConfig,
    /// Plausibility checks on submitted readings.
    pub validation: ValidatorConfig,
    /// Replacement AQI tables. The built-in EPA tables are used when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aqi: Option<AqiTables>,
    /// Simulated sensor feed.
    pub simulator: SimulatorConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Validate the configuration and return every problem found.
    ///
    /// # Example
    ///
    /// ```
    /// use airwatch_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.history.validate());
        errors.extend(self.simulator.validate());

        if let Err(e) = self.thresholds.validate() {
            errors.push(ValidationError::from_core("thresholds", e));
        }
        if let Some(tables) = &self.aqi
            && let Err(e) = tables.validate()
        {
            errors.push(ValidationError::from_core("aqi", e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Engine settings derived from this configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            capacity: self.history.capacity,
            retention: self.history.retention(),
            thresholds: self.thresholds.clone(),
            aqi: self.aqi.clone().unwrap_or_default(),
            trend: self.trend.clone(),
            validator: self.validation.clone(),
            broadcast_buffer: self.server.broadcast_buffer,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:5000").
    pub bind: String,
    /// Events buffered per WebSocket client before it starts missing readings.
    pub broadcast_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            broadcast_buffer: DEFAULT_BROADCAST_BUFFER,
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
        } else {
            match self.bind.rsplit_once(':') {
                None => errors.push(ValidationError::new(
                    "server.bind",
                    format!(
                        "invalid bind address '{}': expected format 'host:port'",
                        self.bind
                    ),
                )),
                Some((_, port)) => match port.parse::<u16>() {
                    Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                    Err(_) => errors.push(ValidationError::new(
                        "server.bind",
                        format!("invalid port '{}': must be a number 1-65535", port),
                    )),
                    Ok(_) => {}
                },
            }
        }

        if self.broadcast_buffer == 0 {
            errors.push(ValidationError::new(
                "server.broadcast_buffer",
                "broadcast buffer must be at least 1",
            ));
        }

        errors
    }
}

/// History buffer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of stored readings.
    pub capacity: usize,
    /// Hours of history kept behind the newest reading.
    pub retention_hours: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            retention_hours: 7 * 24,
        }
    }
}

impl HistoryConfig {
    /// Retention as a duration.
    pub fn retention(&self) -> Duration {
        Duration::hours(i64::from(self.retention_hours))
    }

    /// Validate history configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.capacity == 0 {
            errors.push(ValidationError::new(
                "history.capacity",
                "capacity must be at least 1",
            ));
        }
        if self.retention_hours == 0 {
            errors.push(ValidationError::new(
                "history.retention_hours",
                "retention must be at least 1 hour",
            ));
        }

        errors
    }
}

/// Simulated sensor feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Whether to generate readings in the background.
    pub enabled: bool,
    /// Seconds between simulated readings.
    pub interval_secs: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: 10,
        }
    }
}

impl SimulatorConfig {
    /// Minimum interval between simulated readings.
    pub const MIN_INTERVAL: u64 = 1;
    /// Maximum interval between simulated readings.
    pub const MAX_INTERVAL: u64 = 3600;

    /// Validate simulator configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if !(Self::MIN_INTERVAL..=Self::MAX_INTERVAL).contains(&self.interval_secs) {
            errors.push(ValidationError::new(
                "simulator.interval_secs",
                format!(
                    "interval must be between {} and {} seconds (got {})",
                    Self::MIN_INTERVAL,
                    Self::MAX_INTERVAL,
                    self.interval_secs
                ),
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `history.capacity`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    fn from_core(field: &str, error: airwatch_core::Error) -> Self {
        let message = match error {
            airwatch_core::Error::InvalidConfig(msg) => msg,
            other => other.to_string(),
        };
        Self::new(field, message)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("airwatch")
        .join("server.toml")
}
