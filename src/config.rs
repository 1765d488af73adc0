//! Configuration for the AlertAir dashboard.

use crate::core::alert::{AlertScheme, PollutantSchemes};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Feature columns the default model was trained on, in training order.
pub const DEFAULT_FEATURE_COLUMNS: [&str; 15] = [
    "temp",
    "humidity",
    "wind_speed",
    "wind_dir",
    "pressure",
    "precip",
    "hour",
    "dayofweek",
    "is_weekend",
    "SO2_lag1",
    "SO2_lag2",
    "NH3_lag1",
    "NH3_lag2",
    "industrial_index",
    "traffic_index",
];

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where observations come from
    pub source: SourceConfig,

    /// Serialized regressor
    pub model_path: PathBuf,

    /// Normalization parameters fitted with the model
    pub scaler_path: PathBuf,

    /// Feature columns in model input order
    pub feature_columns: Vec<String>,

    /// Column holding the forecast pollutant
    pub target_column: String,

    /// Hours between the last observation and the forecast
    pub horizon_hours: u32,

    /// Hours of history shown on the dashboard
    pub history_hours: usize,

    /// Alert thresholds
    pub alert: AlertScheme,

    /// Thresholds for the latest observed SO₂ and NH₃ readings
    pub current_alerts: PollutantSchemes,

    pub site: SiteConfig,

    /// IANA zone for displayed times and naive CSV timestamps
    pub timezone: String,

    /// Raw CSV header -> canonical column name
    pub column_aliases: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            model_path: PathBuf::from("artifacts/model_so2_3h.json"),
            scaler_path: PathBuf::from("artifacts/scaler_so2_3h.json"),
            feature_columns: DEFAULT_FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            target_column: "so2".to_string(),
            horizon_hours: 3,
            history_hours: 24,
            alert: AlertScheme::default(),
            current_alerts: PollutantSchemes::default(),
            site: SiteConfig::default(),
            timezone: "Africa/Tunis".to_string(),
            column_aliases: default_aliases(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
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
            .join("alertair")
            .join("config.json")
    }

    /// Parsed display timezone.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::Invalid(format!("unknown timezone '{}'", self.timezone)))
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;
        self.alert
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("alert scheme: {e}")))?;
        self.current_alerts
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("current alert scheme {e}")))?;
        if self.feature_columns.is_empty() {
            return Err(ConfigError::Invalid("no feature columns".to_string()));
        }
        if self.horizon_hours == 0 {
            return Err(ConfigError::Invalid("horizon_hours must be positive".to_string()));
        }
        Ok(())
    }
}

/// Where observations are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A CSV export of hourly readings
    Csv { path: PathBuf },
    /// Deterministic synthetic series
    Fixture { hours: usize, seed: u64 },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Csv {
            path: PathBuf::from("data/gabes_air_quality.csv"),
        }
    }
}

impl SourceConfig {
    /// Fixture settings used by `--fixture`.
    pub fn default_fixture() -> Self {
        SourceConfig::Fixture {
            hours: 72,
            seed: 42,
        }
    }
}

/// The monitored site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub zoom: u8,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "Gabès – Zone industrielle (GCT)".to_string(),
            latitude: 33.88,
            longitude: 10.11,
            zoom: 11,
        }
    }
}

/// Header names used by the station export.
fn default_aliases() -> BTreeMap<String, String> {
    [
        ("datetime", "timestamp"),
        ("temperature_C", "temp"),
        ("humidity_%", "humidity"),
        ("wind_speed_m_s", "wind_speed"),
        ("wind_dir_deg", "wind_dir"),
        ("pressure_hPa", "pressure"),
        ("precip_mm", "precip"),
        ("SO2_ug_m3", "so2"),
        ("NH3_ug_m3", "nh3"),
    ]
    .into_iter()
    .map(|(raw, canonical)| (raw.to_string(), canonical.to_string()))
    .collect()
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
