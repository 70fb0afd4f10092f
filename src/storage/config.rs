//! Rider profile and application configuration.
//!
//! Configuration lives in a TOML file in the platform data directory. Every
//! section has defaults, so a partial or missing file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sensors::control::TransmitterConfig;
use crate::session::control_loop::LoopConfig;
use crate::workouts::engine::DEFAULT_FTP_WATTS;
use crate::world::physics::{DEFAULT_BIKE_MASS_KG, DEFAULT_RIDER_MASS_KG};

/// Rider data used by physics and workout targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderProfile {
    /// Functional Threshold Power in watts (0 = unknown)
    pub ftp: u32,
    /// Rider weight in kilograms
    pub weight_kg: f64,
    /// Bike weight in kilograms
    pub bike_weight_kg: f64,
}

impl Default for RiderProfile {
    fn default() -> Self {
        Self {
            ftp: DEFAULT_FTP_WATTS,
            weight_kg: DEFAULT_RIDER_MASS_KG,
            bike_weight_kg: DEFAULT_BIKE_MASS_KG,
        }
    }
}

impl RiderProfile {
    /// Rider weight with the fallback for an unset (non-positive) value
    pub fn effective_weight_kg(&self) -> f64 {
        if self.weight_kg > 0.0 {
            self.weight_kg
        } else {
            DEFAULT_RIDER_MASS_KG
        }
    }

    /// Bike weight with the fallback for an unset (non-positive) value
    pub fn effective_bike_weight_kg(&self) -> f64 {
        if self.bike_weight_kg > 0.0 {
            self.bike_weight_kg
        } else {
            DEFAULT_BIKE_MASS_KG
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub rider: RiderProfile,
    pub sensors: SensorSettings,
    pub control: ControlSettings,
    pub session: SessionSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            rider: RiderProfile::default(),
            sensors: SensorSettings::default(),
            control: ControlSettings::default(),
            session: SessionSettings::default(),
        }
    }
}

impl AppConfig {
    /// Control loop settings
    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(self.control.tick_interval_ms),
            sensor_timeout: Duration::from_secs(self.sensors.sensor_timeout_secs),
            power_threshold_watts: self.control.power_threshold_watts,
            grade_threshold_percent: self.control.grade_threshold_percent,
        }
    }

    /// Transmitter settings, including the rider data sent at start-up
    pub fn transmitter_config(&self) -> TransmitterConfig {
        TransmitterConfig {
            interval: Duration::from_millis(self.control.retransmit_interval_ms),
            init_step_delay: Duration::from_millis(self.control.init_step_delay_ms),
            user_weight_kg: self.rider.effective_weight_kg(),
            bike_weight_kg: self.rider.effective_bike_weight_kg(),
        }
    }
}

/// Sensor-related settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Time allowed to find a BLE device
    pub connection_timeout_secs: u64,
    /// Readings older than this are treated as zero
    pub sensor_timeout_secs: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 15,
            sensor_timeout_secs: 5,
        }
    }
}

/// Trainer control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    /// Control loop tick when no sample arrives
    pub tick_interval_ms: u64,
    /// Period of the trainer command transmitter
    pub retransmit_interval_ms: u64,
    /// Delay before each FE-C initialization frame
    pub init_step_delay_ms: u64,
    /// Minimum ERG target change pushed to the trainer
    pub power_threshold_watts: f64,
    /// Grade change above which SIM grade is pushed
    pub grade_threshold_percent: f64,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            retransmit_interval_ms: 1000,
            init_step_delay_ms: 1000,
            power_threshold_watts: 1.0,
            grade_threshold_percent: 0.1,
        }
    }
}

/// What the binary rides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// GPX route to load
    pub route_path: Option<PathBuf>,
    /// Workout (JSON step list) to load
    pub workout_path: Option<PathBuf>,
    /// Use a BLE trainer instead of the simulated one
    pub use_ble: bool,
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "ergsim", "ErgSim")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        tracing::info!("No config at {}, using defaults", path.display());
        return Ok(AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(&get_config_path(), config)
}

/// Save application configuration to `path`.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
