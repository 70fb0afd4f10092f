//! Sensor types shared by the trainer transports and the control loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One reading from a sensor producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// When the producer received the reading
    pub timestamp: DateTime<Utc>,
    /// Watts, or -1 when this sample carries no power
    pub power: i16,
    /// Cadence in rpm (only meaningful with a power reading)
    pub cadence: u8,
    /// Heart rate in bpm, 0 when this sample carries none
    pub heart_rate: u8,
}

impl TelemetrySample {
    /// Power marker for "no new power this sample"
    pub const NO_POWER: i16 = -1;

    /// Sample with every field set
    pub fn new(power: i16, cadence: u8, heart_rate: u8) -> Self {
        Self {
            timestamp: Utc::now(),
            power,
            cadence,
            heart_rate,
        }
    }

    /// Power/cadence reading only
    pub fn power(power: i16, cadence: u8) -> Self {
        Self::new(power, cadence, 0)
    }

    /// Heart rate reading only
    pub fn heart_rate(bpm: u8) -> Self {
        Self::new(Self::NO_POWER, 0, bpm)
    }

    /// Whether the sample carries a power reading
    pub fn has_power(&self) -> bool {
        self.power != Self::NO_POWER
    }

    /// Whether the sample carries a heart rate reading
    pub fn has_heart_rate(&self) -> bool {
        self.heart_rate > 0
    }
}

/// Trainer control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrainerMode {
    /// Free-ride simulation: the trainer follows the road grade
    #[default]
    Sim,
    /// Target power: the trainer holds a fixed wattage
    Erg,
}

impl std::fmt::Display for TrainerMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainerMode::Sim => write!(f, "SIM"),
            TrainerMode::Erg => write!(f, "ERG"),
        }
    }
}

/// Which physical device a status refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Smart trainer (power, cadence, control)
    Trainer,
    /// Heart rate monitor
    HeartRate,
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Trainer => write!(f, "Smart Trainer"),
            DeviceKind::HeartRate => write!(f, "Heart Rate"),
        }
    }
}

/// Connection state of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// Connection in progress
    Connecting,
    /// Active connection
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting..."),
            ConnectionState::Connected => write!(f, "Connected"),
        }
    }
}

/// Errors related to sensor operations.
#[derive(Debug, Error)]
pub enum SensorError {
    /// BLE adapter not found or unavailable
    #[error("Bluetooth adapter not found")]
    AdapterNotFound,

    /// Failed to start BLE scanning
    #[error("Failed to start scanning: {0}")]
    ScanFailed(String),

    /// No device advertising the required service
    #[error("Sensor not found: {0}")]
    SensorNotFound(String),

    /// Connection to sensor failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timed out
    #[error("Connection timed out")]
    ConnectionTimeout,

    /// Operation needs a connected trainer
    #[error("Trainer not connected")]
    NotConnected,

    /// Failed to subscribe to sensor notifications
    #[error("Failed to subscribe to notifications: {0}")]
    SubscriptionFailed(String),

    /// Failed to write to sensor characteristic
    #[error("Write failed: {0}")]
    WriteFailed(String),

    /// BLE stack error
    #[error("BLE error: {0}")]
    BleError(String),
}

impl From<btleplug::Error> for SensorError {
    fn from(err: btleplug::Error) -> Self {
        SensorError::BleError(err.to_string())
    }
}
