//! Transport abstraction for a trainer and heart rate strap.

use std::future::Future;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::sensors::ant::AntFrame;
use crate::sensors::types::{DeviceKind, SensorError, TelemetrySample};

/// Step of a connection attempt, reported while connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionStage {
    ScanTrainer,
    ConnectingTrainer,
    TrainerConnected,
    ScanHr,
    ConnectingHr,
    HrConnected,
    Disconnected,
}

impl ConnectionStage {
    /// Device the stage refers to
    pub fn device(&self) -> Option<DeviceKind> {
        match self {
            ConnectionStage::ScanTrainer
            | ConnectionStage::ConnectingTrainer
            | ConnectionStage::TrainerConnected => Some(DeviceKind::Trainer),
            ConnectionStage::ScanHr
            | ConnectionStage::ConnectingHr
            | ConnectionStage::HrConnected => Some(DeviceKind::HeartRate),
            ConnectionStage::Disconnected => None,
        }
    }
}

/// A connection progress report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub stage: ConnectionStage,
    pub message: String,
}

impl ConnectionStatus {
    pub fn new(stage: ConnectionStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Callback receiving connection progress
pub type StatusCallback<'a> = &'a (dyn Fn(ConnectionStatus) + Send + Sync);

/// A physical (or simulated) trainer link.
///
/// Implementations use interior mutability so one device can be shared
/// between the session and the transmitter task.
pub trait TrainerDevice: Send + Sync + 'static {
    /// Find and connect the trainer
    fn connect_trainer(
        &self,
        on_status: StatusCallback<'_>,
    ) -> impl Future<Output = Result<(), SensorError>> + Send;

    /// Find and connect a heart rate monitor
    fn connect_heart_rate(
        &self,
        on_status: StatusCallback<'_>,
    ) -> impl Future<Output = Result<(), SensorError>> + Send;

    /// Start streaming samples from every connected device into `tx`
    fn subscribe(
        &self,
        tx: mpsc::Sender<TelemetrySample>,
    ) -> impl Future<Output = Result<(), SensorError>> + Send;

    /// Send one FE-C control frame to the trainer
    fn write_frame(&self, frame: AntFrame) -> impl Future<Output = Result<(), SensorError>> + Send;

    /// Stop streaming and drop all links. Safe to call repeatedly.
    fn disconnect(&self) -> impl Future<Output = ()> + Send;
}
