//! Sensor module: FE-C codec, trainer control and device transports.

pub mod ant;
pub mod ble;
pub mod control;
pub mod device;
pub mod gatt;
pub mod mock;
pub mod types;

pub use ble::BleTrainer;
pub use control::{ControlCommand, TrainerControl, TransmitterConfig};
pub use device::{ConnectionStage, ConnectionStatus, TrainerDevice};
pub use mock::{MockConfig, MockTrainer};
pub use types::{ConnectionState, DeviceKind, SensorError, TelemetrySample, TrainerMode};
