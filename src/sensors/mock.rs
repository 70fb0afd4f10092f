//! Simulated trainer for rides without hardware.
//!
//! Emits a fixed power/cadence/heart rate once per interval and follows
//! ERG targets written to it. Every written frame is kept for inspection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sensors::ant::fec::PAGE_TARGET_POWER;
use crate::sensors::ant::AntFrame;
use crate::sensors::device::{ConnectionStage, ConnectionStatus, StatusCallback, TrainerDevice};
use crate::sensors::types::{ConnectionState, DeviceKind, SensorError, TelemetrySample};

/// Written frames kept for inspection; older ones are dropped
pub const MAX_RECORDED_FRAMES: usize = 1024;

/// Mock trainer settings
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Initial power in watts
    pub power: i16,
    /// Cadence in rpm
    pub cadence: u8,
    /// Heart rate in bpm
    pub heart_rate: u8,
    /// Time between samples
    pub sample_interval: Duration,
    /// Simulated scan time for the trainer
    pub trainer_connect_delay: Duration,
    /// Simulated scan time for the heart rate strap
    pub hr_connect_delay: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            power: 150,
            cadence: 85,
            heart_rate: 140,
            sample_interval: Duration::from_secs(1),
            trainer_connect_delay: Duration::from_secs(1),
            hr_connect_delay: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    trainer: ConnectionState,
    heart_rate_monitor: ConnectionState,
    power: i16,
    cadence: u8,
    heart_rate: u8,
    frames: VecDeque<AntFrame>,
    fail_subscribe: bool,
    streaming: Option<CancellationToken>,
}

/// Simulated trainer and heart rate strap.
#[derive(Debug, Clone)]
pub struct MockTrainer {
    config: MockConfig,
    state: Arc<Mutex<MockState>>,
}

impl Default for MockTrainer {
    fn default() -> Self {
        Self::new(MockConfig::default())
    }
}

impl MockTrainer {
    pub fn new(config: MockConfig) -> Self {
        let state = MockState {
            power: config.power,
            cadence: config.cadence,
            heart_rate: config.heart_rate,
            ..Default::default()
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Make the next `subscribe` call fail
    pub fn fail_next_subscribe(&self) {
        self.lock().fail_subscribe = true;
    }

    /// Change the simulated rider power
    pub fn set_power(&self, watts: i16) {
        self.lock().power = watts;
    }

    /// Change the simulated heart rate
    pub fn set_heart_rate(&self, bpm: u8) {
        self.lock().heart_rate = bpm;
    }

    /// Most recent frames written, oldest first
    pub fn frames(&self) -> Vec<AntFrame> {
        self.lock().frames.iter().cloned().collect()
    }

    /// Forget recorded frames
    pub fn clear_frames(&self) {
        self.lock().frames.clear();
    }

    /// Connection state of one simulated device
    pub fn connection_state(&self, device: DeviceKind) -> ConnectionState {
        let state = self.lock();
        match device {
            DeviceKind::Trainer => state.trainer,
            DeviceKind::HeartRate => state.heart_rate_monitor,
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TrainerDevice for MockTrainer {
    async fn connect_trainer(&self, on_status: StatusCallback<'_>) -> Result<(), SensorError> {
        self.lock().trainer = ConnectionState::Connecting;
        on_status(ConnectionStatus::new(
            ConnectionStage::ScanTrainer,
            "Scanning for simulated devices...",
        ));
        tokio::time::sleep(self.config.trainer_connect_delay).await;

        self.lock().trainer = ConnectionState::Connected;
        on_status(ConnectionStatus::new(
            ConnectionStage::TrainerConnected,
            "Simulated trainer connected",
        ));
        tracing::info!("Mock trainer connected");
        Ok(())
    }

    async fn connect_heart_rate(&self, on_status: StatusCallback<'_>) -> Result<(), SensorError> {
        self.lock().heart_rate_monitor = ConnectionState::Connecting;
        on_status(ConnectionStatus::new(
            ConnectionStage::ScanHr,
            "Scanning for simulated HR...",
        ));
        tokio::time::sleep(self.config.hr_connect_delay).await;

        self.lock().heart_rate_monitor = ConnectionState::Connected;
        on_status(ConnectionStatus::new(
            ConnectionStage::HrConnected,
            "Simulated HR connected",
        ));
        tracing::info!("Mock heart rate monitor connected");
        Ok(())
    }

    async fn subscribe(&self, tx: mpsc::Sender<TelemetrySample>) -> Result<(), SensorError> {
        let cancel = {
            let mut state = self.lock();
            if state.trainer != ConnectionState::Connected
                && state.heart_rate_monitor != ConnectionState::Connected
            {
                return Err(SensorError::NotConnected);
            }
            if std::mem::take(&mut state.fail_subscribe) {
                return Err(SensorError::SubscriptionFailed(
                    "simulated subscription failure".to_string(),
                ));
            }

            let cancel = CancellationToken::new();
            if let Some(previous) = state.streaming.replace(cancel.clone()) {
                previous.cancel();
            }
            cancel
        };

        let state = self.state.clone();
        let interval = self.config.sample_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First sample one interval after subscribing
            ticker.tick().await;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let sample = {
                            let s = state.lock().unwrap_or_else(PoisonError::into_inner);
                            let power = if s.trainer == ConnectionState::Connected {
                                s.power
                            } else {
                                TelemetrySample::NO_POWER
                            };
                            let heart_rate = if s.heart_rate_monitor == ConnectionState::Connected {
                                s.heart_rate
                            } else {
                                0
                            };
                            TelemetrySample::new(power, s.cadence, heart_rate)
                        };

                        if tx.send(sample).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Mock sample stream stopped");
        });

        Ok(())
    }

    async fn write_frame(&self, frame: AntFrame) -> Result<(), SensorError> {
        let mut state = self.lock();
        if state.trainer != ConnectionState::Connected {
            return Err(SensorError::NotConnected);
        }

        // A real trainer in ERG mode holds the rider at the target
        if frame.page() == PAGE_TARGET_POWER {
            let payload = frame.payload();
            let raw = u16::from_le_bytes([payload[5], payload[6]]);
            state.power = (raw / 4).min(i16::MAX as u16) as i16;
        }

        if state.frames.len() == MAX_RECORDED_FRAMES {
            state.frames.pop_front();
        }
        state.frames.push_back(frame);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.lock();
        if let Some(cancel) = state.streaming.take() {
            cancel.cancel();
        }
        if state.trainer != ConnectionState::Disconnected
            || state.heart_rate_monitor != ConnectionState::Disconnected
        {
            tracing::info!("Mock devices disconnected");
        }
        state.trainer = ConnectionState::Disconnected;
        state.heart_rate_monitor = ConnectionState::Disconnected;
    }
}
