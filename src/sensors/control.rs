//! Trainer control channel.
//!
//! Holds the live control mode and targets shared between the control loop
//! and the transmitter task. The transmitter resends the current target on
//! a fixed period whether or not it changed, so a trainer that missed a
//! frame converges on the next tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::sensors::ant::fec::{
    encode_target_power, encode_track_resistance, encode_user_config, encode_wind_resistance,
};
use crate::sensors::ant::AntFrame;
use crate::sensors::device::TrainerDevice;
use crate::sensors::types::TrainerMode;
use crate::world::physics::{DEFAULT_BIKE_MASS_KG, DEFAULT_RIDER_MASS_KG};

/// Lowest allowed workout intensity (percent)
pub const MIN_INTENSITY_PERCENT: i32 = 50;
/// Highest allowed workout intensity (percent)
pub const MAX_INTENSITY_PERCENT: i32 = 150;

/// One control message for the trainer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum ControlCommand {
    /// ERG target in watts
    TargetPower(f64),
    /// Simulated road grade in percent
    TrackResistance(f64),
}

impl ControlCommand {
    /// Encoded FE-C frame for this command
    pub fn to_frame(&self) -> AntFrame {
        match *self {
            ControlCommand::TargetPower(watts) => encode_target_power(watts),
            ControlCommand::TrackResistance(grade) => encode_track_resistance(grade),
        }
    }
}

#[derive(Debug, Clone)]
struct ControlState {
    mode: TrainerMode,
    target_power: f64,
    target_grade: f64,
    last_sent: Option<ControlCommand>,
    intensity: f64,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            mode: TrainerMode::Sim,
            target_power: 0.0,
            target_grade: 0.0,
            last_sent: None,
            intensity: 1.0,
        }
    }
}

/// Transmitter timing and the rider data sent at start-up
#[derive(Debug, Clone)]
pub struct TransmitterConfig {
    /// Period between control frames
    pub interval: Duration,
    /// Delay before each initialization frame
    pub init_step_delay: Duration,
    /// Rider weight for the user configuration page
    pub user_weight_kg: f64,
    /// Bike weight for the user configuration page
    pub bike_weight_kg: f64,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            init_step_delay: Duration::from_secs(1),
            user_weight_kg: DEFAULT_RIDER_MASS_KG,
            bike_weight_kg: DEFAULT_BIKE_MASS_KG,
        }
    }
}

/// Shared handle on the trainer's control mode and targets.
#[derive(Debug, Clone, Default)]
pub struct TrainerControl {
    state: Arc<Mutex<ControlState>>,
}

impl TrainerControl {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch between SIM and ERG. Takes effect on the next transmit.
    pub fn set_mode(&self, mode: TrainerMode) {
        let mut state = self.lock();
        if state.mode != mode {
            tracing::info!("Trainer mode switched to {}", mode);
            state.mode = mode;
        }
    }

    pub fn mode(&self) -> TrainerMode {
        self.lock().mode
    }

    /// Set the ERG target (watts). Only transmitted in ERG mode.
    pub fn set_power(&self, watts: f64) {
        if watts.is_finite() {
            self.lock().target_power = watts.max(0.0);
        }
    }

    pub fn target_power(&self) -> f64 {
        self.lock().target_power
    }

    /// Set the simulated grade (percent). Only transmitted in SIM mode.
    pub fn set_grade(&self, grade_percent: f64) {
        if grade_percent.is_finite() {
            self.lock().target_grade = grade_percent;
        }
    }

    pub fn target_grade(&self) -> f64 {
        self.lock().target_grade
    }

    /// Current workout intensity multiplier (1.0 = 100%)
    pub fn intensity(&self) -> f64 {
        self.lock().intensity
    }

    /// Change intensity by `delta_percent`, clamped to 50-150%.
    ///
    /// Returns the new intensity in percent.
    pub fn adjust_intensity(&self, delta_percent: i32) -> u32 {
        let mut state = self.lock();
        let current = (state.intensity * 100.0).round() as i32;
        let updated = current
            .saturating_add(delta_percent)
            .clamp(MIN_INTENSITY_PERCENT, MAX_INTENSITY_PERCENT);
        state.intensity = updated as f64 / 100.0;
        tracing::info!("Workout intensity: {}%", updated);
        updated as u32
    }

    /// Restore 100% intensity
    pub fn reset_intensity(&self) {
        self.lock().intensity = 1.0;
    }

    /// The command the transmitter would send now
    pub fn next_command(&self) -> ControlCommand {
        let state = self.lock();
        match state.mode {
            TrainerMode::Erg => ControlCommand::TargetPower(state.target_power),
            TrainerMode::Sim => ControlCommand::TrackResistance(state.target_grade),
        }
    }

    /// Last command successfully written to the trainer
    pub fn last_sent(&self) -> Option<ControlCommand> {
        self.lock().last_sent
    }

    /// Start the periodic transmitter.
    ///
    /// Sends the user configuration and wind resistance pages first, then
    /// the current command every `config.interval` until `cancel` fires.
    /// Write failures are logged and retried on the next tick.
    pub fn spawn_transmitter<D: TrainerDevice>(
        &self,
        device: Arc<D>,
        config: TransmitterConfig,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let control = self.clone();

        tokio::spawn(async move {
            tracing::info!("Initializing FE-C trainer");
            let init = [
                (
                    "user configuration",
                    encode_user_config(config.user_weight_kg, config.bike_weight_kg),
                ),
                ("wind resistance", encode_wind_resistance()),
            ];
            for (name, frame) in init {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(config.init_step_delay) => {}
                }
                match device.write_frame(frame).await {
                    Ok(()) => tracing::debug!("FE-C init: {} sent", name),
                    Err(e) => tracing::warn!("FE-C init: {} failed: {}", name, e),
                }
            }

            let mut ticker =
                tokio::time::interval_at(Instant::now() + config.interval, config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let command = control.next_command();
                match device.write_frame(command.to_frame()).await {
                    Ok(()) => {
                        tracing::debug!("Sent {:?}", command);
                        control.lock().last_sent = Some(command);
                    }
                    Err(e) => tracing::warn!("Failed to send {:?}: {}", command, e),
                }
            }

            tracing::info!("Trainer transmitter stopped");
        })
    }
}
