//! Ride session: device connections, lifecycle and the running control loop.
//!
//! A [`Session`] owns the trainer device and spawns two tasks while
//! recording: the [`ControlLoop`] fed by the device's samples, and the
//! trainer transmitter. A third task waits for the loop, so a ride that
//! reaches the end of its route closes itself. One observer follows along
//! on the receiver from [`Session::take_events`].

pub mod control_loop;
pub mod events;
pub mod summary;

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use crossbeam::channel::{unbounded, Receiver, Sender};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sensors::control::{TrainerControl, TransmitterConfig};
use crate::sensors::device::{ConnectionStage, ConnectionStatus, TrainerDevice};
use crate::sensors::types::{ConnectionState, DeviceKind, SensorError, TrainerMode};
use crate::storage::config::{AppConfig, RiderProfile};
use crate::workouts::types::ActiveWorkout;
use crate::world::route::Route;

pub use control_loop::{ControlLoop, LoopCommand, LoopConfig, TickOutcome, MIN_POWER_OFFSET};
pub use events::{SessionEvent, TelemetrySnapshot, WorkoutOutcome};
pub use summary::{SessionStats, SessionSummary};

/// Capacity of the sample channel between device and control loop
pub const SAMPLE_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
    Paused,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "IDLE"),
            SessionState::Recording => write!(f, "RECORDING"),
            SessionState::Paused => write!(f, "PAUSED"),
        }
    }
}

/// Errors from session operations. A failed operation changes nothing.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Trainer not connected")]
    TrainerNotConnected,

    #[error("A session is already active")]
    AlreadyActive,

    #[error("No active session")]
    NotActive,

    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: SessionState,
        action: &'static str,
    },

    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),

    #[error("Session task failed: {0}")]
    TaskFailed(String),
}

/// What a ride's tasks hand back once they have stopped
struct RideOutcome {
    stats: SessionStats,
    /// Set when the ride closed itself at the end of the route
    summary: Option<SessionSummary>,
}

/// Tasks of a running ride and what is needed to close it out.
struct RideTasks {
    control_loop: JoinHandle<SessionStats>,
    transmitter: JoinHandle<()>,
    cancel: CancellationToken,
    route_name: String,
    started_at: DateTime<Utc>,
    state: Arc<Mutex<SessionState>>,
    events: Sender<SessionEvent>,
}

impl RideTasks {
    /// Wait for the control loop, then stop the transmitter.
    ///
    /// A loop that stopped at the end of the route was not cancelled by
    /// the owner, so the ride is summarised and the session set idle here.
    async fn supervise(self) -> Result<RideOutcome, SessionError> {
        let stats = self.control_loop.await;
        self.cancel.cancel();
        if let Err(e) = self.transmitter.await {
            tracing::warn!("Transmitter task failed: {}", e);
        }
        let stats = stats.map_err(|e| SessionError::TaskFailed(e.to_string()))?;
        if !stats.route_finished {
            return Ok(RideOutcome {
                stats,
                summary: None,
            });
        }

        let summary =
            SessionSummary::build(&self.route_name, self.started_at, &stats, stats.rider_weight_kg);
        log_summary(&summary);
        publish_state(&self.state, &self.events, SessionState::Idle);
        let _ = self
            .events
            .send(SessionEvent::SessionFinished(summary.clone()));
        Ok(RideOutcome {
            stats,
            summary: Some(summary),
        })
    }
}

struct ActiveSession {
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<LoopCommand>,
    tasks: JoinHandle<Result<RideOutcome, SessionError>>,
    started_at: DateTime<Utc>,
}

impl ActiveSession {
    fn send(&self, command: LoopCommand) {
        if self.commands.send(command).is_err() {
            tracing::debug!("Control loop already stopped");
        }
    }

    /// Whether the ride already closed itself at the end of the route
    fn has_ended(&self) -> bool {
        self.tasks.is_finished()
    }

    /// Cancel the ride's tasks and wait for them.
    async fn stop(self) -> Result<RideOutcome, SessionError> {
        self.cancel.cancel();
        self.tasks
            .await
            .map_err(|e| SessionError::TaskFailed(e.to_string()))?
    }
}

fn publish_state(
    state: &Mutex<SessionState>,
    events: &Sender<SessionEvent>,
    next: SessionState,
) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    tracing::info!("Session state: {}", next);
    let _ = events.send(SessionEvent::StateChanged(next));
}

fn log_summary(summary: &SessionSummary) {
    tracing::info!(
        "Session finished: {} | {:.2} km | {} W avg",
        summary.route_name,
        summary.distance / 1000.0,
        summary.avg_power
    );
}

/// A ride on one trainer device.
pub struct Session<D: TrainerDevice> {
    device: Arc<D>,
    control: TrainerControl,
    loop_config: LoopConfig,
    transmitter_config: TransmitterConfig,
    profile: RiderProfile,
    route: Arc<Route>,
    workout: Option<ActiveWorkout>,
    power_offset: i16,
    state: Arc<Mutex<SessionState>>,
    trainer: ConnectionState,
    heart_rate_monitor: ConnectionState,
    events_tx: Sender<SessionEvent>,
    events_rx: Option<Receiver<SessionEvent>>,
    shutdown: CancellationToken,
    active: Option<ActiveSession>,
}

impl<D: TrainerDevice> Session<D> {
    pub fn new(device: D, config: &AppConfig) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            device: Arc::new(device),
            control: TrainerControl::new(),
            loop_config: config.loop_config(),
            transmitter_config: config.transmitter_config(),
            profile: config.rider.clone(),
            route: Arc::new(Route::default()),
            workout: None,
            power_offset: 0,
            state: Arc::new(Mutex::new(SessionState::Idle)),
            trainer: ConnectionState::Disconnected,
            heart_rate_monitor: ConnectionState::Disconnected,
            events_tx,
            events_rx: Some(events_rx),
            shutdown: CancellationToken::new(),
            active: None,
        }
    }

    /// Hand out the event receiver. Only the first call gets it.
    ///
    /// Events are queued only while someone holds the receiver. If nobody
    /// took it by the time recording starts, the session drops it and
    /// stops queueing.
    pub fn take_events(&mut self) -> Option<Receiver<SessionEvent>> {
        self.events_rx.take()
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// Trainer control handle (mode, targets, intensity)
    pub fn control(&self) -> &TrainerControl {
        &self.control
    }

    pub fn profile(&self) -> &RiderProfile {
        &self.profile
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn workout(&self) -> Option<&ActiveWorkout> {
        self.workout.as_ref()
    }

    pub fn power_offset(&self) -> i16 {
        self.power_offset
    }

    pub fn connection_state(&self, device: DeviceKind) -> ConnectionState {
        match device {
            DeviceKind::Trainer => self.trainer,
            DeviceKind::HeartRate => self.heart_rate_monitor,
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    fn set_state(&mut self, state: SessionState) {
        publish_state(&self.state, &self.events_tx, state);
    }

    /// Whether a ride is recording or paused
    fn is_riding(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.has_ended())
    }

    /// Collect a ride that closed itself at the end of the route.
    async fn reap_ended(&mut self) {
        if !self.active.as_ref().is_some_and(ActiveSession::has_ended) {
            return;
        }
        if let Some(active) = self.active.take() {
            if let Err(e) = active.stop().await {
                tracing::warn!("Ended ride failed: {}", e);
            }
        }
    }

    fn connection_slot(&mut self, device: DeviceKind) -> &mut ConnectionState {
        match device {
            DeviceKind::Trainer => &mut self.trainer,
            DeviceKind::HeartRate => &mut self.heart_rate_monitor,
        }
    }

    async fn connect(&mut self, kind: DeviceKind) -> Result<(), SessionError> {
        if self.connection_state(kind) == ConnectionState::Connected {
            tracing::info!("{} already connected", kind);
            return Ok(());
        }

        *self.connection_slot(kind) = ConnectionState::Connecting;
        let events = self.events_tx.clone();
        let on_status = move |status: ConnectionStatus| {
            let _ = events.send(SessionEvent::ConnectionStatus {
                stage: status.stage,
                message: status.message,
            });
        };

        let result = match kind {
            DeviceKind::Trainer => self.device.connect_trainer(&on_status).await,
            DeviceKind::HeartRate => self.device.connect_heart_rate(&on_status).await,
        };

        match result {
            Ok(()) => {
                *self.connection_slot(kind) = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("{} connection failed: {}", kind, e);
                *self.connection_slot(kind) = ConnectionState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Connect the smart trainer. Already connected is not an error.
    pub async fn connect_trainer(&mut self) -> Result<(), SessionError> {
        self.connect(DeviceKind::Trainer).await
    }

    /// Connect a heart rate monitor. Already connected is not an error.
    pub async fn connect_heart_rate(&mut self) -> Result<(), SessionError> {
        self.connect(DeviceKind::HeartRate).await
    }

    /// Replace the route. Not allowed while a session is active.
    pub fn load_route(&mut self, route: Route) -> Result<(), SessionError> {
        if self.is_riding() {
            return Err(SessionError::AlreadyActive);
        }
        self.emit(SessionEvent::Log(format!("Route loaded: {}", route.name())));
        self.route = Arc::new(route);
        Ok(())
    }

    /// Load a workout. While recording it starts immediately.
    pub fn load_workout(&mut self, workout: ActiveWorkout) {
        if let Some(active) = &self.active {
            active.send(LoopCommand::LoadWorkout(workout.clone()));
        }
        self.emit(SessionEvent::WorkoutLoaded(workout.clone()));
        self.workout = Some(workout);
    }

    /// Drop the workout and return the trainer to SIM.
    pub fn unload_workout(&mut self) {
        self.workout = None;
        if let Some(active) = &self.active {
            active.send(LoopCommand::UnloadWorkout);
        }
        self.control.set_mode(TrainerMode::Sim);
        self.emit(SessionEvent::Log("Workout unloaded".to_string()));
    }

    /// Start recording.
    ///
    /// Requires a connected trainer and no active session. If the device
    /// cannot stream, nothing is started.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.trainer != ConnectionState::Connected {
            self.emit(SessionEvent::Log("Trainer not connected".to_string()));
            return Err(SessionError::TrainerNotConnected);
        }
        self.reap_ended().await;
        if self.active.is_some() {
            return Err(SessionError::AlreadyActive);
        }

        let (sample_tx, sample_rx) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        self.device.subscribe(sample_tx).await?;

        self.control.reset_intensity();
        let cancel = self.shutdown.child_token();
        let (commands, command_rx) = mpsc::unbounded_channel();

        let mut control_loop = ControlLoop::new(
            self.loop_config.clone(),
            &self.profile,
            self.route.clone(),
            self.control.clone(),
            self.events_tx.clone(),
            Instant::now(),
        );
        control_loop.set_power_offset(self.power_offset);
        if let Some(workout) = &self.workout {
            control_loop.set_workout(workout.clone());
            self.emit(SessionEvent::Log("Workout mode activated".to_string()));
        }

        self.set_state(SessionState::Recording);
        let transmitter = self.control.spawn_transmitter(
            self.device.clone(),
            self.transmitter_config.clone(),
            cancel.clone(),
        );
        let control_loop = tokio::spawn(control_loop.run(sample_rx, command_rx, cancel.clone()));

        if self.events_rx.take().is_some() {
            tracing::debug!("No event observer, events are not queued");
        }
        let started_at = Utc::now();
        let tasks = RideTasks {
            control_loop,
            transmitter,
            cancel: cancel.clone(),
            route_name: self.route.name().to_string(),
            started_at,
            state: self.state.clone(),
            events: self.events_tx.clone(),
        };

        self.active = Some(ActiveSession {
            cancel,
            commands,
            tasks: tokio::spawn(tasks.supervise()),
            started_at,
        });
        Ok(())
    }

    pub fn pause(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Recording, SessionState::Paused, "pause")
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Paused, SessionState::Recording, "resume")
    }

    fn transition(
        &mut self,
        from: SessionState,
        to: SessionState,
        action: &'static str,
    ) -> Result<(), SessionError> {
        let state = self.state();
        let Some(active) = self.active.as_ref().filter(|_| state == from) else {
            return Err(SessionError::InvalidTransition { state, action });
        };

        active.send(match to {
            SessionState::Paused => LoopCommand::Pause,
            _ => LoopCommand::Resume,
        });
        self.set_state(to);
        Ok(())
    }

    /// Start, pause or resume depending on the current state.
    pub async fn toggle(&mut self) -> Result<SessionState, SessionError> {
        match self.state() {
            SessionState::Idle => self.start().await?,
            SessionState::Recording => self.pause()?,
            SessionState::Paused => self.resume()?,
        }
        Ok(self.state())
    }

    /// Stop recording and summarise the ride.
    ///
    /// After the route end closed the ride, returns that summary.
    pub async fn finish(&mut self) -> Result<SessionSummary, SessionError> {
        let active = self.active.take().ok_or(SessionError::NotActive)?;
        let started_at = active.started_at;
        let outcome = active.stop().await?;
        if let Some(summary) = outcome.summary {
            return Ok(summary);
        }

        let summary = SessionSummary::build(
            self.route.name(),
            started_at,
            &outcome.stats,
            outcome.stats.rider_weight_kg,
        );
        log_summary(&summary);

        self.set_state(SessionState::Idle);
        self.emit(SessionEvent::SessionFinished(summary.clone()));
        Ok(summary)
    }

    /// Stop without a summary and drop the workout. Devices stay connected.
    pub async fn discard(&mut self) -> Result<(), SessionError> {
        let stopped = match self.active.take() {
            Some(active) => active.stop().await.map(drop),
            None => Ok(()),
        };

        self.unload_workout();
        self.set_state(SessionState::Idle);
        self.emit(SessionEvent::WorkoutFinished(WorkoutOutcome::Canceled));
        stopped
    }

    /// Stop any active session and disconnect every device.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        let stopped = match self.active.take() {
            Some(active) => active.stop().await.map(drop),
            None => Ok(()),
        };

        self.device.disconnect().await;
        self.trainer = ConnectionState::Disconnected;
        self.heart_rate_monitor = ConnectionState::Disconnected;
        self.emit(SessionEvent::ConnectionStatus {
            stage: ConnectionStage::Disconnected,
            message: "Devices disconnected".to_string(),
        });

        if self.state() != SessionState::Idle {
            self.set_state(SessionState::Idle);
        }
        stopped
    }

    /// Change workout intensity by `delta` percent (50-150%).
    pub fn change_intensity(&self, delta: i32) -> u32 {
        self.control.adjust_intensity(delta)
    }

    /// Change the manual power offset by `delta` watts (floor -500 W).
    pub fn change_power_offset(&mut self, delta: i32) -> i16 {
        let offset = (self.power_offset as i32)
            .saturating_add(delta)
            .clamp(MIN_POWER_OFFSET as i32, i16::MAX as i32) as i16;
        self.power_offset = offset;
        if let Some(active) = &self.active {
            active.send(LoopCommand::SetPowerOffset(offset));
        }
        offset
    }

    /// Replace the rider profile. Physics and targets follow immediately.
    pub fn update_profile(&mut self, profile: RiderProfile) {
        self.transmitter_config.user_weight_kg = profile.effective_weight_kg();
        self.transmitter_config.bike_weight_kg = profile.effective_bike_weight_kg();
        if let Some(active) = &self.active {
            active.send(LoopCommand::UpdateProfile(profile.clone()));
        }
        tracing::info!(
            "Profile updated: FTP {} W, {:.1} kg",
            profile.ftp,
            profile.weight_kg
        );
        self.profile = profile;
    }
}

impl<D: TrainerDevice> Drop for Session<D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
