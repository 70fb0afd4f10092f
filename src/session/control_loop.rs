//! Real-time control loop.
//!
//! One tick merges the latest sensor sample, decides what the trainer should
//! do (follow the workout in ERG or the route grade in SIM), advances the
//! rider along the route with the physics model and publishes snapshots.
//!
//! A tick happens when a sample arrives, or after `tick_interval` without
//! one so stale sensors still time out. Commands from the session are
//! applied between ticks.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::Sender;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sensors::control::TrainerControl;
use crate::sensors::types::{TelemetrySample, TrainerMode};
use crate::session::events::{SessionEvent, TelemetrySnapshot, WorkoutOutcome};
use crate::session::summary::SessionStats;
use crate::storage::config::RiderProfile;
use crate::workouts::engine::{WorkoutEngine, WorkoutSnapshot};
use crate::workouts::types::ActiveWorkout;
use crate::world::physics::PhysicsEngine;
use crate::world::route::Route;

/// Lowest manual power offset (watts)
pub const MIN_POWER_OFFSET: i16 = -500;

/// Control loop timing and command thresholds
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Tick period when no sample arrives
    pub tick_interval: Duration,
    /// Readings older than this are zeroed
    pub sensor_timeout: Duration,
    /// ERG targets are pushed when they move at least this much
    pub power_threshold_watts: f64,
    /// SIM grade is pushed when it moves more than this
    pub grade_threshold_percent: f64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            sensor_timeout: Duration::from_secs(5),
            power_threshold_watts: 1.0,
            grade_threshold_percent: 0.1,
        }
    }
}

/// Requests from the session to a running loop
#[derive(Debug, Clone)]
pub enum LoopCommand {
    Pause,
    Resume,
    /// Manual offset added to reported power
    SetPowerOffset(i16),
    /// Start a workout from its beginning
    LoadWorkout(ActiveWorkout),
    UnloadWorkout,
    UpdateProfile(RiderProfile),
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// The rider reached the end of the route; the loop stops
    RouteFinished,
}

pub struct ControlLoop {
    config: LoopConfig,
    physics: PhysicsEngine,
    ftp: u32,
    route: Arc<Route>,
    workout: Option<WorkoutEngine>,
    control: TrainerControl,
    events: Sender<SessionEvent>,
    stats: SessionStats,

    power: i16,
    cadence: u8,
    heart_rate: u8,
    power_offset: i16,
    last_power_at: Instant,
    last_heart_rate_at: Instant,
    last_update: Instant,
    paused: bool,

    /// Mode this loop last requested, `None` before the first tick
    mode: Option<TrainerMode>,
    last_sent_power: Option<f64>,
    last_sent_grade: Option<f64>,
}

impl ControlLoop {
    pub fn new(
        config: LoopConfig,
        profile: &RiderProfile,
        route: Arc<Route>,
        control: TrainerControl,
        events: Sender<SessionEvent>,
        now: Instant,
    ) -> Self {
        Self {
            config,
            physics: PhysicsEngine::new(
                profile.effective_weight_kg(),
                profile.effective_bike_weight_kg(),
            ),
            ftp: profile.ftp,
            route,
            workout: None,
            control,
            events,
            stats: SessionStats {
                rider_weight_kg: profile.effective_weight_kg(),
                ..SessionStats::default()
            },
            power: 0,
            cadence: 0,
            heart_rate: 0,
            power_offset: 0,
            last_power_at: now,
            last_heart_rate_at: now,
            last_update: now,
            paused: false,
            mode: None,
            last_sent_power: None,
            last_sent_grade: None,
        }
    }

    /// Ride distance so far in meters
    pub fn distance(&self) -> f64 {
        self.stats.distance
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn has_workout(&self) -> bool {
        self.workout.is_some()
    }

    pub fn set_workout(&mut self, workout: ActiveWorkout) {
        self.workout = Some(WorkoutEngine::new(workout));
    }

    pub fn set_power_offset(&mut self, offset: i16) {
        self.power_offset = offset.max(MIN_POWER_OFFSET);
    }

    pub fn apply(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Pause => self.paused = true,
            LoopCommand::Resume => self.paused = false,
            LoopCommand::SetPowerOffset(offset) => self.set_power_offset(offset),
            LoopCommand::LoadWorkout(workout) => self.set_workout(workout),
            LoopCommand::UnloadWorkout => {
                if self.workout.take().is_some() {
                    tracing::info!("Workout unloaded");
                }
            }
            LoopCommand::UpdateProfile(profile) => {
                self.physics.set_masses(
                    profile.effective_weight_kg(),
                    profile.effective_bike_weight_kg(),
                );
                self.ftp = profile.ftp;
                self.stats.rider_weight_kg = profile.effective_weight_kg();
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        // Observers may have gone away; the ride goes on
        let _ = self.events.send(event);
    }

    /// Switch the trainer mode once. Clears the coalescing state of the
    /// other mode so it is pushed again on return.
    fn ensure_mode(&mut self, mode: TrainerMode) {
        if self.mode == Some(mode) {
            return;
        }
        self.control.set_mode(mode);
        self.mode = Some(mode);
        match mode {
            TrainerMode::Erg => self.last_sent_grade = None,
            TrainerMode::Sim => self.last_sent_power = None,
        }
    }

    /// Run one control step at `now`.
    pub fn tick(&mut self, sample: Option<TelemetrySample>, now: Instant) -> TickOutcome {
        if let Some(sample) = sample {
            if sample.has_power() {
                self.power = sample.power;
                self.cadence = sample.cadence;
                self.last_power_at = now;
            }
            if sample.has_heart_rate() {
                self.heart_rate = sample.heart_rate;
                self.last_heart_rate_at = now;
            }
        }

        if self.paused {
            self.last_update = now;
            let point = self.route.point_at_distance(self.stats.distance);
            self.emit(SessionEvent::Telemetry(TelemetrySnapshot::new(
                self.power.saturating_add(self.power_offset),
                self.cadence,
                self.heart_rate,
                0.0,
                self.stats.distance,
                &point,
            )));
            return TickOutcome::Continue;
        }

        let dt = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = now;

        let power_fresh =
            now.saturating_duration_since(self.last_power_at) <= self.config.sensor_timeout;
        if !power_fresh {
            self.power = 0;
            self.cadence = 0;
        }
        if now.saturating_duration_since(self.last_heart_rate_at) > self.config.sensor_timeout {
            self.heart_rate = 0;
        }
        let power = if power_fresh {
            self.power.saturating_add(self.power_offset)
        } else {
            0
        };

        let point = self.route.point_at_distance(self.stats.distance);

        let workout_snapshot = self.update_trainer(dt, point.grade);

        let speed = self.physics.calculate_speed(power as f64, point.grade);
        self.stats.distance += speed * dt;
        self.stats.record_power(power);

        let total = self.route.total_distance();
        if total > 0.0 && self.stats.distance >= total {
            self.stats.distance = total;
            self.stats.route_finished = true;
            tracing::info!("Route finished at {:.0} m", total);
            self.emit(SessionEvent::RouteFinished);
            return TickOutcome::RouteFinished;
        }

        self.emit(SessionEvent::Telemetry(TelemetrySnapshot::new(
            power,
            self.cadence,
            self.heart_rate,
            speed,
            self.stats.distance,
            &point,
        )));
        if let Some(snapshot) = workout_snapshot {
            self.emit(SessionEvent::Workout(snapshot));
        }

        TickOutcome::Continue
    }

    /// ERG from the workout or SIM from the route.
    ///
    /// Returns the workout snapshot while a workout is running.
    fn update_trainer(&mut self, dt: f64, grade: f64) -> Option<WorkoutSnapshot> {
        if let Some(engine) = self.workout.as_mut() {
            engine.advance(dt);
            let intensity = self.control.intensity();
            let target = engine.target_watts(self.ftp, intensity);
            let snapshot = engine.snapshot(self.ftp, intensity);

            if let Some(target) = target {
                let entering = self.mode != Some(TrainerMode::Erg);
                let changed = self.last_sent_power.map_or(true, |last| {
                    (target - last).abs() >= self.config.power_threshold_watts
                });
                if entering || changed {
                    self.control.set_power(target);
                    self.last_sent_power = Some(target);
                    tracing::debug!("ERG target {:.0} W", target);
                }
                self.ensure_mode(TrainerMode::Erg);
                return snapshot;
            }

            // Finished: hand the trainer back to the route in this same tick
            if let Some(finished) = self.workout.take() {
                tracing::info!("Workout completed: {}", finished.workout().name);
            }
            self.emit(SessionEvent::WorkoutFinished(WorkoutOutcome::Completed));
            self.emit(SessionEvent::Log("Workout completed".to_string()));
        }

        let entering = self.mode != Some(TrainerMode::Sim);
        let changed = self
            .last_sent_grade
            .map_or(true, |last| (grade - last).abs() > self.config.grade_threshold_percent);
        if entering || changed {
            self.control.set_grade(grade);
            self.last_sent_grade = Some(grade);
            tracing::debug!("SIM grade {:.1}%", grade);
        }
        self.ensure_mode(TrainerMode::Sim);
        None
    }

    /// Drive the loop until cancelled or the route ends.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<TelemetrySample>,
        mut commands: mpsc::UnboundedReceiver<LoopCommand>,
        cancel: CancellationToken,
    ) -> SessionStats {
        tracing::info!("Control loop started");
        let mut deadline = Instant::now() + self.config.tick_interval;
        let mut input_open = true;
        let mut commands_open = true;

        loop {
            let sample = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                command = commands.recv(), if commands_open => {
                    match command {
                        Some(command) => self.apply(command),
                        None => commands_open = false,
                    }
                    continue;
                }
                sample = input.recv(), if input_open => match sample {
                    Some(sample) => Some(sample),
                    None => {
                        tracing::warn!("Sensor stream closed");
                        input_open = false;
                        continue;
                    }
                },
                _ = tokio::time::sleep_until(deadline) => None,
            };

            let now = Instant::now();
            deadline = now + self.config.tick_interval;
            if self.tick(sample, now) == TickOutcome::RouteFinished {
                // Stops the transmitter sharing this token too
                cancel.cancel();
                break;
            }
        }

        tracing::info!(
            "Control loop stopped after {:.0} m, {} ticks",
            self.stats.distance,
            self.stats.ticks()
        );
        self.stats
    }
}
