//! ErgSim - Smart Trainer Ride Simulator
//!
//! Rides the configured route and/or workout on a simulated or BLE trainer
//! until Ctrl-C or the end of the route.
//!
//! Usage: `ergsim [config.toml]`

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::oneshot;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ergsim::sensors::ble::BleTrainer;
use ergsim::sensors::mock::MockTrainer;
use ergsim::storage::config::{load_config, load_config_from};
use ergsim::workouts::plan::load_workout_file;
use ergsim::world::import::load_route_file;
use ergsim::{AppConfig, Session, SessionEvent, TrainerDevice};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ErgSim v{}", env!("CARGO_PKG_VERSION"));

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => load_config_from(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_config().context("loading config")?,
    };

    if config.session.use_ble {
        let timeout = Duration::from_secs(config.sensors.connection_timeout_secs);
        ride(BleTrainer::new(timeout), &config).await
    } else {
        ride(MockTrainer::default(), &config).await
    }
}

async fn ride<D: TrainerDevice>(device: D, config: &AppConfig) -> anyhow::Result<()> {
    let mut session = Session::new(device, config);

    if let Some(path) = &config.session.route_path {
        let route = load_route_file(path)
            .with_context(|| format!("loading route {}", path.display()))?;
        session.load_route(route)?;
    }
    if let Some(path) = &config.session.workout_path {
        let workout = load_workout_file(path)
            .with_context(|| format!("loading workout {}", path.display()))?;
        session.load_workout(workout);
    }

    let events = session
        .take_events()
        .context("session events already taken")?;
    let route_finished = watch_events(events);

    session
        .connect_trainer()
        .await
        .context("connecting trainer")?;
    if let Err(e) = session.connect_heart_rate().await {
        tracing::warn!("Riding without heart rate: {}", e);
    }

    session.start().await.context("starting session")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for Ctrl-C")?;
            tracing::info!("Interrupted, finishing session");
        }
        _ = route_finished => tracing::info!("End of route reached"),
    }

    let summary = session.finish().await?;
    tracing::info!("Summary: {}", serde_json::to_string_pretty(&summary)?);

    session.disconnect().await?;
    Ok(())
}

/// Log session events on a background thread. The returned receiver
/// resolves when the route is finished.
fn watch_events(
    events: crossbeam::channel::Receiver<SessionEvent>,
) -> oneshot::Receiver<()> {
    let (tx, rx) = oneshot::channel();

    std::thread::spawn(move || {
        let mut route_finished = Some(tx);
        for event in events.iter() {
            match event {
                SessionEvent::Telemetry(t) => tracing::debug!(
                    "{} W | {} rpm | {} bpm | {:.1} km/h | {:.0} m | {:.1}%",
                    t.power,
                    t.cadence,
                    t.heart_rate,
                    t.speed_kmh,
                    t.distance,
                    t.grade
                ),
                SessionEvent::Workout(w) => tracing::debug!(
                    "Segment {} | target {} W | next {} W | {:.0}%",
                    w.segment_index,
                    w.target_power,
                    w.next_target_power,
                    w.completion_percent
                ),
                SessionEvent::ConnectionStatus { stage, message } => {
                    tracing::info!("[{:?}] {}", stage, message)
                }
                SessionEvent::Log(message) => tracing::info!("{}", message),
                SessionEvent::RouteFinished => {
                    if let Some(tx) = route_finished.take() {
                        let _ = tx.send(());
                    }
                }
                other => tracing::debug!("{:?}", other),
            }
        }
    });

    rx
}
