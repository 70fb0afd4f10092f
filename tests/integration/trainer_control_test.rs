//! Frames reaching the trainer: initialization, ERG workouts and SIM grade

use std::time::Duration;

use ergsim::sensors::ant::fec::{
    PAGE_TARGET_POWER, PAGE_TRACK_RESISTANCE, PAGE_USER_CONFIG, PAGE_WIND_RESISTANCE,
};
use ergsim::sensors::{ControlCommand, MockTrainer, TrainerMode};
use ergsim::session::{Session, SessionEvent, WorkoutOutcome};
use ergsim::storage::config::AppConfig;
use ergsim::workouts::plan::WorkoutStep;
use ergsim::workouts::types::ActiveWorkout;

async fn erg_session(ftp: u32) -> Session<MockTrainer> {
    let mut config = AppConfig::default();
    config.rider.ftp = ftp;
    let mut session = Session::new(MockTrainer::default(), &config);
    session.connect_trainer().await.unwrap();
    session
}

fn steady(duration: u32, power: f64) -> ActiveWorkout {
    ActiveWorkout::from_steps("Steady", &[WorkoutStep::SteadyState { duration, power }]).unwrap()
}

fn last_target(session: &Session<MockTrainer>) -> f64 {
    match session.control().last_sent() {
        Some(ControlCommand::TargetPower(watts)) => watts,
        other => panic!("expected a target power command, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_initialization_then_erg_frames() {
    let mut session = erg_session(250).await;
    session.load_workout(steady(1200, 0.8));
    session.start().await.unwrap();

    tokio::time::sleep(Duration::from_millis(6500)).await;

    let frames = session.device().frames();
    let pages: Vec<u8> = frames.iter().map(|f| f.page()).collect();
    assert_eq!(pages[0], PAGE_USER_CONFIG);
    assert_eq!(pages[1], PAGE_WIND_RESISTANCE);
    assert!(pages.len() >= 4);
    assert!(pages[2..].iter().all(|&p| p == PAGE_TARGET_POWER));

    // 0.8 × 250 W = 200 W = 800 quarter-watts
    let payload = frames[2].payload();
    assert_eq!(u16::from_le_bytes([payload[5], payload[6]]), 800);
    assert_eq!(session.control().mode(), TrainerMode::Erg);
    assert!((last_target(&session) - 200.0).abs() < 1e-9);

    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_trainer_follows_erg_target() {
    let mut session = erg_session(300).await;
    let events = session.take_events().unwrap();
    session.load_workout(steady(1200, 0.75));
    session.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;

    // The mock holds the rider at the ERG target once it receives it
    let powers: Vec<i16> = events
        .try_iter()
        .filter_map(|e| match e {
            SessionEvent::Telemetry(t) => Some(t.power),
            _ => None,
        })
        .collect();
    assert_eq!(powers.last(), Some(&225));

    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_intensity_scales_target() {
    let mut session = erg_session(250).await;
    session.load_workout(steady(1200, 0.8));
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(session.change_intensity(10), 110);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!((last_target(&session) - 220.0).abs() < 1e-6);

    assert_eq!(session.change_intensity(100), 150);
    assert_eq!(session.change_intensity(-200), 50);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!((last_target(&session) - 100.0).abs() < 1e-6);

    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_unload_returns_to_sim() {
    let mut session = erg_session(250).await;
    session.load_workout(steady(1200, 0.8));
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(6)).await;

    session.unload_workout();
    session.device().clear_frames();
    tokio::time::sleep(Duration::from_secs(4)).await;

    let pages: Vec<u8> = session.device().frames().iter().map(|f| f.page()).collect();
    assert!(!pages.is_empty());
    assert!(pages.iter().all(|&p| p == PAGE_TRACK_RESISTANCE));
    assert_eq!(session.control().mode(), TrainerMode::Sim);

    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_workout_completes_then_sim() {
    let mut session = erg_session(200).await;
    let events = session.take_events().unwrap();
    session.load_workout(steady(5, 1.0));
    session.start().await.unwrap();

    tokio::time::sleep(Duration::from_secs(12)).await;

    let collected: Vec<SessionEvent> = events.try_iter().collect();
    let completed = collected
        .iter()
        .filter(|e| matches!(e, SessionEvent::WorkoutFinished(WorkoutOutcome::Completed)))
        .count();
    assert_eq!(completed, 1);
    assert_eq!(session.control().mode(), TrainerMode::Sim);
    assert!(matches!(
        session.control().last_sent(),
        Some(ControlCommand::TrackResistance(_))
    ));

    session.finish().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_workout_loaded_mid_ride() {
    let mut session = erg_session(200).await;
    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(session.control().mode(), TrainerMode::Sim);

    session.load_workout(steady(600, 0.9));
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(session.control().mode(), TrainerMode::Erg);
    assert!((last_target(&session) - 180.0).abs() < 1e-6);

    session.finish().await.unwrap();
}
