//! ErgSim - Smart Trainer Ride Simulator
//!
//! Drives an indoor-cycling trainer in real time: sensor samples become a
//! simulated road speed and position, and resistance or target-power
//! commands go back to the trainer over ANT+ FE-C. Rides follow a GPX route,
//! a structured workout, or both.

pub mod metrics;
pub mod sensors;
pub mod session;
pub mod storage;
pub mod workouts;
pub mod world;

// Re-export commonly used types
pub use sensors::control::TrainerControl;
pub use sensors::device::TrainerDevice;
pub use session::{Session, SessionEvent, SessionState, SessionSummary};
pub use storage::config::{AppConfig, RiderProfile};
pub use workouts::engine::WorkoutEngine;
pub use world::physics::PhysicsEngine;
pub use world::route::Route;
