//! Simulated world: rider physics and the route being ridden.

pub mod import;
pub mod physics;
pub mod route;

pub use physics::PhysicsEngine;
pub use route::{Route, RouteError, RoutePoint};
