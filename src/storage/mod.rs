//! Storage module for configuration.

pub mod config;

pub use config::{AppConfig, ConfigError, RiderProfile};
