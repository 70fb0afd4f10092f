//! Metrics module for post-session power analysis.

pub mod mmp;

pub use mmp::{mean_max_power, MmpCalculator, PowerRecord, SESSION_MMP_DURATIONS};
