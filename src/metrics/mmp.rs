//! Mean maximal power (MMP) extraction from a session's power samples.
//!
//! Samples are assumed to be one per control-loop tick (nominally 1 Hz).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Durations (seconds) recorded at the end of every session.
pub const SESSION_MMP_DURATIONS: [u32; 8] = [1, 5, 15, 30, 60, 300, 600, 1200];

/// Best average power over one duration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerRecord {
    /// Window length in seconds
    pub duration_secs: u32,
    /// Best average power over the window (watts)
    pub watts: u32,
    /// Watts per kilogram of rider weight
    pub watts_per_kg: f64,
    /// When the record was set
    pub date: DateTime<Utc>,
}

/// Mean maximal power over a fixed window, using a running sum.
///
/// Returns 0 when there are fewer samples than `window`.
pub fn mean_max_power(samples: &[u32], window: usize) -> u32 {
    if window == 0 || samples.len() < window {
        return 0;
    }

    let mut sum: u64 = samples[..window].iter().map(|&p| p as u64).sum();
    let mut best = sum;
    for i in window..samples.len() {
        sum = sum + samples[i] as u64 - samples[i - window] as u64;
        best = best.max(sum);
    }

    (best / window as u64) as u32
}

/// MMP calculator for a fixed set of durations.
#[derive(Debug, Clone)]
pub struct MmpCalculator {
    durations: Vec<u32>,
}

impl Default for MmpCalculator {
    fn default() -> Self {
        Self::new(&SESSION_MMP_DURATIONS)
    }
}

impl MmpCalculator {
    pub fn new(durations: &[u32]) -> Self {
        let mut durations = durations.to_vec();
        durations.sort_unstable();
        durations.dedup();
        Self { durations }
    }

    pub fn durations(&self) -> &[u32] {
        &self.durations
    }

    /// Power records for every duration with a positive best.
    ///
    /// `rider_weight_kg` must be positive; callers substitute a fallback.
    pub fn records(&self, samples: &[u32], rider_weight_kg: f64) -> Vec<PowerRecord> {
        let date = Utc::now();
        self.durations
            .iter()
            .filter_map(|&duration| {
                let watts = mean_max_power(samples, duration as usize);
                (watts > 0).then(|| PowerRecord {
                    duration_secs: duration,
                    watts,
                    watts_per_kg: watts as f64 / rider_weight_kg,
                    date,
                })
            })
            .collect()
    }
}
