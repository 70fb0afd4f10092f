//! Physics engine for power-to-speed calculation
//!
//! Steady-state point-mass model: gravity, rolling resistance and
//! aerodynamic drag. Speed is recovered from power by bisection so the
//! result stays bounded even when net force is negative (descents).

/// Physics constants
pub const GRAVITY: f64 = 9.81; // m/s²
pub const AIR_DENSITY: f64 = 1.225; // kg/m³ at sea level
pub const DEFAULT_CDA: f64 = 0.32; // m²
pub const DEFAULT_CRR: f64 = 0.005;
pub const DRIVETRAIN_EFFICIENCY: f64 = 0.96;

/// Fallback rider mass when the profile has none
pub const DEFAULT_RIDER_MASS_KG: f64 = 75.0;
/// Fallback bike mass when the profile has none
pub const DEFAULT_BIKE_MASS_KG: f64 = 9.0;

/// Upper bound of the speed search bracket (~144 km/h)
pub const MAX_SPEED_MPS: f64 = 40.0;
/// Maximum bisection iterations
pub const BISECTION_ITERATIONS: usize = 20;
/// Bracket width at which bisection stops early
pub const BISECTION_TOLERANCE_MPS: f64 = 0.01;

/// Physics engine for calculating virtual speed from power
#[derive(Debug, Clone)]
pub struct PhysicsEngine {
    /// Rider mass in kilograms
    pub rider_mass_kg: f64,
    /// Bike mass in kilograms
    pub bike_mass_kg: f64,
    /// Drag coefficient times frontal area (CdA)
    pub cda: f64,
    /// Rolling resistance coefficient
    pub crr: f64,
}

impl Default for PhysicsEngine {
    fn default() -> Self {
        Self {
            rider_mass_kg: DEFAULT_RIDER_MASS_KG,
            bike_mass_kg: DEFAULT_BIKE_MASS_KG,
            cda: DEFAULT_CDA,
            crr: DEFAULT_CRR,
        }
    }
}

impl PhysicsEngine {
    /// Create a new physics engine. Zero or negative masses fall back to defaults.
    pub fn new(rider_mass_kg: f64, bike_mass_kg: f64) -> Self {
        let mut engine = Self::default();
        engine.set_masses(rider_mass_kg, bike_mass_kg);
        engine
    }

    /// Total system mass (rider + bike)
    pub fn total_mass(&self) -> f64 {
        self.rider_mass_kg + self.bike_mass_kg
    }

    /// Update masses (e.g., from a profile change during a ride)
    pub fn set_masses(&mut self, rider_mass_kg: f64, bike_mass_kg: f64) {
        self.rider_mass_kg = if rider_mass_kg > 0.0 {
            rider_mass_kg
        } else {
            DEFAULT_RIDER_MASS_KG
        };
        self.bike_mass_kg = if bike_mass_kg > 0.0 {
            bike_mass_kg
        } else {
            DEFAULT_BIKE_MASS_KG
        };
    }

    /// Power (W) needed at the wheel to hold `speed_mps` on `grade_percent`.
    pub fn power_required(&self, speed_mps: f64, grade_percent: f64) -> f64 {
        let (f_linear, aero) = self.force_terms(grade_percent);
        aero * speed_mps.powi(3) + f_linear * speed_mps
    }

    /// Gravity + rolling force (N) and the aero constant ½ρCdA.
    fn force_terms(&self, grade_percent: f64) -> (f64, f64) {
        let mass = self.total_mass();
        let theta = (grade_percent / 100.0).atan();

        // Gravity is negative downhill (assists)
        let f_gravity = mass * GRAVITY * theta.sin();
        let f_rolling = mass * GRAVITY * theta.cos() * self.crr;

        (f_gravity + f_rolling, 0.5 * AIR_DENSITY * self.cda)
    }

    /// Calculate steady-state speed from power and grade.
    ///
    /// # Arguments
    /// * `power_watts` - Rider power at the crank in watts
    /// * `grade_percent` - Road grade as a percentage
    ///
    /// # Returns
    /// Speed in meters per second, always finite and non-negative
    pub fn calculate_speed(&self, power_watts: f64, grade_percent: f64) -> f64 {
        let power = if power_watts.is_finite() { power_watts } else { 0.0 };
        let grade = if grade_percent.is_finite() {
            grade_percent
        } else {
            0.0
        };
        let power_wheel = power * DRIVETRAIN_EFFICIENCY;
        let (f_linear, aero) = self.force_terms(grade);

        let mut low = 0.0;
        let mut high = MAX_SPEED_MPS;

        for _ in 0..BISECTION_ITERATIONS {
            let mid = (low + high) / 2.0;
            let required = aero * mid.powi(3) + f_linear * mid;

            if required < power_wheel {
                low = mid;
            } else {
                high = mid;
            }

            if (high - low).abs() < BISECTION_TOLERANCE_MPS {
                break;
            }
        }

        // Never found a speed the rider can sustain: stationary
        if low == 0.0 {
            return 0.0;
        }

        let v = (low + high) / 2.0;
        if v.is_finite() {
            v.max(0.0)
        } else {
            0.0
        }
    }
}
