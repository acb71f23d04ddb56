//! Simulation tunables
//!
//! Everything an operator may want to adjust lives in [`SimConfig`]; fixed
//! model constants stay with the modules that own them.

use rand::Rng;
use serde::Deserialize;

use super::types::Mode;

/// Largest time step a single tick may integrate, in seconds.
pub const MAX_TICK_DT: f64 = 0.2;

/// Normal distribution a nominal speed is drawn from, clamped to `[min, max]`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpeedProfile {
    pub mean: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SpeedProfile {
    pub const fn new(mean: f64, std_dev: f64, min: f64, max: f64) -> Self {
        Self { mean, std_dev, min, max }
    }

    /// Draw a clamped sample via the Box-Muller transform.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.std_dev <= 0.0 {
            return self.mean.clamp(self.min, self.max);
        }
        let u1: f64 = rng.random::<f64>().max(1e-12);
        let u2: f64 = rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        (self.mean + self.std_dev * z).clamp(self.min, self.max)
    }
}

/// Probabilities used by `spawn_many` to pick agent kinds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpawnMix {
    pub car: f64,
    pub bicycle: f64,
    pub pedestrian: f64,
}

impl SpawnMix {
    pub fn new(car: f64, bicycle: f64, pedestrian: f64) -> Self {
        Self { car, bicycle, pedestrian }
    }

    /// Probabilities must be non-negative and sum to 1 within 1e-6.
    pub fn validate(&self) -> Result<(), String> {
        if self.car < 0.0 || self.bicycle < 0.0 || self.pedestrian < 0.0 {
            return Err("probabilities must be non-negative".to_string());
        }
        let sum = self.car + self.bicycle + self.pedestrian;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(format!("probabilities sum to {sum}, expected 1"));
        }
        Ok(())
    }

    /// Map a uniform draw in `[0, 1)` to a mode.
    pub fn pick(&self, roll: f64) -> Mode {
        if roll < self.car {
            Mode::Car
        } else if roll < self.car + self.bicycle {
            Mode::Bicycle
        } else {
            Mode::Pedestrian
        }
    }
}

impl Default for SpawnMix {
    fn default() -> Self {
        Self::new(0.6, 0.25, 0.15)
    }
}

/// All recognised simulation options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Planner fallback for edges with no sampled multiplier yet.
    pub default_multiplier: f64,
    /// Lower bound of the legacy narrow multiplier band.
    pub min_multiplier: f64,
    /// Upper bound of the legacy narrow multiplier band. Live values follow
    /// the band sampler, which extends to 6.0.
    pub max_multiplier: f64,
    /// Cost-increase ratio that would trigger a reroute. Reserved.
    pub reroute_threshold: f64,
    /// Capacity-usage an edge admits per unit of length.
    pub base_edge_capacity: f64,
    /// Upper clamp applied to every tick's time step, in seconds.
    pub max_tick_dt: f64,
    /// Rate at which current speed approaches target speed, units/s^2.
    pub acceleration: f64,
    pub car_speed: SpeedProfile,
    pub bicycle_speed: SpeedProfile,
    pub pedestrian_speed: SpeedProfile,
    pub spawn_mix: SpawnMix,
    /// Expected random accidents per hour of simulated time. 0 disables.
    pub accident_rate_per_hour: f64,
    /// Background spawns per minute of simulated time. 0 disables.
    pub auto_spawn_rate_per_min: f64,
}

impl SimConfig {
    pub fn speed_profile(&self, mode: Mode) -> &SpeedProfile {
        match mode {
            Mode::Car => &self.car_speed,
            Mode::Bicycle => &self.bicycle_speed,
            Mode::Pedestrian => &self.pedestrian_speed,
        }
    }

    /// Road space one agent of the given kind occupies.
    pub fn capacity_usage(&self, mode: Mode) -> f64 {
        match mode {
            Mode::Car => 1.0,
            Mode::Bicycle => 0.5,
            Mode::Pedestrian => 0.2,
        }
    }

    /// Variant with exact nominal speeds, for reproducible runs.
    pub fn deterministic_speeds(mut self) -> Self {
        for profile in [
            &mut self.car_speed,
            &mut self.bicycle_speed,
            &mut self.pedestrian_speed,
        ] {
            profile.std_dev = 0.0;
            profile.min = profile.mean;
            profile.max = profile.mean;
        }
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            default_multiplier: 1.0,
            min_multiplier: 0.5,
            max_multiplier: 3.0,
            reroute_threshold: 0.2,
            base_edge_capacity: 3.0,
            max_tick_dt: MAX_TICK_DT,
            acceleration: 0.2,
            car_speed: SpeedProfile::new(60.0, 9.0, 30.0, 90.0),
            bicycle_speed: SpeedProfile::new(40.0, 6.0, 15.0, 60.0),
            pedestrian_speed: SpeedProfile::new(20.0, 3.0, 8.0, 30.0),
            spawn_mix: SpawnMix::default(),
            accident_rate_per_hour: 0.0,
            auto_spawn_rate_per_min: 0.0,
        }
    }
}
