//! Controller configuration parameters
//!
//! All tunable parameters for the regulator: PID gains, plant constants
//! for the simulated cryostat, sensor-noise model, stability detection
//! and loop timing.  Values can be overridden from a JSON file through
//! [`ConfigPort`](crate::app::ports::ConfigPort).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What [`advance`](crate::fsm::context::StabilityContext::advance) does at
/// the last schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EndOfSchedule {
    /// The last entry is terminal; keep regulating at it.
    #[default]
    Hold,
    /// Cycle back to the first entry.
    Wrap,
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- PID ---
    /// Proportional gain.  Negative: cooling rises as temperature exceeds target.
    pub kp: f64,
    /// Integral gain (negative by the same convention).
    pub ki: f64,
    /// Derivative-on-measurement gain (negative by the same convention).
    pub kd: f64,

    // --- Plant ---
    /// Temperature of the surroundings (K).
    pub ambient_temperature_k: f64,
    /// Plant temperature at construction (K).
    pub initial_temperature_k: f64,
    /// Constant heat leak into the cold stage (K/s).
    pub parasitic_heat_load: f64,
    /// Newtonian coupling to ambient (1/s).
    pub heat_loss_coeff: f64,
    /// Cooling rate at 100% power (K/s).
    pub cooling_effect_factor: f64,

    // --- Sensor ---
    /// Standard deviation of the Gaussian sensor noise (K).  0 disables noise.
    pub noise_std_dev: f64,
    /// Exponential smoothing factor, 0 < alpha <= 1.
    pub filter_alpha: f64,
    /// Seed for the noise generator.  `None` seeds from OS entropy.
    pub noise_seed: Option<u64>,

    // --- Stability ---
    /// Half-width of the stability band around the target (K).
    pub stability_threshold_k: f64,
    /// Advance automatically once stable.
    pub auto_advance: bool,
    /// Behaviour at the last schedule entry.
    pub end_of_schedule: EndOfSchedule,
    /// Dwell applied to every setpoint when a schedule's dwell list is unusable (s).
    pub default_dwell_secs: f64,

    // --- Timing ---
    /// Control loop period (milliseconds).
    pub control_loop_interval_ms: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // PID
            kp: -130.0,
            ki: -1.5,
            kd: -600.0,

            // Plant
            ambient_temperature_k: 300.0,
            initial_temperature_k: 300.0,
            parasitic_heat_load: 0.1,
            heat_loss_coeff: 0.0001,
            cooling_effect_factor: 2.0,

            // Sensor
            noise_std_dev: 0.1,
            filter_alpha: 0.2,
            noise_seed: None,

            // Stability
            stability_threshold_k: 0.5,
            auto_advance: true,
            end_of_schedule: EndOfSchedule::Hold,
            default_dwell_secs: 10.0,

            // Timing
            control_loop_interval_ms: 1000, // 1 Hz
        }
    }
}

impl ControllerConfig {
    /// Seconds per control tick.
    pub fn tick_secs(&self) -> f64 {
        f64::from(self.control_loop_interval_ms) / 1000.0
    }
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate(cfg: &ControllerConfig) -> Result<(), ConfigError> {
    if ![cfg.kp, cfg.ki, cfg.kd].iter().all(|g| g.is_finite()) {
        return Err(ConfigError::ValidationFailed("PID gains must be finite"));
    }
    if !(cfg.filter_alpha > 0.0 && cfg.filter_alpha <= 1.0) {
        return Err(ConfigError::ValidationFailed("filter_alpha must be in (0, 1]"));
    }
    if !(cfg.noise_std_dev >= 0.0 && cfg.noise_std_dev.is_finite()) {
        return Err(ConfigError::ValidationFailed(
            "noise_std_dev must be finite and >= 0",
        ));
    }
    if !(cfg.stability_threshold_k > 0.0 && cfg.stability_threshold_k.is_finite()) {
        return Err(ConfigError::ValidationFailed(
            "stability_threshold_k must be finite and > 0",
        ));
    }
    if cfg.control_loop_interval_ms == 0 {
        return Err(ConfigError::ValidationFailed(
            "control_loop_interval_ms must be > 0",
        ));
    }
    for (value, msg) in [
        (cfg.ambient_temperature_k, "ambient_temperature_k must be finite and >= 0"),
        (cfg.initial_temperature_k, "initial_temperature_k must be finite and >= 0"),
        (cfg.default_dwell_secs, "default_dwell_secs must be finite and >= 0"),
        (cfg.heat_loss_coeff, "heat_loss_coeff must be finite and >= 0"),
        (cfg.cooling_effect_factor, "cooling_effect_factor must be finite and >= 0"),
    ] {
        if !(value >= 0.0 && value.is_finite()) {
            return Err(ConfigError::ValidationFailed(msg));
        }
    }
    if !cfg.parasitic_heat_load.is_finite() {
        return Err(ConfigError::ValidationFailed(
            "parasitic_heat_load must be finite",
        ));
    }
    Ok(())
}
