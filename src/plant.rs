//! Lumped thermal model of a cryostat cold stage.
//!
//! ```text
//!   dT/dt = k_loss·(T_amb − T) + Q_parasitic − k_cool·P/100
//! ```
//!
//! integrated with a forward-Euler step and clamped at absolute zero.

use crate::config::ControllerConfig;

/// Physical constants of the simulated plant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlantConstants {
    /// Temperature of the surroundings (K).
    pub ambient: f64,
    /// Constant heat leak (K/s).
    pub parasitic_heat_load: f64,
    /// Coupling to ambient (1/s).
    pub heat_loss_coeff: f64,
    /// Cooling rate at 100% power (K/s).
    pub cooling_effect_factor: f64,
}

impl PlantConstants {
    pub fn from_config(cfg: &ControllerConfig) -> Self {
        Self {
            ambient: cfg.ambient_temperature_k,
            parasitic_heat_load: cfg.parasitic_heat_load,
            heat_loss_coeff: cfg.heat_loss_coeff,
            cooling_effect_factor: cfg.cooling_effect_factor,
        }
    }
}

/// Temperatures carried between ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThermalState {
    /// True plant temperature (K, >= 0).
    pub temperature: f64,
    /// Filtered sensor estimate (K).
    pub filtered_temperature: f64,
    /// Filtered estimate from the previous tick (K).
    pub previous_filtered_temperature: f64,
}

impl ThermalState {
    pub fn at(temperature: f64) -> Self {
        Self {
            temperature,
            filtered_temperature: temperature,
            previous_filtered_temperature: temperature,
        }
    }
}

pub struct ThermalPlant {
    constants: PlantConstants,
    temperature: f64,
}

impl ThermalPlant {
    pub fn new(constants: PlantConstants, initial_temperature: f64) -> Self {
        Self {
            constants,
            temperature: initial_temperature.max(0.0),
        }
    }

    /// Integrate one step with `cooling_power` percent applied for `dt` seconds.
    pub fn step(&mut self, cooling_power: f64, dt: f64) -> f64 {
        let c = &self.constants;
        let rate = c.heat_loss_coeff * (c.ambient - self.temperature) + c.parasitic_heat_load
            - c.cooling_effect_factor * cooling_power / 100.0;
        self.temperature = (self.temperature + rate * dt).max(0.0);
        self.temperature
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn constants(&self) -> PlantConstants {
        self.constants
    }
}
