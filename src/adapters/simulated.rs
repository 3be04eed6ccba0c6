//! Simulated cryostat bridge.
//!
//! Implements [`HardwareBridge`] by running the whole control law in
//! software each step:
//!
//! ```text
//!   plant T ──▶ SensorChain (noise + filter) ──▶ PID ──▶ cooling % ──▶ ThermalPlant
//! ```
//!
//! `advance` returns the true plant temperature; the filtered estimate
//! only drives the PID.

use log::info;

use crate::app::ports::HardwareBridge;
use crate::config::ControllerConfig;
use crate::control::pid::{OUTPUT_MIN, PidController, PidGains};
use crate::error::IoError;
use crate::plant::{PlantConstants, ThermalPlant, ThermalState};
use crate::sensors::SensorChain;
use crate::sensors::filter::ExponentialFilter;
use crate::sensors::noise::GaussianNoise;

pub struct SimulatedBridge {
    sensor: SensorChain,
    pid: PidController,
    plant: ThermalPlant,
    state: ThermalState,
    cooling_power: f64,
}

impl SimulatedBridge {
    pub fn new(
        constants: PlantConstants,
        gains: PidGains,
        sensor: SensorChain,
        initial_temperature: f64,
    ) -> Self {
        let plant = ThermalPlant::new(constants, initial_temperature);
        let t0 = plant.temperature();
        Self {
            sensor,
            pid: PidController::new(gains, t0),
            plant,
            state: ThermalState::at(t0),
            cooling_power: OUTPUT_MIN,
        }
    }

    /// Build from the gains, plant constants and noise model in `cfg`.
    pub fn from_config(cfg: &ControllerConfig) -> Self {
        let t0 = cfg.initial_temperature_k;
        let sensor = SensorChain::new(
            GaussianNoise::new(cfg.noise_std_dev, cfg.noise_seed),
            ExponentialFilter::new(cfg.filter_alpha, t0),
        );
        let gains = PidGains {
            kp: cfg.kp,
            ki: cfg.ki,
            kd: cfg.kd,
        };
        Self::new(PlantConstants::from_config(cfg), gains, sensor, t0)
    }

    /// Cooling command applied on the last step (percent).
    pub fn cooling_power(&self) -> f64 {
        self.cooling_power
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn thermal_state(&self) -> ThermalState {
        self.state
    }
}

impl HardwareBridge for SimulatedBridge {
    fn read_temperature(&mut self) -> Result<f64, IoError> {
        Ok(self.plant.temperature())
    }

    fn advance(&mut self, target: f64, dt: f64) -> Result<f64, IoError> {
        let reading = self.sensor.read(self.plant.temperature());

        self.cooling_power = self.pid.compute(target, reading.filtered, dt);
        let temperature = self.plant.step(self.cooling_power, dt);

        self.state = ThermalState {
            temperature,
            filtered_temperature: reading.filtered,
            previous_filtered_temperature: self.state.filtered_temperature,
        };
        Ok(temperature)
    }

    fn reset_control_state(&mut self) {
        self.pid.reset_integral();
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        self.cooling_power = OUTPUT_MIN;
        self.pid.reset(self.sensor.filtered());
        info!(
            "Simulated plant: cooling off at {:.3} K",
            self.plant.temperature()
        );
        Ok(())
    }
}
