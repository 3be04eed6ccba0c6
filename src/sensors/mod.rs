//! Sensor chain for the simulated cryostat thermometer.
//!
//! The true plant temperature passes through two stages each tick:
//!
//! ```text
//!   true T ──▶ + GaussianNoise ──▶ raw reading ──▶ ExponentialFilter ──▶ filtered
//! ```
//!
//! The filtered value feeds the PID; the raw reading is reported for
//! diagnostics only.

pub mod filter;
pub mod noise;

use filter::ExponentialFilter;
use noise::GaussianNoise;

/// One pass through the sensor chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Noisy instantaneous reading (K).
    pub raw: f64,
    /// Smoothed reading (K).
    pub filtered: f64,
}

/// Noise source plus smoothing filter.
pub struct SensorChain {
    noise: GaussianNoise,
    filter: ExponentialFilter,
}

impl SensorChain {
    pub fn new(noise: GaussianNoise, filter: ExponentialFilter) -> Self {
        Self { noise, filter }
    }

    /// Sample the thermometer looking at `true_temperature`.
    pub fn read(&mut self, true_temperature: f64) -> SensorReading {
        let raw = true_temperature + self.noise.sample();
        let filtered = self.filter.update(raw);
        SensorReading { raw, filtered }
    }

    /// Latest filtered value without taking a new sample.
    pub fn filtered(&self) -> f64 {
        self.filter.value()
    }

    pub fn reset(&mut self, temperature: f64) {
        self.filter.reset(temperature);
    }
}
