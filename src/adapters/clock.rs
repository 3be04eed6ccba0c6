//! Time adapters.
//!
//! - [`MonotonicClock`] wraps `std::time::Instant`; use it with real
//!   instruments, where stability timing must follow the wall.
//! - [`SimulatedClock`] advances by exactly `dt` per control tick, so
//!   stability timing agrees with the simulated plant's physics even when
//!   the loop runs faster than real time.

use std::time::Instant;

use crate::app::ports::ClockPort;

pub struct MonotonicClock {
    start: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl ClockPort for MonotonicClock {
    fn now_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedClock {
    now: f64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClockPort for SimulatedClock {
    fn now_secs(&self) -> f64 {
        self.now
    }

    fn on_tick(&mut self, dt: f64) {
        self.now += dt;
    }
}
