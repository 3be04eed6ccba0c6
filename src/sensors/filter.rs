//! Exponential smoothing of noisy temperature readings.
//!
//! `filtered = alpha * reading + (1 - alpha) * filtered_prev`
//!
//! `alpha = 1` passes readings through unchanged; smaller values trade
//! responsiveness for noise rejection.  The filter is seeded with the
//! plant's initial temperature, never with zero, so the first derivative
//! seen by the PID is not a huge spike.

#[derive(Debug, Clone, Copy)]
pub struct ExponentialFilter {
    alpha: f64,
    value: f64,
}

impl ExponentialFilter {
    /// `alpha` must lie in `(0, 1]`; it is checked by `config::validate`.
    pub fn new(alpha: f64, initial: f64) -> Self {
        debug_assert!(alpha > 0.0 && alpha <= 1.0, "alpha out of range: {alpha}");
        Self {
            alpha,
            value: initial,
        }
    }

    /// Fold one reading into the running estimate and return it.
    pub fn update(&mut self, reading: f64) -> f64 {
        self.value = self.alpha * reading + (1.0 - self.alpha) * self.value;
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Discard history and restart from `value`.
    pub fn reset(&mut self, value: f64) {
        self.value = value;
    }
}
