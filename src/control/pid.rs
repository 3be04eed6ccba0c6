//! PID controller for cryostat cooling power
//!
//! Filtered-measurement PID with conditional-integration anti-windup.
//! Output is a cooling command in percent, clamped to `[0, 100]`.
//!
//! Sign convention: `error = target - measured`, and all three gains are
//! negative, so cooling rises when the stage is warmer than the target.
//! Flipping any sign inverts the loop.

/// Output bounds of the cooling actuator (percent).
pub const OUTPUT_MIN: f64 = 0.0;
pub const OUTPUT_MAX: f64 = 100.0;

/// PID gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// PID controller
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral_sum: f64,
    /// Filtered measurement from the previous step (derivative input).
    prev_measurement: f64,
    /// Command issued on the previous step (anti-windup gate).
    output: f64,
}

impl PidController {
    /// `initial_measurement` seeds the derivative so the first step does
    /// not see a spurious jump.
    pub fn new(gains: PidGains, initial_measurement: f64) -> Self {
        Self {
            gains,
            integral_sum: 0.0,
            prev_measurement: initial_measurement,
            output: OUTPUT_MIN,
        }
    }

    /// Compute the cooling command for one step.
    ///
    /// The integral only accumulates while the *previous* command was
    /// strictly inside `(OUTPUT_MIN, OUTPUT_MAX)`.  The derivative acts on
    /// the measurement, not the error, so setpoint changes do not kick.
    pub fn compute(&mut self, target: f64, measured: f64, dt: f64) -> f64 {
        let error = target - measured;

        // Integral (frozen while saturated)
        if self.output > OUTPUT_MIN && self.output < OUTPUT_MAX {
            self.integral_sum += error * dt;
        }

        // Derivative of measurement
        let derivative = if dt > 0.0 {
            (measured - self.prev_measurement) / dt
        } else {
            0.0
        };

        let raw = self.gains.kp * error + self.gains.ki * self.integral_sum
            - self.gains.kd * derivative;
        self.output = raw.clamp(OUTPUT_MIN, OUTPUT_MAX);
        self.prev_measurement = measured;

        self.output
    }

    /// Clear accumulated integral.  Called on every setpoint transition.
    pub fn reset_integral(&mut self) {
        self.integral_sum = 0.0;
    }

    /// Full reset: integral cleared and actuator considered off.
    pub fn reset(&mut self, measurement: f64) {
        self.integral_sum = 0.0;
        self.prev_measurement = measurement;
        self.output = OUTPUT_MIN;
    }

    pub fn integral_sum(&self) -> f64 {
        self.integral_sum
    }

    /// Last command issued (percent).
    pub fn output(&self) -> f64 {
        self.output
    }
}
