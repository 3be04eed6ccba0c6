//! Shared mutable context threaded through every stability handler.
//!
//! `StabilityContext` is the single struct that state handlers read from
//! and write to: the latest temperature and timestamp, the schedule and
//! its cursor, the stability timer, the advance-mode flags, and the
//! per-tick [`EvaluationOutcome`] the service turns into events.

use log::{error, info};

use crate::config::{ControllerConfig, EndOfSchedule};
use crate::error::ScheduleError;
use crate::schedule::{Schedule, ScheduleCursor};

use super::StateId;

// ---------------------------------------------------------------------------
// Stability timer
// ---------------------------------------------------------------------------

/// Continuous in-band timing for the current setpoint.
///
/// `stabilization_start` is `None` whenever the last observed temperature
/// was outside the band.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StabilityTimer {
    pub stabilization_start: Option<f64>,
    pub is_stable: bool,
    /// `now - stabilization_start` as of the last in-band tick (s).
    pub stable_duration: f64,
}

impl StabilityTimer {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Per-tick outcome (written by handlers; consumed by the service)
// ---------------------------------------------------------------------------

/// What happened during one evaluation.  Cleared before every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvaluationOutcome {
    /// FSM transition taken this tick, if any.
    pub transition: Option<(StateId, StateId)>,
    /// The dwell was satisfied for the first time this episode.
    pub stabilized: bool,
    /// The cursor moved: `(from_index, to_index)`.
    pub advanced: Option<(usize, usize)>,
    /// An advance was attempted at the terminal entry (reported once).
    pub schedule_complete: bool,
}

// ---------------------------------------------------------------------------
// StabilityContext
// ---------------------------------------------------------------------------

pub struct StabilityContext {
    // -- Inputs (written before each tick) --
    /// Temperature under evaluation (K).
    pub temperature: f64,
    /// Monotonic timestamp of this evaluation (s).
    pub now: f64,

    // -- Schedule --
    pub schedule: Schedule,
    pub cursor: ScheduleCursor,
    pub end_policy: EndOfSchedule,

    // -- Stability --
    pub threshold: f64,
    pub timer: StabilityTimer,

    // -- Mode flags --
    pub auto_advance: bool,
    /// External advance trigger, consumed by [`advance`](Self::advance).
    pub update_requested: bool,
    /// Terminal entry already reported.
    pub complete_reported: bool,

    // -- Outputs --
    pub outcome: EvaluationOutcome,
}

impl StabilityContext {
    /// Build a context at schedule index 0.
    pub fn new(schedule: Schedule, config: &ControllerConfig) -> Result<Self, ScheduleError> {
        let cursor = ScheduleCursor::at(&schedule, 0)?;
        Ok(Self {
            temperature: config.initial_temperature_k,
            now: 0.0,
            schedule,
            cursor,
            end_policy: config.end_of_schedule,
            threshold: config.stability_threshold_k,
            timer: StabilityTimer::default(),
            auto_advance: config.auto_advance,
            update_requested: false,
            complete_reported: false,
            outcome: EvaluationOutcome::default(),
        })
    }

    /// `|temperature - target| <= threshold`.  NaN is out of band.
    pub fn in_band(&self) -> bool {
        (self.temperature - self.cursor.current_target).abs() <= self.threshold
    }

    /// Whether reaching stability should advance the cursor now.
    pub fn advance_triggered(&self) -> bool {
        self.auto_advance || self.update_requested
    }

    /// Seconds since the timer started, or 0 if it is not running.
    pub fn elapsed_in_band(&self) -> f64 {
        self.timer
            .stabilization_start
            .map_or(0.0, |start| self.now - start)
    }

    /// Move to the next schedule entry.
    ///
    /// Returns `true` if the cursor moved.  At the terminal entry under
    /// [`EndOfSchedule::Hold`] the request is consumed and nothing moves.
    /// Resetting the PID integral is the caller's job, keyed off
    /// `outcome.advanced`.
    pub fn advance(&mut self) -> bool {
        let from = self.cursor.index;
        let Some(next) = self.schedule.next_index(from, self.end_policy) else {
            self.update_requested = false;
            if !self.complete_reported {
                info!(
                    "Schedule complete; holding at {:.2} K",
                    self.cursor.current_target
                );
                self.complete_reported = true;
                self.outcome.schedule_complete = true;
            }
            return false;
        };

        match ScheduleCursor::at(&self.schedule, next) {
            Ok(cursor) => {
                self.cursor = cursor;
                self.timer.reset();
                self.update_requested = false;
                self.outcome.advanced = Some((from, next));
                info!(
                    "Switching to setpoint {} of {}: {:.2} K, dwell {:.1}s",
                    next + 1,
                    self.schedule.len(),
                    cursor.current_target,
                    cursor.current_dwell_time
                );
                true
            }
            Err(e) => {
                error!("Cannot advance schedule: {e}");
                false
            }
        }
    }

    /// Jump the cursor to `index` (resume after restart).
    pub fn seek(&mut self, index: usize) -> Result<(), ScheduleError> {
        self.cursor = ScheduleCursor::at(&self.schedule, index)?;
        self.timer.reset();
        self.update_requested = false;
        self.complete_reported = false;
        Ok(())
    }
}
