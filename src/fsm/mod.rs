//! Function-pointer finite state machine engine and the stability
//! scheduler built on it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                     │
//! │  ┌───────────────┬───────────┬───────────────────┐              │
//! │  │ StateId       │ on_enter  │ on_update         │              │
//! │  ├───────────────┼───────────┼───────────────────┤              │
//! │  │ Unstable      │ fn(ctx)   │ fn(ctx)->Option<> │              │
//! │  │ Stabilizing   │ -         │ fn(ctx)->Option<> │              │
//! │  │ StableWaiting │ fn(ctx)   │ fn(ctx)->Option<> │              │
//! │  └───────────────┴───────────┴───────────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state.
//! If it returns `Some(next_id)`, the engine moves the current pointer
//! and runs `on_enter` for the next state.  All functions receive `&mut StabilityContext`.

pub mod context;
pub mod states;

use context::{EvaluationOutcome, StabilityContext, StabilityTimer};
use log::{debug, info};

use crate::config::ControllerConfig;
use crate::error::ScheduleError;
use crate::schedule::{Schedule, ScheduleCursor};

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Stability states.
/// Must stay in sync with the table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    /// Outside the band (or freshly switched setpoint); timer stopped.
    Unstable = 0,
    /// In band, timer running, dwell not yet satisfied.
    Stabilizing = 1,
    /// Dwell satisfied, waiting for an advance trigger.
    StableWaiting = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Convert an index back to `StateId`.  Out-of-range asserts in debug
    /// builds and falls back to `Unstable` in release.
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Unstable,
            1 => Self::Stabilizing,
            2 => Self::StableWaiting,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Unstable
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` actions.
pub type StateActionFn = fn(&mut StabilityContext);

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut StabilityContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// `id` must equal the row's index in the table.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
}

/// First row whose `id` does not match its position, if any.
pub fn misplaced_row(table: &[StateDescriptor]) -> Option<usize> {
    table
        .iter()
        .enumerate()
        .find(|(i, d)| d.id as usize != *i)
        .map(|(i, _)| i)
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

pub struct Fsm {
    /// Fixed-size table indexed by `StateId as usize`.
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        debug_assert_eq!(misplaced_row(&table), None, "state table out of order");
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    /// Call once after construction, before the first `tick()`.
    pub fn start(&mut self, ctx: &mut StabilityContext) {
        debug!("FSM starting in state: {}", self.table[self.current].name);
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one tick.
    pub fn tick(&mut self, ctx: &mut StabilityContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            self.transition(next_id, ctx);
        }
    }

    /// Force an immediate transition, bypassing `on_update`.
    pub fn force_transition(&mut self, next: StateId, ctx: &mut StabilityContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        } else if let Some(enter) = self.table[self.current].on_enter {
            // Re-entering the same state still runs its entry action.
            enter(ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        StateId::from_index(self.current)
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut StabilityContext) {
        let next_idx = next_id as usize;

        debug!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        self.current = next_idx;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}

// ---------------------------------------------------------------------------
// Stability scheduler
// ---------------------------------------------------------------------------

/// Decides when the plant is stable at the current setpoint and when to
/// move to the next schedule entry.
pub struct StabilityScheduler {
    fsm: Fsm,
    ctx: StabilityContext,
}

impl StabilityScheduler {
    /// Fails only if the schedule cannot be addressed at index 0.
    pub fn new(schedule: Schedule, config: &ControllerConfig) -> Result<Self, ScheduleError> {
        let mut ctx = StabilityContext::new(schedule, config)?;
        let mut fsm = Fsm::new(states::build_state_table(), StateId::Unstable);
        fsm.start(&mut ctx);
        info!(
            "Scheduler ready: {} setpoints, target {:.2} K, dwell {:.1}s, auto={}",
            ctx.schedule.len(),
            ctx.cursor.current_target,
            ctx.cursor.current_dwell_time,
            ctx.auto_advance
        );
        Ok(Self { fsm, ctx })
    }

    /// Evaluate one observation.  Call exactly once per control tick.
    pub fn evaluate(&mut self, temperature: f64, now: f64) -> EvaluationOutcome {
        self.ctx.temperature = temperature;
        self.ctx.now = now;
        self.ctx.outcome = EvaluationOutcome::default();

        let from = self.fsm.current_state();
        self.fsm.tick(&mut self.ctx);
        let to = self.fsm.current_state();
        if from != to {
            self.ctx.outcome.transition = Some((from, to));
        }
        self.ctx.outcome
    }

    pub fn set_auto_advance(&mut self, enabled: bool) {
        if self.ctx.auto_advance != enabled {
            info!("Auto advance {}", if enabled { "enabled" } else { "disabled" });
        }
        self.ctx.auto_advance = enabled;
    }

    /// Ask for an advance at the next stable tick.  Idempotent.
    pub fn request_advance(&mut self) {
        if !self.ctx.update_requested {
            debug!("Advance requested at index {}", self.ctx.cursor.index);
        }
        self.ctx.update_requested = true;
    }

    /// Advance now, regardless of stability.  Only honoured in manual mode.
    pub fn force_advance(&mut self) -> EvaluationOutcome {
        self.ctx.outcome = EvaluationOutcome::default();
        if self.ctx.auto_advance {
            info!("Force advance ignored: auto mode is on");
            return self.ctx.outcome;
        }
        info!("Forcing advance from index {}", self.ctx.cursor.index);
        if self.ctx.advance() {
            let from = self.fsm.current_state();
            self.fsm.force_transition(StateId::Unstable, &mut self.ctx);
            if from != StateId::Unstable {
                self.ctx.outcome.transition = Some((from, StateId::Unstable));
            }
        }
        self.ctx.outcome
    }

    /// Restore the cursor to `index`, restarting stability detection.
    pub fn resume_at(&mut self, index: usize) -> Result<(), ScheduleError> {
        self.ctx.seek(index)?;
        self.fsm.force_transition(StateId::Unstable, &mut self.ctx);
        info!(
            "Resumed at setpoint {} of {}: {:.2} K",
            index + 1,
            self.ctx.schedule.len(),
            self.ctx.cursor.current_target
        );
        Ok(())
    }

    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn cursor(&self) -> ScheduleCursor {
        self.ctx.cursor
    }

    pub fn timer(&self) -> StabilityTimer {
        self.ctx.timer
    }

    pub fn schedule(&self) -> &Schedule {
        &self.ctx.schedule
    }

    pub fn current_target(&self) -> f64 {
        self.ctx.cursor.current_target
    }

    pub fn is_stable(&self) -> bool {
        self.ctx.timer.is_stable
    }

    pub fn stable_duration(&self) -> f64 {
        self.ctx.timer.stable_duration
    }

    pub fn auto_advance(&self) -> bool {
        self.ctx.auto_advance
    }

    pub fn update_requested(&self) -> bool {
        self.ctx.update_requested
    }

    /// Setpoint the next advance would select; `None` at a held terminal entry.
    pub fn next_target(&self) -> Option<f64> {
        self.ctx
            .schedule
            .next_index(self.ctx.cursor.index, self.ctx.end_policy)
            .and_then(|i| self.ctx.schedule.get(i))
            .map(|e| e.setpoint)
    }
}
