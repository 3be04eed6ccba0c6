//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log, append to CSV,
//! keep a history ring, forward to a UI.

use crate::error::IoError;
use crate::fsm::StateId;

/// Structured events emitted by the control core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Per-tick published state.
    Telemetry(ControlSnapshot),

    /// The stability FSM transitioned between states.
    StateChanged { from: StateId, to: StateId },

    /// Dwell satisfied at `setpoint` (once per stabilization episode).
    Stabilized { index: usize, setpoint: f64 },

    /// The schedule cursor moved.
    SetpointChanged {
        from_index: usize,
        to_index: usize,
        setpoint: f64,
        dwell_time: f64,
    },

    /// An advance was attempted at the terminal entry.
    ScheduleComplete { index: usize },

    /// The bridge failed this tick; the last known temperature was published.
    BridgeFault(IoError),

    /// The service has started.
    Started {
        index: usize,
        setpoint: f64,
        auto_advance: bool,
    },

    /// The worker has shut down.
    Stopped,
}

/// Immutable state snapshot for UI / telemetry consumers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSnapshot {
    /// Monotonic timestamp of the tick (s).
    pub timestamp: f64,
    pub temperature: f64,
    pub target_setpoint: f64,
    pub is_stable: bool,
    pub stable_duration: f64,
    pub schedule_index: usize,
    pub state: StateId,
    pub auto_advance: bool,
}
