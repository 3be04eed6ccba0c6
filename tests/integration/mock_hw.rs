//! Mock plant and sinks for integration tests.
//!
//! [`ScriptedBridge`] replays a list of temperatures (or faults) and
//! records every call, so tests can assert on the exact sequence of
//! control-state resets without running the physics.

use std::collections::VecDeque;

use cryoloop::app::events::AppEvent;
use cryoloop::app::ports::{EventSink, HardwareBridge};
use cryoloop::error::IoError;

// ── Bridge call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BridgeCall {
    Read,
    Advance { target: f64, dt: f64 },
    ResetControlState,
    Shutdown,
}

// ── ScriptedBridge ────────────────────────────────────────────

/// Returns scripted readings in order; once the script runs out the last
/// successful reading repeats.
pub struct ScriptedBridge {
    script: VecDeque<Result<f64, IoError>>,
    last: f64,
    pub calls: Vec<BridgeCall>,
}

#[allow(dead_code)]
impl ScriptedBridge {
    pub fn new(initial: f64) -> Self {
        Self {
            script: VecDeque::new(),
            last: initial,
            calls: Vec::new(),
        }
    }

    /// Hold one temperature forever.
    pub fn constant(temperature: f64) -> Self {
        Self::new(temperature)
    }

    pub fn then(mut self, temperature: f64, ticks: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Ok(temperature), ticks));
        self
    }

    pub fn then_fail(mut self, err: IoError, ticks: usize) -> Self {
        self.script.extend(std::iter::repeat_n(Err(err), ticks));
        self
    }

    pub fn resets(&self) -> usize {
        self.count(|c| matches!(c, BridgeCall::ResetControlState))
    }

    pub fn shutdowns(&self) -> usize {
        self.count(|c| matches!(c, BridgeCall::Shutdown))
    }

    /// Targets passed to `advance`, in order.
    pub fn targets(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BridgeCall::Advance { target, .. } => Some(*target),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&BridgeCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }
}

impl HardwareBridge for ScriptedBridge {
    fn read_temperature(&mut self) -> Result<f64, IoError> {
        self.calls.push(BridgeCall::Read);
        Ok(self.last)
    }

    fn advance(&mut self, target: f64, dt: f64) -> Result<f64, IoError> {
        self.calls.push(BridgeCall::Advance { target, dt });
        let next = self.script.pop_front().unwrap_or(Ok(self.last));
        if let Ok(t) = next {
            self.last = t;
        }
        next
    }

    fn reset_control_state(&mut self) {
        self.calls.push(BridgeCall::ResetControlState);
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        self.calls.push(BridgeCall::Shutdown);
        Ok(())
    }
}

// ── CollectingSink ────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn setpoint_changes(&self) -> Vec<(usize, usize, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::SetpointChanged {
                    from_index,
                    to_index,
                    setpoint,
                    ..
                } => Some((*from_index, *to_index, *setpoint)),
                _ => None,
            })
            .collect()
    }

    pub fn stabilized(&self) -> Vec<(usize, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::Stabilized { index, setpoint } => Some((*index, *setpoint)),
                _ => None,
            })
            .collect()
    }

    pub fn faults(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::BridgeFault(_)))
            .count()
    }

    pub fn telemetry_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, AppEvent::Telemetry(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
