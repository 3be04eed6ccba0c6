//! Control service — the hexagonal core.
//!
//! [`ControlService`] owns the stability scheduler and runs one control
//! tick at a time.  All I/O flows through port traits injected at call
//! sites, making the whole loop testable with mock adapters.
//!
//! ```text
//!                  ┌──────────────────────────┐
//! HardwareBridge ◀─│     ControlService       │──▶ EventSink
//!                  │  tick · commands · resume │
//!                  └──────────────────────────┘
//!                               │
//!                               ▼
//!                         StoragePort
//! ```
//!
//! One tick:
//! 1. `bridge.advance(current_target, dt)`
//! 2. `scheduler.evaluate(temperature, now)` (skipped when the bridge failed)
//! 3. on advance, `bridge.reset_control_state()` in the same tick
//! 4. emit events and the telemetry snapshot

use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::error::{Error, IoError};
use crate::fsm::context::EvaluationOutcome;
use crate::fsm::{StabilityScheduler, StateId};
use crate::schedule::Schedule;

use super::commands::AppCommand;
use super::events::{AppEvent, ControlSnapshot};
use super::ports::{EventSink, HardwareBridge, StoragePort};
use super::resume::ResumeState;

/// Result of one [`ControlService::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub snapshot: ControlSnapshot,
    pub outcome: EvaluationOutcome,
    /// Set when the bridge failed and the scheduler was not evaluated.
    pub fault: Option<IoError>,
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService {
    scheduler: StabilityScheduler,
    /// Seconds per control tick (derived from config).
    dt: f64,
    last_temperature: f64,
    last_timestamp: f64,
    tick_count: u64,
    fault_count: u64,
    resume_dirty: bool,
}

impl ControlService {
    /// Construct the service.  Fails only on an unusable schedule.
    pub fn new(config: &ControllerConfig, schedule: Schedule) -> Result<Self, Error> {
        let scheduler = StabilityScheduler::new(schedule, config)?;
        Ok(Self {
            scheduler,
            dt: config.tick_secs(),
            last_temperature: config.initial_temperature_k,
            last_timestamp: 0.0,
            tick_count: 0,
            fault_count: 0,
            resume_dirty: false,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Take an initial reading and announce the start.
    pub fn start(&mut self, bridge: &mut (impl HardwareBridge + ?Sized), sink: &mut impl EventSink) {
        match bridge.read_temperature() {
            Ok(t) => self.last_temperature = t,
            Err(e) => {
                warn!(
                    "Initial temperature read failed: {e}; assuming {:.2} K",
                    self.last_temperature
                );
                sink.emit(&AppEvent::BridgeFault(e));
            }
        }
        let cursor = self.scheduler.cursor();
        info!(
            "Control service started at {:.3} K: setpoint {:.2} K (index {}), dwell {:.1}s",
            self.last_temperature, cursor.current_target, cursor.index, cursor.current_dwell_time
        );
        sink.emit(&AppEvent::Started {
            index: cursor.index,
            setpoint: cursor.current_target,
            auto_advance: self.scheduler.auto_advance(),
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one full control cycle at monotonic time `now` (s).
    ///
    /// A bridge failure never aborts the loop: the last known temperature
    /// is published with a [`AppEvent::BridgeFault`] and the scheduler is
    /// left untouched for this tick.
    pub fn tick(
        &mut self,
        bridge: &mut (impl HardwareBridge + ?Sized),
        sink: &mut impl EventSink,
        now: f64,
    ) -> TickReport {
        self.tick_count += 1;
        self.last_timestamp = now;
        let target = self.scheduler.current_target();

        let (outcome, fault) = match bridge.advance(target, self.dt) {
            Ok(temperature) => {
                self.last_temperature = temperature;
                let outcome = self.scheduler.evaluate(temperature, now);
                self.apply_outcome(&outcome, bridge, sink);
                (outcome, None)
            }
            Err(e) => {
                self.fault_count += 1;
                warn!(
                    "Bridge fault on tick {}: {e}; holding last temperature {:.3} K",
                    self.tick_count, self.last_temperature
                );
                sink.emit(&AppEvent::BridgeFault(e));
                (EvaluationOutcome::default(), Some(e))
            }
        };

        let snapshot = self.snapshot();
        sink.emit(&AppEvent::Telemetry(snapshot));
        TickReport {
            snapshot,
            outcome,
            fault,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator command.  Call between ticks.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        bridge: &mut (impl HardwareBridge + ?Sized),
        sink: &mut impl EventSink,
    ) {
        debug!("Command: {cmd:?}");
        match cmd {
            AppCommand::SetAutoMode(enabled) => {
                if self.scheduler.auto_advance() != enabled {
                    self.resume_dirty = true;
                }
                self.scheduler.set_auto_advance(enabled);
            }
            AppCommand::RequestAdvance => self.scheduler.request_advance(),
            AppCommand::ForceAdvance => {
                let outcome = self.scheduler.force_advance();
                self.apply_outcome(&outcome, bridge, sink);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Published state as of the last tick.
    pub fn snapshot(&self) -> ControlSnapshot {
        let cursor = self.scheduler.cursor();
        ControlSnapshot {
            timestamp: self.last_timestamp,
            temperature: self.last_temperature,
            target_setpoint: cursor.current_target,
            is_stable: self.scheduler.is_stable(),
            stable_duration: self.scheduler.stable_duration(),
            schedule_index: cursor.index,
            state: self.scheduler.state(),
            auto_advance: self.scheduler.auto_advance(),
        }
    }

    pub fn scheduler(&self) -> &StabilityScheduler {
        &self.scheduler
    }

    pub fn state(&self) -> StateId {
        self.scheduler.state()
    }

    pub fn current_target(&self) -> f64 {
        self.scheduler.current_target()
    }

    /// Setpoint the next advance would select.
    pub fn next_target(&self) -> Option<f64> {
        self.scheduler.next_target()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Ticks on which the bridge failed.
    pub fn fault_count(&self) -> u64 {
        self.fault_count
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    // ── Resumption ────────────────────────────────────────────

    pub fn resume_state(&self) -> ResumeState {
        ResumeState {
            schedule_index: self.scheduler.cursor().index as u32,
            auto_advance: self.scheduler.auto_advance(),
        }
    }

    /// Restore the schedule cursor from storage.  Missing, corrupted or
    /// out-of-range records are ignored.  Returns `true` if restored.
    ///
    /// The advance mode is not restored: the configured mode (config file
    /// and `--manual`) always wins over the recorded one.
    pub fn restore(&mut self, storage: &impl StoragePort) -> bool {
        let state = match ResumeState::load(storage) {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!("No resume record; starting at index 0");
                return false;
            }
            Err(e) => {
                warn!("Ignoring resume record: {e}");
                return false;
            }
        };
        if let Err(e) = self.scheduler.resume_at(state.schedule_index as usize) {
            warn!("Ignoring resume record: {e}");
            return false;
        }
        if state.auto_advance != self.scheduler.auto_advance() {
            info!(
                "Resume record was saved with auto={}; keeping configured auto={}",
                state.auto_advance,
                self.scheduler.auto_advance()
            );
        }
        true
    }

    /// Persist the resume record if the cursor or mode changed since the
    /// last save.  Returns `true` if a record was written.
    pub fn save_resume_if_dirty(&mut self, storage: &mut impl StoragePort) -> bool {
        if !self.resume_dirty {
            return false;
        }
        match self.resume_state().save(storage) {
            Ok(()) => {
                self.resume_dirty = false;
                debug!("Resume record saved");
                true
            }
            Err(e) => {
                warn!("Resume record save failed: {e}");
                false
            }
        }
    }

    pub fn is_resume_dirty(&self) -> bool {
        self.resume_dirty
    }

    // ── Internal ──────────────────────────────────────────────

    /// Translate scheduler outcome into bridge resets and events.
    fn apply_outcome(
        &mut self,
        outcome: &EvaluationOutcome,
        bridge: &mut (impl HardwareBridge + ?Sized),
        sink: &mut impl EventSink,
    ) {
        if outcome.stabilized {
            let index = outcome
                .advanced
                .map_or(self.scheduler.cursor().index, |(from, _)| from);
            let setpoint = self
                .scheduler
                .schedule()
                .get(index)
                .map_or(self.scheduler.current_target(), |e| e.setpoint);
            sink.emit(&AppEvent::Stabilized { index, setpoint });
        }

        if let Some((from_index, to_index)) = outcome.advanced {
            // Integral reset belongs to the same tick as the cursor move.
            bridge.reset_control_state();
            self.resume_dirty = true;
            let cursor = self.scheduler.cursor();
            sink.emit(&AppEvent::SetpointChanged {
                from_index,
                to_index,
                setpoint: cursor.current_target,
                dwell_time: cursor.current_dwell_time,
            });
        }

        if outcome.schedule_complete {
            sink.emit(&AppEvent::ScheduleComplete {
                index: self.scheduler.cursor().index,
            });
        }

        if let Some((from, to)) = outcome.transition {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }
}
