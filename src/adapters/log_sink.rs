//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events
//! through the `log` facade (rendered by whatever logger the binary
//! installs).  The CSV and history adapters implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
///
/// Telemetry is rate-limited to one line every `telemetry_every` ticks;
/// every other event is always logged.
pub struct LogEventSink {
    telemetry_every: u64,
    seen: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::every(1)
    }

    pub fn every(telemetry_every: u64) -> Self {
        Self {
            telemetry_every: telemetry_every.max(1),
            seen: 0,
        }
    }
}

impl Default for LogEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                self.seen += 1;
                if (self.seen - 1) % self.telemetry_every != 0 {
                    return;
                }
                info!(
                    "TELEM | t={:.1}s | T={:.3}K | target={:.2}K | stable={} | held={:.1}s | \
                     idx={} | state={:?} | auto={}",
                    t.timestamp,
                    t.temperature,
                    t.target_setpoint,
                    if t.is_stable { "yes" } else { "no" },
                    t.stable_duration,
                    t.schedule_index,
                    t.state,
                    t.auto_advance,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            AppEvent::Stabilized { index, setpoint } => {
                info!("STABLE | idx={} | setpoint={:.2}K", index, setpoint);
            }
            AppEvent::SetpointChanged {
                from_index,
                to_index,
                setpoint,
                dwell_time,
            } => {
                info!(
                    "SETPOINT | idx {} -> {} | target={:.2}K | dwell={:.1}s",
                    from_index, to_index, setpoint, dwell_time
                );
            }
            AppEvent::ScheduleComplete { index } => {
                info!("SCHEDULE | complete at idx={}", index);
            }
            AppEvent::BridgeFault(e) => {
                warn!("FAULT | bridge: {}", e);
            }
            AppEvent::Started {
                index,
                setpoint,
                auto_advance,
            } => {
                info!(
                    "START | idx={} | target={:.2}K | auto={}",
                    index, setpoint, auto_advance
                );
            }
            AppEvent::Stopped => {
                info!("STOP | control loop exited");
            }
        }
    }
}
