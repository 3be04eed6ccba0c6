//! Fixed-capacity telemetry history for plotting consumers.
//!
//! Keeps the most recent [`HISTORY_CAPACITY`] `(t, T, setpoint)` samples
//! in a `heapless::HistoryBuffer`; older samples are overwritten.

use heapless::HistoryBuffer;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Samples retained (10 minutes at 1 Hz).
pub const HISTORY_CAPACITY: usize = 600;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    pub timestamp: f64,
    pub temperature: f64,
    pub setpoint: f64,
}

pub struct TelemetryHistory {
    samples: HistoryBuffer<HistorySample, HISTORY_CAPACITY>,
}

impl TelemetryHistory {
    pub fn new() -> Self {
        Self {
            samples: HistoryBuffer::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.len() == 0
    }

    pub fn latest(&self) -> Option<&HistorySample> {
        self.samples.recent()
    }

    /// Samples from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.oldest_ordered()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

impl Default for TelemetryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TelemetryHistory {
    fn emit(&mut self, event: &AppEvent) {
        if let AppEvent::Telemetry(s) = event {
            self.samples.write(HistorySample {
                timestamp: s.timestamp,
                temperature: s.temperature,
                setpoint: s.target_setpoint,
            });
        }
    }
}
