//! Setpoint schedule: ordered `(setpoint, dwell)` entries and the cursor
//! that walks them.
//!
//! ```text
//!   index:     0            1            2
//!          ┌──────────┬──────────┬──────────┐
//!          │ 300 K    │ 298 K    │ 295 K    │
//!          │ 10 s     │ 10 s     │ 10 s     │
//!          └──────────┴──────────┴──────────┘
//!               ▲
//!            cursor
//! ```
//!
//! Schedules arrive from a row-oriented text file with two labelled rows:
//!
//! ```text
//! setpoints,300,298,295
//! stable_times,10,10,10
//! ```
//!
//! File problems are never fatal.  A missing file or an unparseable row
//! falls back to the built-in default for that row.  A dwell list whose
//! length disagrees with the setpoints is replaced wholesale by a uniform
//! dwell.  An *empty* schedule, or one with a negative or non-finite value,
//! is a construction error.

use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EndOfSchedule;
use crate::error::ScheduleError;

/// Built-in setpoints (K), used when no usable schedule is supplied.
pub const DEFAULT_SETPOINTS: [f64; 3] = [300.0, 298.0, 295.0];
/// Built-in dwell times (s), paired with [`DEFAULT_SETPOINTS`].
pub const DEFAULT_DWELL_TIMES: [f64; 3] = [10.0, 10.0, 10.0];

/// One step of the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Target temperature (K).
    pub setpoint: f64,
    /// Continuous in-band time required before the step completes (s).
    pub dwell_time: f64,
}

impl ScheduleEntry {
    pub const fn new(setpoint: f64, dwell_time: f64) -> Self {
        Self {
            setpoint,
            dwell_time,
        }
    }

    fn is_valid(&self) -> bool {
        [self.setpoint, self.dwell_time]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0)
    }
}

/// A non-empty, ordered list of schedule entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScheduleEntry>", into = "Vec<ScheduleEntry>")]
pub struct Schedule {
    entries: Vec<ScheduleEntry>,
}

impl Schedule {
    /// Build a schedule.  Fails when `entries` is empty or any setpoint or
    /// dwell is negative or not finite.
    pub fn new(entries: Vec<ScheduleEntry>) -> Result<Self, ScheduleError> {
        if entries.is_empty() {
            return Err(ScheduleError::Empty);
        }
        if let Some(index) = entries.iter().position(|e| !e.is_valid()) {
            return Err(ScheduleError::InvalidEntry { index });
        }
        Ok(Self { entries })
    }

    /// Pair up parallel setpoint and dwell lists.
    ///
    /// When the lengths disagree the dwell list is discarded and every
    /// setpoint gets the first supplied dwell value, or `default_dwell`
    /// when none was supplied.
    pub fn from_lists(
        setpoints: &[f64],
        dwell_times: &[f64],
        default_dwell: f64,
    ) -> Result<Self, ScheduleError> {
        let entries = if dwell_times.len() == setpoints.len() {
            setpoints
                .iter()
                .zip(dwell_times)
                .map(|(&sp, &dw)| ScheduleEntry::new(sp, dw))
                .collect()
        } else {
            let uniform = dwell_times.first().copied().unwrap_or(default_dwell);
            warn!(
                "Mismatch between {} setpoints and {} dwell times; using {}s for all",
                setpoints.len(),
                dwell_times.len(),
                uniform
            );
            setpoints
                .iter()
                .map(|&sp| ScheduleEntry::new(sp, uniform))
                .collect()
        };
        Self::new(entries)
    }

    /// `[(300 K, 10 s), (298 K, 10 s), (295 K, 10 s)]`.
    pub fn builtin() -> Self {
        Self {
            entries: DEFAULT_SETPOINTS
                .iter()
                .zip(DEFAULT_DWELL_TIMES.iter())
                .map(|(&sp, &dw)| ScheduleEntry::new(sp, dw))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn last_index(&self) -> usize {
        self.entries.len() - 1
    }

    /// The index `advance()` would move to from `index`, or `None` when
    /// `index` is terminal under `policy`.
    pub fn next_index(&self, index: usize, policy: EndOfSchedule) -> Option<usize> {
        if index < self.last_index() {
            Some(index + 1)
        } else {
            match policy {
                EndOfSchedule::Hold => None,
                EndOfSchedule::Wrap => Some(0),
            }
        }
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<ScheduleEntry>> for Schedule {
    type Error = ScheduleError;

    fn try_from(entries: Vec<ScheduleEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<Schedule> for Vec<ScheduleEntry> {
    fn from(schedule: Schedule) -> Self {
        schedule.entries
    }
}

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

/// Position in the schedule plus the values derived from that entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleCursor {
    pub index: usize,
    pub current_target: f64,
    pub current_dwell_time: f64,
}

impl ScheduleCursor {
    /// Point at `index`, failing if it does not address an entry.
    pub fn at(schedule: &Schedule, index: usize) -> Result<Self, ScheduleError> {
        let entry = schedule
            .get(index)
            .ok_or(ScheduleError::IndexOutOfRange {
                index,
                len: schedule.len(),
            })?;
        Ok(Self {
            index,
            current_target: entry.setpoint,
            current_dwell_time: entry.dwell_time,
        })
    }
}

// ---------------------------------------------------------------------------
// File input
// ---------------------------------------------------------------------------

const SETPOINTS_LABEL: &str = "setpoints";
const DWELL_LABELS: [&str; 2] = ["stable_times", "dwell_times"];

/// Parse one labelled row's values.  Empty cells are skipped; any cell that
/// is not a finite, non-negative number rejects the whole row.
fn parse_row(cells: &[&str]) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(cells.len());
    for cell in cells.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        match cell.parse::<f64>() {
            Ok(v) if v.is_finite() && v >= 0.0 => values.push(v),
            _ => return None,
        }
    }
    if values.is_empty() { None } else { Some(values) }
}

/// Parse schedule text.  Never fails: bad rows fall back to the defaults.
pub fn parse_schedule(text: &str, default_dwell: f64) -> Schedule {
    let mut setpoints = DEFAULT_SETPOINTS.to_vec();
    let mut dwell_times = DEFAULT_DWELL_TIMES.to_vec();

    for line in text.lines() {
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() < 2 {
            continue;
        }
        let label = cells[0].trim().to_ascii_lowercase();
        if label == SETPOINTS_LABEL {
            match parse_row(&cells[1..]) {
                Some(values) => setpoints = values,
                None => warn!(
                    "Could not parse setpoint schedule {:?}; using default values",
                    &cells[1..]
                ),
            }
        } else if DWELL_LABELS.contains(&label.as_str()) {
            match parse_row(&cells[1..]) {
                Some(values) => dwell_times = values,
                None => warn!(
                    "Could not parse dwell times {:?}; using default values",
                    &cells[1..]
                ),
            }
        }
    }

    // Both lists are non-empty by construction, so this cannot fail.
    Schedule::from_lists(&setpoints, &dwell_times, default_dwell).unwrap_or_default()
}

/// Read and parse a schedule file, falling back to the built-in schedule
/// when the file cannot be read.
pub fn load_schedule_file(path: &Path, default_dwell: f64) -> Schedule {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let schedule = parse_schedule(&text, default_dwell);
            info!(
                "Loaded {} setpoints from {}",
                schedule.len(),
                path.display()
            );
            schedule
        }
        Err(e) => {
            warn!(
                "Schedule file {} unreadable ({}); using default schedule",
                path.display(),
                e
            );
            Schedule::builtin()
        }
    }
}
