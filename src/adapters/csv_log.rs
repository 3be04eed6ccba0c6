//! CSV export of `(timestamp, temperature, setpoint)` history.
//!
//! Appends to an existing file; the header is only written when the file
//! is new or empty.  At most one row is recorded per whole second of
//! loop time.  Write failures are logged and never reach the loop.
//!
//! The file is size-capped: every [`TRIM_CHECK_INTERVAL`] rows its size
//! is checked, and once it exceeds `max_bytes` the oldest quarter of the
//! rows is dropped (the header is kept).

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

pub const CSV_HEADER: &str = "timestamp,temperature,setpoint";

/// Default size cap (5 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 5 * 1024 * 1024;

/// Rows written between size checks.
pub const TRIM_CHECK_INTERVAL: u32 = 100;

pub struct CsvHistoryLog {
    path: PathBuf,
    writer: BufWriter<File>,
    last_second: Option<i64>,
    failed: bool,
    max_bytes: u64,
    rows_since_check: u32,
}

impl CsvHistoryLog {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if is_new {
            writeln!(writer, "{CSV_HEADER}")?;
            writer.flush()?;
        }
        info!("CSV history: appending to {}", path.display());
        Ok(Self {
            path,
            writer,
            last_second: None,
            failed: false,
            max_bytes: DEFAULT_MAX_BYTES,
            rows_since_check: 0,
        })
    }

    /// Override the size cap.
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the oldest 25% of rows if the file exceeds the cap.  Returns
    /// the number of rows dropped.
    fn trim_if_oversized(&mut self) -> std::io::Result<usize> {
        let size = fs::metadata(&self.path)?.len();
        if size <= self.max_bytes {
            return Ok(0);
        }
        let text = fs::read_to_string(&self.path)?;
        let rows: Vec<&str> = text
            .lines()
            .filter(|l| !l.is_empty() && *l != CSV_HEADER)
            .collect();
        let drop = rows.len() / 4;

        let mut trimmed = String::with_capacity(text.len());
        trimmed.push_str(CSV_HEADER);
        trimmed.push('\n');
        for row in &rows[drop..] {
            trimmed.push_str(row);
            trimmed.push('\n');
        }
        // The writer is in append mode, so it keeps writing at the new end.
        fs::write(&self.path, trimmed)?;
        info!(
            "CSV history {} exceeded {} bytes; dropped {drop} oldest rows",
            self.path.display(),
            self.max_bytes
        );
        Ok(drop)
    }

    fn append(&mut self, timestamp: f64, temperature: f64, setpoint: f64) -> std::io::Result<()> {
        writeln!(
            self.writer,
            "{timestamp:.3},{temperature:.4},{setpoint:.4}"
        )?;
        self.writer.flush()
    }
}

impl EventSink for CsvHistoryLog {
    fn emit(&mut self, event: &AppEvent) {
        let AppEvent::Telemetry(s) = event else {
            return;
        };
        let second = s.timestamp.floor() as i64;
        if self.last_second == Some(second) {
            return;
        }
        self.last_second = Some(second);

        match self.append(s.timestamp, s.temperature, s.target_setpoint) {
            Ok(()) => {
                self.failed = false;
                self.rows_since_check += 1;
                if self.rows_since_check >= TRIM_CHECK_INTERVAL {
                    self.rows_since_check = 0;
                    if let Err(e) = self.trim_if_oversized() {
                        warn!("CSV history trim of {} failed: {e}", self.path.display());
                    }
                }
            }
            Err(e) => {
                // One warning per failure streak.
                if !self.failed {
                    warn!("CSV history write to {} failed: {e}", self.path.display());
                }
                self.failed = true;
            }
        }
    }
}
