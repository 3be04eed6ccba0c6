//! Unified error types for the regulator.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  Bridge errors are `Copy` so a
//! failed tick can hand them to telemetry without allocating.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the crate funnels into this type.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The hardware bridge could not read or command the plant.
    Io(IoError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
    /// The setpoint schedule cannot drive a controller.
    InvalidSchedule(ScheduleError),
    /// Persistent storage failed.
    Storage(StorageError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "bridge: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::InvalidSchedule(e) => write!(f, "schedule: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bridge I/O errors
// ---------------------------------------------------------------------------

/// What went wrong talking to the plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    /// The underlying channel (serial port, socket, simulator) is gone.
    Unavailable,
    /// The read did not complete within the bridge's bounded timeout.
    Timeout,
    /// The instrument refused or failed to apply a command.
    WriteRejected,
    /// The instrument answered with something that is not a temperature.
    BadReading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoError {
    pub kind: IoErrorKind,
    pub detail: &'static str,
}

impl IoError {
    pub const fn new(kind: IoErrorKind, detail: &'static str) -> Self {
        Self { kind, detail }
    }

    pub const fn unavailable(detail: &'static str) -> Self {
        Self::new(IoErrorKind::Unavailable, detail)
    }
}

impl fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "channel unavailable"),
            Self::Timeout => write!(f, "read timed out"),
            Self::WriteRejected => write!(f, "command rejected"),
            Self::BadReading => write!(f, "bad reading"),
        }
    }
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.kind, self.detail)
    }
}

impl std::error::Error for IoError {}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Configuration problems are always recoverable: the caller logs them and
/// substitutes defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No config file exists at the given location.
    NotFound,
    /// The file exists but could not be parsed.
    Parse(String),
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error while reading or writing the file.
    Io(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Parse(msg) => write!(f, "parse error: {msg}"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Schedule errors
// ---------------------------------------------------------------------------

/// Fatal at construction: a controller cannot run without a setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleError {
    /// The schedule has no entries.
    Empty,
    /// A cursor index does not address an entry.
    IndexOutOfRange { index: usize, len: usize },
    /// An entry's setpoint or dwell is negative or not finite.
    InvalidEntry { index: usize },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "schedule has no setpoints"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} entries")
            }
            Self::InvalidEntry { index } => {
                write!(f, "entry {index} needs a finite, non-negative setpoint and dwell")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

impl From<ScheduleError> for Error {
    fn from(e: ScheduleError) -> Self {
        Self::InvalidSchedule(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Generic I/O error.
    Io(String),
    /// The stored blob failed to decode.
    Corrupted,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Corrupted => write!(f, "stored record corrupted"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
