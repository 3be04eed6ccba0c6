//! JSON configuration file adapter.
//!
//! Implements [`ConfigPort`] over a single JSON document.  Every field of
//! [`ControllerConfig`] is optional in the file; omitted fields take
//! their defaults.  The same document may carry a `"schedule"` list:
//!
//! ```json
//! {
//!   "kp": -130.0,
//!   "noise_std_dev": 0.05,
//!   "end_of_schedule": "wrap",
//!   "schedule": [
//!     { "setpoint": 300.0, "dwell_time": 10.0 },
//!     { "setpoint": 295.0, "dwell_time": 20.0 }
//!   ]
//! }
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;

use crate::app::ports::ConfigPort;
use crate::config::{ControllerConfig, validate};
use crate::error::{ConfigError, ScheduleError};
use crate::schedule::{Schedule, ScheduleEntry};

#[derive(Deserialize)]
struct ScheduleSection {
    #[serde(default)]
    schedule: Option<Vec<ScheduleEntry>>,
}

pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File contents, or `None` if the file does not exist.
    fn read_text(&self) -> Result<Option<String>, ConfigError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }
}

impl ConfigPort for JsonConfigFile {
    fn load(&self) -> Result<ControllerConfig, ConfigError> {
        let Some(text) = self.read_text()? else {
            info!(
                "No config file at {}, using defaults",
                self.path.display()
            );
            return Ok(ControllerConfig::default());
        };
        let cfg: ControllerConfig =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        validate(&cfg)?;
        info!("Loaded config from {}", self.path.display());
        Ok(cfg)
    }

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError> {
        validate(config)?;
        let text = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(&self.path, text).map_err(|e| ConfigError::Io(e.to_string()))?;
        info!("Config saved to {}", self.path.display());
        Ok(())
    }

    fn load_schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        let Some(text) = self.read_text()? else {
            return Ok(None);
        };
        let section: ScheduleSection =
            serde_json::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let Some(entries) = section.schedule else {
            return Ok(None);
        };
        match Schedule::new(entries) {
            Ok(schedule) => Ok(Some(schedule)),
            Err(ScheduleError::Empty) => {
                Err(ConfigError::ValidationFailed("schedule has no entries"))
            }
            Err(e) => {
                warn!("Embedded schedule rejected: {e}");
                Err(ConfigError::ValidationFailed(
                    "schedule setpoints and dwell times must be finite and non-negative",
                ))
            }
        }
    }
}
