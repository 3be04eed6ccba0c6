//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (plant bridges, event sinks, config files, storage,
//! clocks) implement these traits.  The
//! [`ControlService`](super::service::ControlService) consumes them via
//! generics at the call site, so the domain core never owns a concrete
//! instrument.
//!
//! ## Contract notes
//!
//! - **HardwareBridge** implementations MUST bound their own read timeouts;
//!   the loop has no way to interrupt a blocked `advance`.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use crate::config::ControllerConfig;
use crate::error::{ConfigError, IoError, StorageError};
use crate::schedule::Schedule;

// ───────────────────────────────────────────────────────────────
// Hardware bridge (driven adapter: domain ↔ plant)
// ───────────────────────────────────────────────────────────────

/// The plant as seen by the control loop: simulated or real.
///
/// The core makes no assumption about what happens inside `advance`.
/// The simulated bridge runs noise, filter, PID and physics there; a
/// real instrument would read, then command its own firmware loop.
pub trait HardwareBridge {
    /// Current best temperature estimate (K).
    fn read_temperature(&mut self) -> Result<f64, IoError>;

    /// Perform one control step of `dt` seconds toward `target` and return
    /// the resulting temperature (K).
    fn advance(&mut self, target: f64, dt: f64) -> Result<f64, IoError>;

    /// Forget accumulated control state (PID integral).  Called on every
    /// setpoint transition, in the same tick as the cursor move.
    fn reset_control_state(&mut self) {}

    /// Put the plant in a safe state before the loop exits.
    fn shutdown(&mut self) -> Result<(), IoError> {
        Ok(())
    }
}

impl<B: HardwareBridge + ?Sized> HardwareBridge for Box<B> {
    fn read_temperature(&mut self) -> Result<f64, IoError> {
        (**self).read_temperature()
    }

    fn advance(&mut self, target: f64, dt: f64) -> Result<f64, IoError> {
        (**self).advance(target, dt)
    }

    fn reset_control_state(&mut self) {
        (**self).reset_control_state();
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        (**self).shutdown()
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (log lines, CSV,
/// an in-memory history ring, a UI channel).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

/// Fan-out to two sinks.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink> EventSink for Option<S> {
    fn emit(&mut self, event: &super::events::AppEvent) {
        if let Some(sink) = self {
            sink.emit(event);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists controller configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ControllerConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;

    /// Schedule embedded in the configuration source, if any.
    fn load_schedule(&self) -> Result<Option<Schedule>, ConfigError> {
        Ok(None)
    }
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ disk)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the small amount of state the
/// controller keeps across restarts.
///
/// Keys are namespaced to prevent collisions between subsystems.
/// Write operations MUST be atomic: no partial records on crash.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`, or
    /// [`StorageError::Corrupted`] if the stored value does not fit.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

impl<S: StoragePort + ?Sized> StoragePort for Box<S> {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        (**self).read(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        (**self).write(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        (**self).delete(namespace, key)
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        (**self).exists(namespace, key)
    }
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source for stability timing.
pub trait ClockPort {
    /// Seconds since an arbitrary fixed origin.
    fn now_secs(&self) -> f64;

    /// Notification that one control period of `dt` seconds has elapsed.
    /// Wall clocks ignore it; simulated clocks advance on it.
    fn on_tick(&mut self, _dt: f64) {}
}
