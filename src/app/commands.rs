//! Inbound commands to the control service.
//!
//! These represent operator actions (UI buttons, CLI, a remote panel)
//! that the [`ControlService`](super::service::ControlService) applies at
//! the next tick boundary.

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Enable or disable automatic advance on stability.
    SetAutoMode(bool),

    /// Advance at the next stable tick.  Idempotent; meaningful in manual mode.
    RequestAdvance,

    /// Advance immediately, ignoring stability.  Manual mode only.
    ForceAdvance,
}
