//! Application core — pure domain logic, zero I/O.
//!
//! This module contains the control-loop orchestration for the
//! regulator: one tick of bridge step, stability evaluation and schedule
//! advance.  All interaction with the plant, disk and clock happens
//! through **port traits** defined in [`ports`], keeping this layer fully
//! testable without an instrument.

pub mod commands;
pub mod events;
pub mod ports;
pub mod resume;
pub mod service;
