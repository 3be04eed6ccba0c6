//! Cryostat temperature regulator.
//!
//! A PID loop drives a cooling stage toward a setpoint taken from a
//! schedule; a three-state stability machine decides when the plant has
//! settled at a setpoint and when to move on to the next one.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimulatedBridge  LogEventSink  CsvHistoryLog  TelemetryHistory│
//! │  (HardwareBridge) (EventSink)   (EventSink)    (EventSink)     │
//! │  JsonConfigFile   FileStorage   SimulatedClock MonotonicClock  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControlService (pure logic)                 │    │
//! │  │  StabilityScheduler FSM · Schedule · ResumeState       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  ControlWorker (dedicated thread, command/snapshot channels)   │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod fsm;
pub mod plant;
pub mod runtime;
pub mod schedule;
pub mod sensors;
