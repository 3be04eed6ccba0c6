//! Closed-loop control laws.

pub mod pid;
