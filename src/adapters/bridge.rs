//! Bridge selection: one tagged variant chosen at construction.

use crate::app::ports::HardwareBridge;
use crate::error::IoError;

use super::simulated::SimulatedBridge;

pub enum Bridge {
    Simulated(SimulatedBridge),
    /// A real-instrument adapter supplied by the composition root.
    External(Box<dyn HardwareBridge + Send>),
}

impl Bridge {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Simulated(_) => "simulated",
            Self::External(_) => "external",
        }
    }
}

impl From<SimulatedBridge> for Bridge {
    fn from(bridge: SimulatedBridge) -> Self {
        Self::Simulated(bridge)
    }
}

impl HardwareBridge for Bridge {
    fn read_temperature(&mut self) -> Result<f64, IoError> {
        match self {
            Self::Simulated(b) => b.read_temperature(),
            Self::External(b) => b.read_temperature(),
        }
    }

    fn advance(&mut self, target: f64, dt: f64) -> Result<f64, IoError> {
        match self {
            Self::Simulated(b) => b.advance(target, dt),
            Self::External(b) => b.advance(target, dt),
        }
    }

    fn reset_control_state(&mut self) {
        match self {
            Self::Simulated(b) => b.reset_control_state(),
            Self::External(b) => b.reset_control_state(),
        }
    }

    fn shutdown(&mut self) -> Result<(), IoError> {
        match self {
            Self::Simulated(b) => b.shutdown(),
            Self::External(b) => b.shutdown(),
        }
    }
}
