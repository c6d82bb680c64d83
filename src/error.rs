//! Error module for the Rusty HFO library.
use std::error::Error;
use std::fmt;

/// Error types for the library.
#[derive(Debug, PartialEq, Clone)]
pub enum HfoError {
    /// Error for invalid parameters, e.g., a sample ratio outside (0, 1) or a step larger than the window.
    InvalidParameter(String),
    /// Error for malformed signals, e.g., empty, mismatched or non-increasing sample times.
    InvalidSignal(String),
    /// Error for degenerate arithmetic, e.g., a window size that yields no window at all.
    DivisionByZero(String),
    /// Error for unknown encoder algorithms or measurement modes.
    UnsupportedConfiguration(String),
    /// Error reported by the external spiking network simulator.
    SimulationError(String),
    /// Error for I/O operations.
    IOError(String),
}

impl fmt::Display for HfoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HfoError::InvalidParameter(e) => write!(f, "Invalid parameters: {}", e),
            HfoError::InvalidSignal(e) => write!(f, "Invalid signal: {}", e),
            HfoError::DivisionByZero(e) => write!(f, "Division by zero: {}", e),
            HfoError::UnsupportedConfiguration(e) => {
                write!(f, "Unsupported configuration: {}", e)
            }
            HfoError::SimulationError(e) => write!(f, "Simulation error: {}", e),
            HfoError::IOError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl Error for HfoError {}
