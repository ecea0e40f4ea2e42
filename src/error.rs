//! Errors surfaced at the simulation API boundary

use thiserror::Error;

/// Caller contract violations rejected by the engine and the session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("cell ({row}, {col}) is outside the {rows}x{cols} grid")]
    OutOfRange {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("live probability {0} is not within [0, 1]")]
    InvalidProbability(f64),

    #[error("grid dimensions {actual:?} do not match the session dimensions {expected:?}")]
    DimensionMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("simulation session has shut down")]
    SessionClosed,
}

/// Rejects probabilities outside `[0, 1]`, NaN included
pub fn check_probability(live_probability: f64) -> Result<f64, SimulationError> {
    if (0.0..=1.0).contains(&live_probability) {
        Ok(live_probability)
    } else {
        Err(SimulationError::InvalidProbability(live_probability))
    }
}
