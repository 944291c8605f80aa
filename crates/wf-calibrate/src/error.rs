//! Error types for calibration.

use thiserror::Error;
use wf_network::NetworkError;
use wf_solver::SolverError;

/// Result type for calibration operations.
pub type CalibrationResult<T> = Result<T, CalibrationError>;

/// Errors that stop a calibration run.
///
/// Solver divergence is not among them: the calibrator records it and keeps
/// adjusting.
#[derive(Debug, Error)]
pub enum CalibrationError {
    /// Invalid configuration value.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}
