//! Error types for the population search.

use thiserror::Error;
use wf_calibrate::CalibrationError;
use wf_network::NetworkError;
use wf_solver::SolverError;

/// Result type for search operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that stop a search before it produces an outcome.
///
/// A failed fitness evaluation is not among them: the engine scores it as
/// worst-case and carries on.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Invalid configuration value.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A sized link does not exist or is not a pipe.
    #[error("Unknown pipe: {name}")]
    UnknownPipe { name: String },

    /// The candidate vector does not match the search space.
    #[error("Expected {expected} genes, got {got}")]
    GeneCount { expected: usize, got: usize },

    /// Cancelled before any generation was evaluated.
    #[error("Search cancelled before the first generation")]
    Cancelled,

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("Calibration error: {0}")]
    Calibration(#[from] CalibrationError),
}
