//! Error types for the wf-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the library crates and
/// gives the CLI one error surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read {path}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("Calibration error: {0}")]
    Calibration(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to serialize summary: {0}")]
    Summary(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for wf-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<wf_network::NetworkError> for AppError {
    fn from(err: wf_network::NetworkError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<wf_solver::SolverError> for AppError {
    fn from(err: wf_solver::SolverError) -> Self {
        AppError::Solver(err.to_string())
    }
}

impl From<wf_calibrate::CalibrationError> for AppError {
    fn from(err: wf_calibrate::CalibrationError) -> Self {
        AppError::Calibration(err.to_string())
    }
}

impl From<wf_optimize::SearchError> for AppError {
    fn from(err: wf_optimize::SearchError) -> Self {
        AppError::Search(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Summary(err.to_string())
    }
}
