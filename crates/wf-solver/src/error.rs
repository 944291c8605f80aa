//! Error types for solver operations.

use thiserror::Error;
use wf_core::WfError;
use wf_network::NetworkError;

/// Errors that can occur while evaluating a network.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The hydraulic iteration did not produce a usable solution.
    #[error("Solver diverged: {what}")]
    Divergence { what: String },

    /// The evaluation did not finish within its time limit.
    #[error("Evaluation timed out after {limit_s:.3} s")]
    Timeout { limit_s: f64 },

    #[error("Problem setup error: {what}")]
    Setup { what: String },

    #[error("Numeric error: {what}")]
    Numeric { what: String },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
}

impl SolverError {
    /// Conditions callers treat as "no solution for this network state"
    /// rather than as a fault.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SolverError::Divergence { .. } | SolverError::Timeout { .. } | SolverError::Numeric { .. }
        )
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for WfError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::Divergence { what } => WfError::Invariant {
                what: format!("divergence: {what}"),
            },
            SolverError::Timeout { .. } => WfError::InvalidArg { what: "timeout" },
            SolverError::Setup { what } => WfError::Invariant { what },
            SolverError::Numeric { .. } => WfError::InvalidArg { what: "numeric" },
            SolverError::Network(_) => WfError::InvalidArg { what: "network" },
        }
    }
}
