//! Shared application service layer for waterflow.
//!
//! File-level operations used by the CLI: loading run configurations and
//! network files, analysing a network, calibrating source heads, one-shot
//! head and demand adjustments, and pipe-sizing search. Every service that
//! changes a network writes a new file next to the input (or into the
//! configured output directory) and leaves the input untouched.

pub mod analysis;
pub mod config;
pub mod error;
pub mod network_service;
pub mod optimize;
pub mod tuning;

// Re-export key types for convenience
pub use analysis::{AnalysisReport, ConnectivityReport, MappingRow, analyze, connectivity};
pub use config::{RunConfig, load_config, save_config};
pub use error::{AppError, AppResult};
pub use network_service::{load_network, write_network, write_summary};
pub use optimize::{OptimizeReport, run_optimize};
pub use tuning::{
    CalibrationReport, DemandReport, HeadReport, assign_heads, run_calibration,
    scale_network_demands,
};
