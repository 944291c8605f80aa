//! Services that change a network and write it back: calibration, target
//! heads and demand scaling.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;
use wf_calibrate::{
    CalibrationState, HeadAssignment, assign_target_heads, calibrate, scale_demands,
};
use wf_core::Real;
use wf_network::infer_source_junction_map;

use crate::analysis::{MappingRow, mapping_rows};
use crate::config::RunConfig;
use crate::error::AppResult;
use crate::network_service;

/// Result of [`run_calibration`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub feasible: bool,
    pub summary: String,
    pub state: CalibrationState,
    pub mapping: Vec<MappingRow>,
    pub output: PathBuf,
    pub changed_fields: usize,
}

/// Run the feedback calibrator and write `<stem>_calibrated` plus a JSON
/// summary. An infeasible run still writes the last network state.
pub fn run_calibration(config: &RunConfig) -> AppResult<CalibrationReport> {
    config.validate()?;
    let parsed = network_service::load_network(&config.network)?;
    let map = infer_source_junction_map(&parsed.network, &config.classifier);
    let evaluator = config.evaluator();

    let mut network = parsed.network.clone();
    let state = calibrate(&mut network, &evaluator, &map, &config.calibration)?;

    let output = config.output_path("_calibrated");
    let outcome = network_service::write_network(&parsed, &network, &output)?;
    let report = CalibrationReport {
        feasible: state.is_feasible(),
        summary: state.summary(),
        mapping: mapping_rows(&parsed.network, &map),
        state,
        output,
        changed_fields: outcome.changes.len(),
    };
    network_service::write_summary(
        &config.summary_path("calibrate"),
        "calibrate",
        &config.network,
        &report,
    )?;
    info!(feasible = report.feasible, "calibration service finished");
    Ok(report)
}

/// Result of [`assign_heads`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadReport {
    pub target_pressure_m: Real,
    pub assignment: HeadAssignment,
    pub output: PathBuf,
}

/// Set every mapped source head to junction elevation plus `target_pressure_m`
/// and write `<stem>_adjusted_target<N>m`.
pub fn assign_heads(config: &RunConfig, target_pressure_m: Real) -> AppResult<HeadReport> {
    let parsed = network_service::load_network(&config.network)?;
    let map = infer_source_junction_map(&parsed.network, &config.classifier);
    let mut network = parsed.network.clone();
    let assignment = assign_target_heads(&mut network, &map, target_pressure_m)?;

    let output = config.output_path(&format!("_adjusted_target{target_pressure_m}m"));
    network_service::write_network(&parsed, &network, &output)?;
    Ok(HeadReport {
        target_pressure_m,
        assignment,
        output,
    })
}

/// Result of [`scale_network_demands`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandReport {
    pub factor: Real,
    pub scaled: usize,
    pub output: PathBuf,
}

/// Multiply every positive junction demand by `factor` and write
/// `<stem>_demand_scaled`.
pub fn scale_network_demands(config: &RunConfig, factor: Real) -> AppResult<DemandReport> {
    let parsed = network_service::load_network(&config.network)?;
    let mut network = parsed.network.clone();
    let scaled = scale_demands(&mut network, factor)?;
    let output = config.output_path("_demand_scaled");
    network_service::write_network(&parsed, &network, &output)?;
    Ok(DemandReport {
        factor,
        scaled,
        output,
    })
}
