//! Read-only inspection of a network: defects, mapping, connectivity and a
//! baseline solve.

use serde::{Deserialize, Serialize};
use tracing::warn;
use wf_core::Real;
use wf_network::{Network, SourceJunctionMap, disconnected_junctions, infer_source_junction_map};
use wf_solver::evaluate_at;

use crate::config::RunConfig;
use crate::error::AppResult;
use crate::network_service;

/// One source and the junction it feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRow {
    pub source: String,
    pub junction: String,
    pub link: Option<String>,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub nodes: usize,
    pub links: usize,
    pub junctions: usize,
    pub sources: usize,
    /// Skipped input lines, one message each.
    pub defects: Vec<String>,
    pub mapping: Vec<MappingRow>,
    /// Sources with no adjacent junction.
    pub gaps: Vec<String>,
    /// Junctions no source or tank can reach.
    pub disconnected: Vec<String>,
    /// `None` when the baseline solve failed or there are no junctions.
    pub min_pressure_m: Option<Real>,
    pub min_pressure_junction: Option<String>,
    pub negative_pressure_junctions: Vec<String>,
    pub solver_error: Option<String>,
}

pub(crate) fn mapping_rows(network: &Network, map: &SourceJunctionMap) -> Vec<MappingRow> {
    map.iter()
        .filter_map(|(s, j)| {
            let source = network.node(s)?.name.clone();
            let junction = network.node(j)?.name.clone();
            let link = map
                .link_for(s)
                .and_then(|l| network.link(l))
                .map(|l| l.name.clone());
            Some(MappingRow {
                source,
                junction,
                link,
            })
        })
        .collect()
}

fn names(network: &Network, ids: impl IntoIterator<Item = wf_core::NodeId>) -> Vec<String> {
    ids.into_iter()
        .filter_map(|id| network.node(id).map(|n| n.name.clone()))
        .collect()
}

/// Parse, map and solve the configured network without changing it.
///
/// A failed baseline solve is reported in the result rather than as an error.
pub fn analyze(config: &RunConfig) -> AppResult<AnalysisReport> {
    let parsed = network_service::load_network(&config.network)?;
    let network = &parsed.network;
    let map = infer_source_junction_map(network, &config.classifier);

    let mut report = AnalysisReport {
        nodes: network.nodes().len(),
        links: network.links().len(),
        junctions: network.junctions().count(),
        sources: network.sources().count(),
        defects: parsed.report.defects().iter().map(|d| d.to_string()).collect(),
        mapping: mapping_rows(network, &map),
        gaps: names(network, map.gaps().iter().copied()),
        disconnected: names(network, disconnected_junctions(network)),
        min_pressure_m: None,
        min_pressure_junction: None,
        negative_pressure_junctions: Vec::new(),
        solver_error: None,
    };

    let evaluator = config.evaluator();
    match evaluate_at(&evaluator, network, config.calibration.selector) {
        Ok(snapshot) => {
            if let Some(lowest) = snapshot.lowest_pressure_junctions(1).first() {
                report.min_pressure_m = Some(lowest.pressure);
                report.min_pressure_junction = Some(lowest.name.clone());
            }
            report.negative_pressure_junctions = snapshot
                .junctions()
                .filter(|n| n.pressure < 0.0)
                .map(|n| n.name.clone())
                .collect();
        }
        Err(err) => {
            warn!(error = %err, "baseline solve failed");
            report.solver_error = Some(err.to_string());
        }
    }
    Ok(report)
}

/// Result of [`connectivity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityReport {
    pub junctions: usize,
    pub disconnected: Vec<String>,
}

/// Junctions with no path to any source or tank.
pub fn connectivity(config: &RunConfig) -> AppResult<ConnectivityReport> {
    let parsed = network_service::load_network(&config.network)?;
    let network = &parsed.network;
    Ok(ConnectivityReport {
        junctions: network.junctions().count(),
        disconnected: names(network, disconnected_junctions(network)),
    })
}
