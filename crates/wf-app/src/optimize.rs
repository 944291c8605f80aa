//! Pipe-sizing search over a network file.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;
use wf_core::Real;
use wf_network::infer_source_junction_map;
use wf_optimize::{GeneticSearch, HydraulicSizing, SearchOutcome};

use crate::config::RunConfig;
use crate::error::AppResult;
use crate::network_service;

/// Result of [`run_optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub summary: String,
    pub best_cost: Real,
    /// Best diameter (mm) per sized pipe.
    pub diameters_mm: BTreeMap<String, Real>,
    pub diagnostics: BTreeMap<String, Real>,
    pub outcome: SearchOutcome,
    pub output: PathBuf,
}

/// Search pipe diameters that minimise the sizing cost, write the best
/// candidate as `<stem>_optimized` and a JSON summary.
///
/// The search space comes from the sizing diameter range, one gene per sized
/// pipe, regardless of `search.space`.
pub fn run_optimize(config: &RunConfig) -> AppResult<OptimizeReport> {
    config.validate()?;
    let parsed = network_service::load_network(&config.network)?;

    let mut sizing = HydraulicSizing::new(parsed.network.clone(), config.evaluator(), config.sizing.clone())?;
    if config.repair {
        let map = infer_source_junction_map(&parsed.network, &config.classifier);
        sizing = sizing.with_repair(map, config.calibration.clone())?;
    }
    let pipe_names = sizing.pipe_names();
    let search_config = config.search.clone().with_space(sizing.search_space());
    info!(
        pipes = pipe_names.len(),
        population = search_config.population_size,
        generations = search_config.generations,
        "starting sizing search"
    );

    let mut search = GeneticSearch::new(search_config, sizing)?;
    let outcome = search.run()?;
    let best_network = search.fitness().apply(&outcome.best.genes)?;
    let output = config.output_path("_optimized");
    network_service::write_network(&parsed, &best_network, &output)?;

    let report = OptimizeReport {
        summary: outcome.summary(),
        best_cost: outcome.best_cost(),
        diameters_mm: pipe_names
            .into_iter()
            .zip(outcome.best.genes.iter().copied())
            .collect(),
        diagnostics: outcome
            .best
            .fitness
            .as_ref()
            .map(|f| f.diagnostics.clone())
            .unwrap_or_default(),
        outcome,
        output,
    };
    network_service::write_summary(
        &config.summary_path("optimize"),
        "optimize",
        &config.network,
        &report,
    )?;
    Ok(report)
}
