//! Pipe-sizing cost model backed by a hydraulic evaluator.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wf_calibrate::{CalibrationConfig, calibrate};
use wf_core::constants::SECONDS_PER_DAY;
use wf_core::{LinkId, Real, mm};
use wf_network::{LinkData, LinkKind, Network, SourceJunctionMap};
use wf_solver::{Evaluator, TimeSelector, evaluate_at};

use crate::error::{SearchError, SearchResult};
use crate::fitness::{Fitness, FitnessFn};
use crate::space::{GeneKind, SearchSpace};

/// Cost model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    /// Pipes whose diameters are decision variables, in gene order. Empty
    /// means every pipe in declaration order.
    pub pipes: Vec<String>,
    /// Capital cost per metre of length per millimetre of diameter.
    pub unit_cost: Real,
    /// Cost per metre of junction pressure below `target_pressure_m`.
    pub pressure_penalty: Real,
    pub target_pressure_m: Real,
    /// Cost per metre of source head added by the repair step.
    pub head_cost_per_m: Real,
    /// Diameter range (mm) for each gene.
    pub min_diameter_mm: Real,
    pub max_diameter_mm: Real,
    pub selector: TimeSelector,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            pipes: Vec::new(),
            unit_cost: 1.0,
            pressure_penalty: 1.0e6,
            target_pressure_m: 0.0,
            head_cost_per_m: 1.0e4,
            min_diameter_mm: 100.0,
            max_diameter_mm: 200.0,
            selector: TimeSelector::PeakDemand,
        }
    }
}

struct Repair {
    map: SourceJunctionMap,
    config: CalibrationConfig,
}

/// Fitness function whose genes are pipe diameters in millimetres.
///
/// Each evaluation works on its own copy of the base network. Cost is
/// `Σ unit_cost × length × diameter` plus `pressure_penalty × Σ deficit`
/// over junctions below the target, plus `head_cost_per_m ×` head added by
/// the optional calibrator repair. Failed evaluations score as diverged.
pub struct HydraulicSizing<E> {
    base: Network,
    pipes: Vec<LinkId>,
    evaluator: E,
    config: SizingConfig,
    repair: Option<Repair>,
}

impl<E: Evaluator> HydraulicSizing<E> {
    pub fn new(base: Network, evaluator: E, config: SizingConfig) -> SearchResult<Self> {
        if !(config.unit_cost >= 0.0 && config.pressure_penalty >= 0.0 && config.head_cost_per_m >= 0.0) {
            return Err(SearchError::InvalidArg {
                what: "cost coefficients must be non-negative",
            });
        }
        if !(config.min_diameter_mm > 0.0 && config.min_diameter_mm <= config.max_diameter_mm) {
            return Err(SearchError::InvalidArg {
                what: "diameter range must be positive and non-empty",
            });
        }
        let pipes = if config.pipes.is_empty() {
            base.links_of_kind(LinkKind::Pipe).map(|l| l.id).collect()
        } else {
            config
                .pipes
                .iter()
                .map(|name| match base.link_by_name(name) {
                    Some(link) if link.kind() == LinkKind::Pipe => Ok(link.id),
                    _ => Err(SearchError::UnknownPipe { name: name.clone() }),
                })
                .collect::<SearchResult<Vec<_>>>()?
        };
        if pipes.is_empty() {
            return Err(SearchError::InvalidArg {
                what: "network has no pipes to size",
            });
        }
        Ok(Self {
            base,
            pipes,
            evaluator,
            config,
            repair: None,
        })
    }

    /// Run the calibrator on every candidate before scoring it.
    pub fn with_repair(mut self, map: SourceJunctionMap, config: CalibrationConfig) -> SearchResult<Self> {
        config.validate()?;
        self.repair = Some(Repair { map, config });
        Ok(self)
    }

    pub fn gene_count(&self) -> usize {
        self.pipes.len()
    }

    /// Names of the sized pipes, in gene order.
    pub fn pipe_names(&self) -> Vec<String> {
        self.pipes
            .iter()
            .filter_map(|&id| self.base.link(id).map(|l| l.name.clone()))
            .collect()
    }

    /// Integer diameter genes over the configured range.
    pub fn search_space(&self) -> SearchSpace {
        SearchSpace::uniform(
            self.gene_count(),
            self.config.min_diameter_mm,
            self.config.max_diameter_mm,
            GeneKind::Integer,
        )
    }

    /// Copy of the base network with the candidate diameters applied.
    pub fn apply(&self, genes: &[Real]) -> SearchResult<Network> {
        if genes.len() != self.pipes.len() {
            return Err(SearchError::GeneCount {
                expected: self.pipes.len(),
                got: genes.len(),
            });
        }
        let mut network = self.base.clone();
        for (&id, &d) in self.pipes.iter().zip(genes) {
            if !(d.is_finite() && d > 0.0) {
                return Err(SearchError::InvalidArg {
                    what: "pipe diameter must be positive",
                });
            }
            if let Some(LinkData::Pipe { diameter, .. }) = network.link_data_mut(id) {
                *diameter = mm(d);
            }
        }
        Ok(network)
    }

    /// Capital cost proxy of the sized pipes.
    pub fn capex(&self, genes: &[Real]) -> Real {
        self.pipes
            .iter()
            .zip(genes)
            .filter_map(|(&id, &d)| match self.base.link(id).map(|l| &l.data) {
                Some(LinkData::Pipe { length, .. }) => Some(self.config.unit_cost * length.value * d),
                _ => None,
            })
            .sum()
    }

    /// Score a candidate, propagating evaluation failures.
    pub fn try_evaluate(&self, genes: &[Real]) -> SearchResult<Fitness> {
        let mut network = self.apply(genes)?;
        let capex = self.capex(genes);

        let mut head_raise = 0.0;
        let mut fitness_extra = Vec::new();
        if let Some(repair) = &self.repair {
            let state = calibrate(&mut network, &self.evaluator, &repair.map, &repair.config)?;
            head_raise = state.offsets.values().sum();
            fitness_extra.push(("calibration_iterations", state.iterations as Real));
            fitness_extra.push(("feasible", if state.is_feasible() { 1.0 } else { 0.0 }));
        }

        let snapshot = evaluate_at(&self.evaluator, &network, self.config.selector)?;
        let target = self.config.target_pressure_m;
        let deficit: Real = snapshot
            .junctions()
            .map(|n| (target - n.pressure).max(0.0))
            .sum();
        // Junctions under negative pressure are counted as not served.
        let demand = snapshot.total_demand();
        let delivered: Real = snapshot
            .junctions()
            .filter(|n| n.pressure >= 0.0)
            .map(|n| n.demand)
            .sum();
        let min_pressure = snapshot.min_junction_pressure().unwrap_or(Real::NAN);

        let cost = capex + self.config.head_cost_per_m * head_raise + self.config.pressure_penalty * deficit;
        debug!(cost, capex, deficit, head_raise, "scored sizing candidate");

        let mut fitness = Fitness::new(cost)
            .with("total_capex", capex)
            .with("total_delivered_lps", delivered * 1000.0)
            .with("total_demand_lps", demand * 1000.0)
            .with("unserved_m3_day", (demand - delivered).max(0.0) * SECONDS_PER_DAY)
            .with("min_pressure_m", min_pressure)
            .with("pressure_deficit_m", deficit)
            .with("head_raise_m", head_raise);
        for (name, value) in fitness_extra {
            fitness = fitness.with(name, value);
        }
        Ok(fitness)
    }
}

impl<E: Evaluator> FitnessFn for HydraulicSizing<E> {
    fn evaluate(&self, genes: &[Real]) -> Fitness {
        match self.try_evaluate(genes) {
            Ok(fitness) => fitness,
            Err(err) => {
                warn!(error = %err, "sizing evaluation failed; scoring as diverged");
                Fitness::diverged()
            }
        }
    }
}
