//! Built-in extended-period solver using the global gradient method.
//!
//! Unknowns are junction heads and open-link flows. Each trial linearises the
//! link relations around the current flows, solves the symmetric head system
//! and updates the flows from the new heads. Sources and tanks hold fixed
//! heads; tanks stay at their initial level for the whole horizon.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;
use wf_core::{NodeId, Real};
use wf_network::{LinkStatus, Network, NodeData, NodeKind, Times};

use crate::error::{SolverError, SolverResult};
use crate::evaluator::Evaluator;
use crate::hydraulics::{CompiledLink, compile_link};
use crate::result::{LinkState, NodeState, SimulationResult, Snapshot};

/// Gradient solver configuration.
///
/// `max_trials` and `accuracy` are overridden by the network's own options
/// when it sets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Maximum trials per time step
    pub max_trials: usize,
    /// Convergence limit on sum|dQ| / sum|Q|
    pub accuracy: Real,
    /// Lower bound on a link's headloss gradient
    pub min_gradient: Real,
    /// Kinematic viscosity (m2/s) for Darcy-Weisbach
    pub viscosity: Real,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_trials: 200,
            accuracy: 1e-3,
            min_gradient: 1e-7,
            viscosity: 1.1e-6,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GradientSolver {
    pub options: SolverOptions,
}

/// Per-network quantities that do not change between time steps.
struct Layout {
    /// Junction slot per node, `None` for fixed-head nodes.
    unknown: Vec<Option<usize>>,
    /// Open links and their relations, by link slot.
    links: Vec<(usize, CompiledLink)>,
}

impl GradientSolver {
    pub fn new(options: SolverOptions) -> Self {
        Self { options }
    }

    fn layout(&self, network: &Network) -> SolverResult<Layout> {
        let mut unknown = vec![None; network.nodes().len()];
        let mut count = 0;
        for node in network.nodes() {
            if node.kind() == NodeKind::Junction {
                unknown[node.id.slot()] = Some(count);
                count += 1;
            }
        }
        if count == network.nodes().len() {
            return Err(SolverError::Setup {
                what: "network has no source or tank".to_string(),
            });
        }

        let mut links = Vec::new();
        for link in network.links() {
            if link.status == LinkStatus::Closed {
                continue;
            }
            links.push((link.id.slot(), compile_link(network, &link.data)?));
        }
        Ok(Layout { unknown, links })
    }

    fn multiplier(network: &Network, pattern: Option<&str>, t: u64) -> Real {
        pattern
            .and_then(|name| network.pattern(name))
            .filter(|p| !p.multipliers.is_empty())
            .map(|p| p.multipliers[network.times().pattern_index(t, p.multipliers.len())])
            .unwrap_or(1.0)
    }

    /// Demand (m3/s) and fixed head (m) of every node at time `t`.
    fn boundary(network: &Network, t: u64) -> (Vec<Real>, Vec<Real>) {
        let options = network.options();
        let mut demand = vec![0.0; network.nodes().len()];
        let mut fixed = vec![0.0; network.nodes().len()];
        for node in network.nodes() {
            let slot = node.id.slot();
            match &node.data {
                NodeData::Junction { demands, .. } => {
                    demand[slot] = demands
                        .iter()
                        .map(|d| {
                            let pattern = d.pattern.as_deref().or(options.default_pattern.as_deref());
                            d.base.value * Self::multiplier(network, pattern, t)
                        })
                        .sum::<Real>()
                        * options.demand_multiplier;
                }
                NodeData::Source { head, pattern } => {
                    fixed[slot] = head.value * Self::multiplier(network, pattern.as_deref(), t);
                }
                NodeData::Tank { .. } => {
                    fixed[slot] = node.fixed_head().map(|h| h.value).unwrap_or_default();
                }
            }
        }
        (demand, fixed)
    }

    /// Solve one time step, warm-started from `flows` (indexed like `layout.links`).
    fn solve_step(
        &self,
        network: &Network,
        layout: &Layout,
        t: u64,
        flows: &mut [Real],
    ) -> SolverResult<Snapshot> {
        let (demand, fixed) = Self::boundary(network, t);
        let n = layout.unknown.iter().flatten().count();
        let max_trials = network.options().trials.unwrap_or(self.options.max_trials);
        let accuracy = network.options().accuracy.unwrap_or(self.options.accuracy);

        let mut heads = DVector::<Real>::zeros(n);
        let mut converged = false;
        let mut trials = 0;

        while trials < max_trials {
            trials += 1;
            let mut a = DMatrix::<Real>::zeros(n, n);
            let mut f = DVector::<Real>::zeros(n);
            let mut p = vec![0.0; layout.links.len()];
            let mut y = vec![0.0; layout.links.len()];

            for node in network.nodes() {
                if let Some(row) = layout.unknown[node.id.slot()] {
                    f[row] -= demand[node.id.slot()];
                }
            }

            for (k, (slot, compiled)) in layout.links.iter().enumerate() {
                let link = &network.links()[*slot];
                let (h, g) =
                    compiled.headloss(flows[k], self.options.viscosity, self.options.min_gradient);
                p[k] = 1.0 / g;
                y[k] = p[k] * h;
                let net = flows[k] - y[k];

                let from = layout.unknown[link.from.slot()];
                let to = layout.unknown[link.to.slot()];
                if let Some(i) = from {
                    a[(i, i)] += p[k];
                    f[i] -= net;
                }
                if let Some(j) = to {
                    a[(j, j)] += p[k];
                    f[j] += net;
                }
                match (from, to) {
                    (Some(i), Some(j)) => {
                        a[(i, j)] -= p[k];
                        a[(j, i)] -= p[k];
                    }
                    (Some(i), None) => f[i] += p[k] * fixed[link.to.slot()],
                    (None, Some(j)) => f[j] += p[k] * fixed[link.from.slot()],
                    (None, None) => {}
                }
            }

            heads = a.lu().solve(&f).ok_or_else(|| SolverError::Divergence {
                what: format!("singular head matrix at t = {t} s"),
            })?;

            let head_of = |id: NodeId| match layout.unknown[id.slot()] {
                Some(i) => heads[i],
                None => fixed[id.slot()],
            };

            let mut sum_dq = 0.0;
            let mut sum_q = 0.0;
            for (k, (slot, compiled)) in layout.links.iter().enumerate() {
                let link = &network.links()[*slot];
                let mut q = flows[k] - y[k] + p[k] * (head_of(link.from) - head_of(link.to));
                if compiled.is_pump() {
                    q = q.max(0.0);
                }
                if !q.is_finite() {
                    return Err(SolverError::Divergence {
                        what: format!("non-finite flow in link '{}'", link.name),
                    });
                }
                sum_dq += (q - flows[k]).abs();
                sum_q += q.abs();
                flows[k] = q;
            }

            let ratio = if sum_q > 0.0 { sum_dq / sum_q } else { sum_dq };
            if ratio <= accuracy {
                converged = true;
                break;
            }
        }

        if !converged {
            return Err(SolverError::Divergence {
                what: format!("no convergence within {max_trials} trials at t = {t} s"),
            });
        }
        debug!(t, trials, "time step converged");

        let mut node_head = fixed;
        for (slot, unknown) in layout.unknown.iter().enumerate() {
            if let Some(i) = unknown {
                node_head[slot] = heads[*i];
            }
        }
        if node_head.iter().any(|h| !h.is_finite()) {
            return Err(SolverError::Divergence {
                what: format!("non-finite head at t = {t} s"),
            });
        }

        let mut inflow = vec![0.0; network.nodes().len()];
        let mut link_flow = vec![0.0; network.links().len()];
        for (k, (slot, _)) in layout.links.iter().enumerate() {
            let link = &network.links()[*slot];
            link_flow[*slot] = flows[k];
            inflow[link.from.slot()] -= flows[k];
            inflow[link.to.slot()] += flows[k];
        }

        let nodes = network
            .nodes()
            .iter()
            .map(|node| {
                let slot = node.id.slot();
                let pressure = match node.kind() {
                    NodeKind::Source => 0.0,
                    _ => node_head[slot] - node.elevation().value,
                };
                NodeState {
                    id: node.id,
                    name: node.name.clone(),
                    kind: node.kind(),
                    head: node_head[slot],
                    pressure,
                    demand: demand[slot],
                    inflow: inflow[slot],
                }
            })
            .collect();
        let links = network
            .links()
            .iter()
            .map(|link| LinkState {
                name: link.name.clone(),
                flow: link_flow[link.id.slot()],
            })
            .collect();

        Ok(Snapshot {
            time_s: t,
            nodes,
            links,
        })
    }
}

impl Evaluator for GradientSolver {
    fn evaluate(&self, network: &Network) -> SolverResult<SimulationResult> {
        let times = network.times();
        if !times.is_bounded() {
            return Err(SolverError::Setup {
                what: format!(
                    "{} hydraulic steps exceed the limit of {}",
                    times.step_count(),
                    Times::MAX_STEPS
                ),
            });
        }
        let layout = self.layout(network)?;
        let mut flows: Vec<Real> = layout.links.iter().map(|(_, c)| c.initial_flow).collect();

        let mut steps = Vec::new();
        for t in network.times().steps() {
            steps.push(self.solve_step(network, &layout, t, &mut flows)?);
        }
        Ok(SimulationResult { steps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TimeSelector;
    use wf_core::{lps, m, mm};
    use wf_network::{LinkData, NetworkBuilder, PumpDrive};

    fn single_pipe(head: Real, demand_lps: Real) -> Network {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(head));
        let j = b.add_junction("J1", m(100.0), lps(demand_lps));
        b.add_pipe("P1", r, j, m(1000.0), mm(300.0), 130.0);
        b.build().unwrap()
    }

    #[test]
    fn no_demand_means_static_head() {
        let result = GradientSolver::default().evaluate(&single_pipe(120.0, 0.0)).unwrap();
        let snap = result.select(TimeSelector::PeakDemand).unwrap();
        assert!((snap.node("J1").unwrap().pressure - 20.0).abs() < 1e-6);
        assert!(snap.link("P1").unwrap().flow.abs() < 1e-9);
    }

    #[test]
    fn single_pipe_matches_hazen_williams() {
        let result = GradientSolver::default().evaluate(&single_pipe(120.0, 50.0)).unwrap();
        let snap = &result.steps[0];
        let q: f64 = 0.05;
        let loss = 10.667 * 1000.0 / (130.0_f64.powf(1.852) * 0.3_f64.powf(4.871)) * q.powf(1.852);
        let j1 = snap.node("J1").unwrap();
        assert!((j1.pressure - (20.0 - loss)).abs() < 1e-3);
        assert!((snap.link("P1").unwrap().flow - q).abs() < 1e-5);
        assert!((snap.total_supply() - q).abs() < 1e-5);
    }

    #[test]
    fn series_network_conserves_mass() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(150.0));
        let j1 = b.add_junction("J1", m(100.0), lps(10.0));
        let j2 = b.add_junction("J2", m(95.0), lps(15.0));
        let j3 = b.add_junction("J3", m(90.0), lps(5.0));
        b.add_pipe("P1", r, j1, m(800.0), mm(300.0), 130.0);
        b.add_pipe("P2", j1, j2, m(600.0), mm(250.0), 130.0);
        b.add_pipe("P3", j2, j3, m(400.0), mm(200.0), 120.0);
        b.add_pipe("P4", j1, j3, m(900.0), mm(150.0), 110.0);
        let net = b.build().unwrap();

        let snap = GradientSolver::default()
            .evaluate(&net)
            .unwrap()
            .into_selected(TimeSelector::Last)
            .unwrap();
        for j in snap.junctions() {
            assert!((j.inflow - j.demand).abs() < 1e-4, "{}", j.name);
        }
        assert!((snap.total_supply() - 0.03).abs() < 1e-4);
        let p1 = snap.node("J1").unwrap().head;
        assert!(p1 < 150.0);
    }

    #[test]
    fn pump_lifts_head() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(100.0));
        let j = b.add_junction("J1", m(100.0), lps(20.0));
        b.add_curve("C1", &[(0.02, 30.0)]);
        b.add_pump("PU1", r, j, "C1");
        let net = b.build().unwrap();

        let snap = GradientSolver::default()
            .evaluate(&net)
            .unwrap()
            .into_selected(TimeSelector::PeakDemand)
            .unwrap();
        // Pump delivers exactly its design flow, so it adds its design head
        assert!((snap.node("J1").unwrap().pressure - 30.0).abs() < 1e-3);
    }

    #[test]
    fn closed_link_isolates_junction() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(120.0));
        let j = b.add_junction("J1", m(100.0), lps(1.0));
        let p = b.add_pipe("P1", r, j, m(100.0), mm(100.0), 130.0);
        b.set_link_status(p, LinkStatus::Closed);
        let net = b.build().unwrap();

        let err = GradientSolver::default().evaluate(&net).unwrap_err();
        assert!(err.is_divergence());
    }

    #[test]
    fn demand_pattern_shapes_time_series() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(130.0));
        let j = b.add_junction("J1", m(100.0), lps(0.0));
        b.push_demand(
            j,
            wf_network::Demand {
                base: lps(10.0),
                pattern: Some("DAY".into()),
                line: None,
            },
        );
        b.extend_pattern("DAY", &[0.5, 2.0, 1.0]);
        b.add_pipe("P1", r, j, m(1000.0), mm(200.0), 130.0);
        b.times_mut().duration_s = 7_200;
        let net = b.build().unwrap();

        let result = GradientSolver::default().evaluate(&net).unwrap();
        assert_eq!(result.times(), vec![0, 3_600, 7_200]);
        assert_eq!(result.select_index(TimeSelector::PeakDemand), Some(1));
        let peak = result.select(TimeSelector::PeakDemand).unwrap();
        let low = &result.steps[0];
        assert!(peak.min_junction_pressure().unwrap() < low.min_junction_pressure().unwrap());
    }

    #[test]
    fn unbounded_horizon_is_a_setup_error() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(120.0));
        let j = b.add_junction("J1", m(100.0), lps(1.0));
        b.add_pipe("P1", r, j, m(1000.0), mm(300.0), 130.0);
        b.times_mut().duration_s = 3_600_000_000;
        let net = b.build().unwrap();

        let err = GradientSolver::default().evaluate(&net).unwrap_err();
        assert!(matches!(err, SolverError::Setup { .. }));
        assert!(!err.is_divergence());
    }

    #[test]
    fn power_pump_setup() {
        let mut b = NetworkBuilder::new();
        let r = b.add_source("R1", m(100.0));
        let j = b.add_junction("J1", m(100.0), lps(10.0));
        let pu = b.add_pump("PU1", r, j, "unused");
        if let Some(data) = b.link_data_mut(pu) {
            *data = LinkData::Pump {
                drive: PumpDrive::Power {
                    power: wf_core::kw(5.0),
                },
            };
        }
        let net = b.build().unwrap();

        let snap = GradientSolver::default()
            .evaluate(&net)
            .unwrap()
            .into_selected(TimeSelector::Last)
            .unwrap();
        let lift = 5_000.0 / (wf_core::constants::GAMMA_WATER * 0.01);
        assert!((snap.node("J1").unwrap().pressure - lift).abs() < 1e-2);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn supply_matches_demand_on_a_branch(
                d1 in 0.0..20.0f64,
                d2 in 0.0..20.0f64,
                d3 in 0.0..20.0f64,
            ) {
                let mut b = NetworkBuilder::new();
                let r = b.add_source("R1", m(200.0));
                let j1 = b.add_junction("J1", m(100.0), lps(d1));
                let j2 = b.add_junction("J2", m(100.0), lps(d2));
                let j3 = b.add_junction("J3", m(100.0), lps(d3));
                b.add_pipe("P1", r, j1, m(500.0), mm(300.0), 130.0);
                b.add_pipe("P2", j1, j2, m(500.0), mm(200.0), 130.0);
                b.add_pipe("P3", j1, j3, m(500.0), mm(200.0), 130.0);
                let net = b.build().unwrap();

                let result = GradientSolver::default().evaluate(&net).unwrap();
                let snap = &result.steps[0];
                let demand = (d1 + d2 + d3) / 1000.0;
                prop_assert!((snap.total_demand() - demand).abs() < 1e-9);
                prop_assert!((snap.total_supply() - demand).abs() < 1e-5);
                let p1 = snap.link("P1").unwrap().flow;
                prop_assert!((p1 - demand).abs() < 1e-5);
            }
        }
    }
}
