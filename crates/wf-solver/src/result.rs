//! Solver output tables and time-step selection.

use serde::{Deserialize, Serialize};
use wf_core::{NodeId, Real};
use wf_network::NodeKind;

/// State of one node at one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    /// Hydraulic head (m).
    pub head: Real,
    /// Head minus elevation (m).
    pub pressure: Real,
    /// Demand drawn at the node (m3/s); zero for sources and tanks.
    pub demand: Real,
    /// Net link flow into the node (m3/s); negative where water is supplied.
    pub inflow: Real,
}

/// Flow through one link at one time step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkState {
    pub name: String,
    /// Flow from the first to the second endpoint (m3/s).
    pub flow: Real,
}

/// All node and link values at one time step.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub time_s: u64,
    pub nodes: Vec<NodeState>,
    pub links: Vec<LinkState>,
}

impl Snapshot {
    pub fn node(&self, name: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn link(&self, name: &str) -> Option<&LinkState> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &NodeState> + '_ {
        self.nodes.iter().filter(|n| n.kind == NodeKind::Junction)
    }

    /// Lowest junction pressure, `None` without junctions.
    pub fn min_junction_pressure(&self) -> Option<Real> {
        self.junctions().map(|n| n.pressure).reduce(Real::min)
    }

    /// The `count` junctions with the lowest pressure, lowest first.
    pub fn lowest_pressure_junctions(&self, count: usize) -> Vec<&NodeState> {
        let mut junctions: Vec<&NodeState> = self.junctions().collect();
        junctions.sort_by(|a, b| a.pressure.total_cmp(&b.pressure));
        junctions.truncate(count);
        junctions
    }

    /// Summed junction demand (m3/s).
    pub fn total_demand(&self) -> Real {
        self.nodes.iter().map(|n| n.demand).sum()
    }

    /// Water delivered by sources and tanks (m3/s).
    pub fn total_supply(&self) -> Real {
        self.nodes
            .iter()
            .filter(|n| n.kind != NodeKind::Junction)
            .map(|n| -n.inflow)
            .sum()
    }

    /// Number of junctions below `threshold` pressure.
    pub fn count_below(&self, threshold: Real) -> usize {
        self.junctions().filter(|n| n.pressure < threshold).count()
    }
}

/// Which time step of a run the caller reads.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimeSelector {
    /// The step whose summed demand is largest (earliest on ties).
    #[default]
    PeakDemand,
    Last,
    /// The last step at or before the given time (seconds).
    At { time_s: u64 },
}

/// Time series of snapshots produced by one evaluation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResult {
    pub steps: Vec<Snapshot>,
}

impl SimulationResult {
    pub fn single(snapshot: Snapshot) -> Self {
        Self {
            steps: vec![snapshot],
        }
    }

    pub fn times(&self) -> Vec<u64> {
        self.steps.iter().map(|s| s.time_s).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the step picked by `selector`.
    pub fn select_index(&self, selector: TimeSelector) -> Option<usize> {
        if self.steps.is_empty() {
            return None;
        }
        match selector {
            TimeSelector::PeakDemand => {
                let mut best = 0;
                for (i, step) in self.steps.iter().enumerate().skip(1) {
                    if step.total_demand() > self.steps[best].total_demand() {
                        best = i;
                    }
                }
                Some(best)
            }
            TimeSelector::Last => Some(self.steps.len() - 1),
            TimeSelector::At { time_s: t } => Some(
                self.steps
                    .iter()
                    .rposition(|s| s.time_s <= t)
                    .unwrap_or(0),
            ),
        }
    }

    pub fn select(&self, selector: TimeSelector) -> Option<&Snapshot> {
        self.select_index(selector).map(|i| &self.steps[i])
    }

    pub fn into_selected(mut self, selector: TimeSelector) -> Option<Snapshot> {
        let i = self.select_index(selector)?;
        Some(self.steps.swap_remove(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::Id;

    fn junction(i: u32, pressure: Real, demand: Real) -> NodeState {
        NodeState {
            id: Id::from_index(i),
            name: format!("J{i}"),
            kind: NodeKind::Junction,
            head: pressure,
            pressure,
            demand,
            inflow: demand,
        }
    }

    fn step(time_s: u64, demands: &[Real]) -> Snapshot {
        Snapshot {
            time_s,
            nodes: demands
                .iter()
                .enumerate()
                .map(|(i, &d)| junction(i as u32, 10.0 * i as Real, d))
                .collect(),
            links: Vec::new(),
        }
    }

    #[test]
    fn peak_demand_picks_largest_sum_first_on_ties() {
        let result = SimulationResult {
            steps: vec![
                step(0, &[1.0, 1.0]),
                step(3_600, &[2.0, 1.0]),
                step(7_200, &[1.5, 1.5]),
            ],
        };
        assert_eq!(result.select_index(TimeSelector::PeakDemand), Some(1));
        assert_eq!(result.select_index(TimeSelector::Last), Some(2));
        assert_eq!(result.select_index(TimeSelector::At { time_s: 5_000 }), Some(1));
        assert_eq!(result.select_index(TimeSelector::At { time_s: 0 }), Some(0));
        assert!(SimulationResult::default().select(TimeSelector::Last).is_none());
    }

    #[test]
    fn lowest_pressures() {
        let snap = Snapshot {
            time_s: 0,
            nodes: vec![junction(0, 5.0, 0.0), junction(1, -2.0, 0.0), junction(2, 1.0, 0.0)],
            links: Vec::new(),
        };
        assert_eq!(snap.min_junction_pressure(), Some(-2.0));
        let lowest: Vec<&str> = snap
            .lowest_pressure_junctions(2)
            .iter()
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(lowest, vec!["J1", "J2"]);
        assert_eq!(snap.count_below(0.0), 1);
    }
}
