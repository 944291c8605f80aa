//! Incremental network builder.

use std::collections::HashMap;
use wf_core::{Length, LinkId, NodeId, Real, VolumeRate};

use crate::error::NetworkResult;
use crate::model::{
    Curve, CurvePoint, Demand, Link, LinkData, LinkStatus, Network, Node, NodeData, Pattern,
    PumpDrive,
};
use crate::options::{Options, Times};
use crate::validate;

/// Builder for constructing a network incrementally.
///
/// Use the `add_*` methods to build up the network,
/// then call `build()` to validate and freeze it into a `Network`.
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    nodes: Vec<Node>,
    links: Vec<Link>,
    curves: Vec<Curve>,
    patterns: Vec<Pattern>,
    options: Options,
    times: Times,
}

impl NetworkBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&mut self, options: Options) -> &mut Self {
        self.options = options;
        self
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    pub fn times(&mut self, times: Times) -> &mut Self {
        self.times = times;
        self
    }

    pub fn times_mut(&mut self) -> &mut Times {
        &mut self.times
    }

    /// Add a node with explicit data and source line, returning its ID.
    pub fn push_node(
        &mut self,
        name: impl Into<String>,
        data: NodeData,
        line: Option<usize>,
    ) -> NodeId {
        let id = NodeId::from_index(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            name: name.into(),
            data,
            line,
        });
        id
    }

    /// Add a link with explicit data and source line, returning its ID.
    pub fn push_link(
        &mut self,
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        data: LinkData,
        line: Option<usize>,
    ) -> LinkId {
        let id = LinkId::from_index(self.links.len() as u32);
        self.links.push(Link {
            id,
            name: name.into(),
            from,
            to,
            status: LinkStatus::Open,
            data,
            line,
        });
        id
    }

    /// Add a junction with a single unpatterned demand (zero means no draw).
    pub fn add_junction(
        &mut self,
        name: impl Into<String>,
        elevation: Length,
        demand: VolumeRate,
    ) -> NodeId {
        let demands = if demand.value != 0.0 {
            vec![Demand {
                base: demand,
                pattern: None,
                line: None,
            }]
        } else {
            Vec::new()
        };
        self.push_node(name, NodeData::Junction { elevation, demands }, None)
    }

    /// Add a fixed-head source.
    pub fn add_source(&mut self, name: impl Into<String>, head: Length) -> NodeId {
        self.push_node(
            name,
            NodeData::Source {
                head,
                pattern: None,
            },
            None,
        )
    }

    /// Add a tank held at its initial level.
    pub fn add_tank(
        &mut self,
        name: impl Into<String>,
        elevation: Length,
        init_level: Length,
        diameter: Length,
    ) -> NodeId {
        self.push_node(
            name,
            NodeData::Tank {
                elevation,
                init_level,
                min_level: wf_core::m(0.0),
                max_level: init_level + init_level,
                diameter,
            },
            None,
        )
    }

    /// Add a pipe without minor losses.
    pub fn add_pipe(
        &mut self,
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        length: Length,
        diameter: Length,
        roughness: Real,
    ) -> LinkId {
        self.push_link(
            name,
            from,
            to,
            LinkData::Pipe {
                length,
                diameter,
                roughness,
                minor_loss: 0.0,
                check_valve: false,
            },
            None,
        )
    }

    /// Add a pump driven by a head curve.
    pub fn add_pump(
        &mut self,
        name: impl Into<String>,
        from: NodeId,
        to: NodeId,
        curve: impl Into<String>,
    ) -> LinkId {
        self.push_link(
            name,
            from,
            to,
            LinkData::Pump {
                drive: PumpDrive::Head {
                    curve: curve.into(),
                },
            },
            None,
        )
    }

    /// Set the status of a link added earlier.
    pub fn set_link_status(&mut self, link: LinkId, status: LinkStatus) {
        if let Some(l) = self.links.get_mut(link.slot()) {
            l.status = status;
        }
    }

    /// Mutable access to a link added earlier.
    pub fn link_data_mut(&mut self, link: LinkId) -> Option<&mut LinkData> {
        self.links.get_mut(link.slot()).map(|l| &mut l.data)
    }

    /// Append a demand to an existing junction.
    pub fn push_demand(&mut self, junction: NodeId, demand: Demand) {
        if let Some(Node {
            data: NodeData::Junction { demands, .. },
            ..
        }) = self.nodes.get_mut(junction.slot())
        {
            demands.push(demand);
        }
    }

    /// Drop all demands of a junction (a `[DEMANDS]` entry supersedes the junction line).
    pub fn clear_demands(&mut self, junction: NodeId) {
        if let Some(Node {
            data: NodeData::Junction { demands, .. },
            ..
        }) = self.nodes.get_mut(junction.slot())
        {
            demands.clear();
        }
    }

    /// Add a curve from `(flow m3/s, head m)` points.
    pub fn add_curve(&mut self, name: impl Into<String>, points: &[(Real, Real)]) {
        self.curves.push(Curve {
            name: name.into(),
            points: points
                .iter()
                .map(|&(x, y)| CurvePoint { x, y, line: None })
                .collect(),
        });
    }

    /// Append one point to a curve, creating the curve on first use.
    pub fn push_curve_point(&mut self, name: &str, point: CurvePoint) {
        match self.curves.iter_mut().find(|c| c.name == name) {
            Some(curve) => curve.points.push(point),
            None => self.curves.push(Curve {
                name: name.to_string(),
                points: vec![point],
            }),
        }
    }

    /// Append multipliers to a pattern, creating the pattern on first use.
    pub fn extend_pattern(&mut self, name: &str, multipliers: &[Real]) {
        match self.patterns.iter_mut().find(|p| p.name == name) {
            Some(pattern) => pattern.multipliers.extend_from_slice(multipliers),
            None => self.patterns.push(Pattern {
                name: name.to_string(),
                multipliers: multipliers.to_vec(),
            }),
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Build and validate the network.
    ///
    /// This checks link endpoints and name uniqueness and builds the name indexes.
    pub fn build(self) -> NetworkResult<Network> {
        validate::validate_structure(&self.nodes, &self.links, &self.curves)?;

        let node_names: HashMap<String, NodeId> =
            self.nodes.iter().map(|n| (n.name.clone(), n.id)).collect();
        let link_names: HashMap<String, LinkId> =
            self.links.iter().map(|l| (l.name.clone(), l.id)).collect();

        Ok(Network {
            nodes: self.nodes,
            links: self.links,
            curves: self.curves,
            patterns: self.patterns,
            options: self.options,
            times: self.times,
            node_names,
            link_names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{lps, m, mm};

    #[test]
    fn builder_basic() {
        let mut builder = NetworkBuilder::new();
        let r = builder.add_source("R1", m(120.0));
        let j = builder.add_junction("J1", m(100.0), lps(5.0));
        let p = builder.add_pipe("P1", r, j, m(500.0), mm(200.0), 130.0);

        assert_eq!(r.index(), 0);
        assert_eq!(j.index(), 1);
        assert_eq!(p.index(), 0);
        assert_eq!(builder.node_count(), 2);
        assert_eq!(builder.link_count(), 1);
    }

    #[test]
    fn builder_build_indexes_names() {
        let mut builder = NetworkBuilder::new();
        let r = builder.add_source("R1", m(120.0));
        let j = builder.add_junction("J1", m(100.0), lps(5.0));
        builder.add_pipe("P1", r, j, m(500.0), mm(200.0), 130.0);

        let network = builder.build().unwrap();
        assert_eq!(network.node_id("J1"), Some(j));
        assert_eq!(network.link_by_name("P1").map(|l| l.to), Some(j));
        assert_eq!(network.sources().count(), 1);
        assert_eq!(network.junctions().count(), 1);
    }

    #[test]
    fn zero_demand_junction_has_no_demands() {
        let mut builder = NetworkBuilder::new();
        builder.add_junction("J1", m(10.0), lps(0.0));
        let network = builder.build().unwrap();
        match &network.nodes()[0].data {
            NodeData::Junction { demands, .. } => assert!(demands.is_empty()),
            other => panic!("unexpected node data {other:?}"),
        }
    }

    #[test]
    fn curves_and_patterns_accumulate() {
        let mut builder = NetworkBuilder::new();
        builder.push_curve_point(
            "C1",
            CurvePoint {
                x: 0.01,
                y: 40.0,
                line: Some(3),
            },
        );
        builder.push_curve_point(
            "C1",
            CurvePoint {
                x: 0.02,
                y: 30.0,
                line: Some(4),
            },
        );
        builder.extend_pattern("PAT", &[1.0, 1.2]);
        builder.extend_pattern("PAT", &[0.8]);
        let network = builder.build().unwrap();
        assert_eq!(network.curve("C1").unwrap().points.len(), 2);
        assert_eq!(network.pattern("PAT").unwrap().multipliers, vec![1.0, 1.2, 0.8]);
    }
}
