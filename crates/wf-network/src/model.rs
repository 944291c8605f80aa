//! Core network data structures.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use wf_core::{Length, LinkId, NodeId, Power, Real, VolumeRate, ensure_finite};

use crate::error::{NetworkError, NetworkResult};
use crate::options::{Options, Times};

/// Node classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Demand node with an elevation and a water draw.
    Junction,
    /// Fixed-head supply (reservoir, borewell).
    Source,
    /// Storage node with a level.
    Tank,
}

/// One demand category of a junction.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    pub base: VolumeRate,
    pub pattern: Option<String>,
    /// Line of the description that declared this demand.
    pub line: Option<usize>,
}

/// Kind-specific node data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Junction {
        elevation: Length,
        demands: Vec<Demand>,
    },
    Source {
        head: Length,
        pattern: Option<String>,
    },
    Tank {
        elevation: Length,
        init_level: Length,
        min_level: Length,
        max_level: Length,
        diameter: Length,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub data: NodeData,
    /// Line of the description that declared this node.
    pub line: Option<usize>,
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self.data {
            NodeData::Junction { .. } => NodeKind::Junction,
            NodeData::Source { .. } => NodeKind::Source,
            NodeData::Tank { .. } => NodeKind::Tank,
        }
    }

    /// Ground elevation. A source has no separate elevation; its head is used.
    pub fn elevation(&self) -> Length {
        match &self.data {
            NodeData::Junction { elevation, .. } | NodeData::Tank { elevation, .. } => *elevation,
            NodeData::Source { head, .. } => *head,
        }
    }

    /// Head held fixed by the node, if any (sources and tanks).
    pub fn fixed_head(&self) -> Option<Length> {
        match &self.data {
            NodeData::Junction { .. } => None,
            NodeData::Source { head, .. } => Some(*head),
            NodeData::Tank {
                elevation,
                init_level,
                ..
            } => Some(*elevation + *init_level),
        }
    }

    /// Sum of the base demands (zero for non-junctions).
    pub fn base_demand(&self) -> VolumeRate {
        match &self.data {
            NodeData::Junction { demands, .. } => demands
                .iter()
                .fold(wf_core::cms(0.0), |acc, d| acc + d.base),
            _ => wf_core::cms(0.0),
        }
    }
}

/// Open/closed setting of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStatus {
    #[default]
    Open,
    Closed,
}

/// How a pump adds head.
#[derive(Debug, Clone, PartialEq)]
pub enum PumpDrive {
    /// Head-flow curve, referenced by curve identifier.
    Head { curve: String },
    /// Constant shaft power.
    Power { power: Power },
}

/// Valve type keyword. The valve's setting is kept but only `Tcv` uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveType {
    Prv,
    Psv,
    Pbv,
    Fcv,
    Tcv,
    Gpv,
}

impl ValveType {
    pub fn from_keyword(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "PRV" => Some(Self::Prv),
            "PSV" => Some(Self::Psv),
            "PBV" => Some(Self::Pbv),
            "FCV" => Some(Self::Fcv),
            "TCV" => Some(Self::Tcv),
            "GPV" => Some(Self::Gpv),
            _ => None,
        }
    }
}

/// Kind-specific link data.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkData {
    Pipe {
        length: Length,
        diameter: Length,
        /// Hazen-Williams C, Darcy-Weisbach roughness (mm) or Manning n,
        /// depending on the headloss option.
        roughness: Real,
        minor_loss: Real,
        check_valve: bool,
    },
    Pump {
        drive: PumpDrive,
    },
    Valve {
        diameter: Length,
        valve_type: ValveType,
        setting: Real,
        minor_loss: Real,
    },
}

/// Link classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    Pipe,
    Pump,
    Valve,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub id: LinkId,
    pub name: String,
    pub from: NodeId,
    pub to: NodeId,
    pub status: LinkStatus,
    pub data: LinkData,
    pub line: Option<usize>,
}

impl Link {
    pub fn kind(&self) -> LinkKind {
        match self.data {
            LinkData::Pipe { .. } => LinkKind::Pipe,
            LinkData::Pump { .. } => LinkKind::Pump,
            LinkData::Valve { .. } => LinkKind::Valve,
        }
    }

    /// The endpoint opposite `node`, if `node` is an endpoint at all.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if self.from == node {
            Some(self.to)
        } else if self.to == node {
            Some(self.from)
        } else {
            None
        }
    }
}

/// One point of a curve: flow (m3/s) against head (m).
#[derive(Debug, Clone, PartialEq)]
pub struct CurvePoint {
    pub x: Real,
    pub y: Real,
    pub line: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub name: String,
    pub points: Vec<CurvePoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub name: String,
    pub multipliers: Vec<Real>,
}

/// The network: a validated collection of nodes, links, curves and patterns.
///
/// Nodes and links are stored in declaration order and indexed by their IDs;
/// every link's endpoints are guaranteed to exist. Structure is fixed after
/// construction, only hydraulic parameters may be tuned.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    pub(crate) nodes: Vec<Node>,
    pub(crate) links: Vec<Link>,
    pub(crate) curves: Vec<Curve>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) options: Options,
    pub(crate) times: Times,
    pub(crate) node_names: HashMap<String, NodeId>,
    pub(crate) link_names: HashMap<String, LinkId>,
}

impl Network {
    /// Return all nodes, in declaration order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Return all links, in declaration order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn curves(&self) -> &[Curve] {
        &self.curves
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn times(&self) -> &Times {
        &self.times
    }

    /// Get a node by ID (returns None if ID out of bounds).
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.slot())
    }

    /// Get a link by ID (returns None if ID out of bounds).
    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.slot())
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.node_names.get(name).copied()
    }

    pub fn link_id(&self, name: &str) -> Option<LinkId> {
        self.link_names.get(name).copied()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node_id(name).and_then(|id| self.node(id))
    }

    pub fn link_by_name(&self, name: &str) -> Option<&Link> {
        self.link_id(name).and_then(|id| self.link(id))
    }

    pub fn curve(&self, name: &str) -> Option<&Curve> {
        self.curves.iter().find(|c| c.name == name)
    }

    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.name == name)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn junctions(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_of_kind(NodeKind::Junction)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes_of_kind(NodeKind::Source)
    }

    pub fn links_of_kind(&self, kind: LinkKind) -> impl Iterator<Item = &Link> + '_ {
        self.links.iter().filter(move |l| l.kind() == kind)
    }

    /// Links touching `node`, in declaration order.
    pub fn incident_links(&self, node: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.links
            .iter()
            .filter(move |l| l.from == node || l.to == node)
    }

    /// Mutable access to a node's hydraulic data. Identity and topology stay fixed.
    pub fn node_data_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.slot()).map(|n| &mut n.data)
    }

    /// Mutable access to a link's hydraulic data. Identity and topology stay fixed.
    pub fn link_data_mut(&mut self, id: LinkId) -> Option<&mut LinkData> {
        self.links.get_mut(id.slot()).map(|l| &mut l.data)
    }

    pub fn set_link_status(&mut self, id: LinkId, status: LinkStatus) -> NetworkResult<()> {
        let link = self
            .links
            .get_mut(id.slot())
            .ok_or_else(|| NetworkError::NotFound {
                what: "Link",
                name: id.to_string(),
            })?;
        link.status = status;
        Ok(())
    }

    pub fn curve_mut(&mut self, name: &str) -> Option<&mut Curve> {
        self.curves.iter_mut().find(|c| c.name == name)
    }

    /// Current head of a source node.
    pub fn source_head(&self, id: NodeId) -> Option<Length> {
        match self.node(id).map(|n| &n.data) {
            Some(NodeData::Source { head, .. }) => Some(*head),
            _ => None,
        }
    }

    /// Replace the head of a source node.
    pub fn set_source_head(&mut self, id: NodeId, value: Length) -> NetworkResult<()> {
        ensure_finite(value.value, "source head")?;
        let node = self
            .nodes
            .get_mut(id.slot())
            .ok_or_else(|| NetworkError::NotFound {
                what: "Node",
                name: id.to_string(),
            })?;
        match &mut node.data {
            NodeData::Source { head, .. } => {
                *head = value;
                Ok(())
            }
            _ => Err(NetworkError::WrongKind {
                name: node.name.clone(),
                expected: "source",
            }),
        }
    }

    /// Names of the head curves used by pumps, in pump declaration order, deduplicated.
    pub fn pump_curve_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for link in &self.links {
            if let LinkData::Pump {
                drive: PumpDrive::Head { curve },
            } = &link.data
            {
                if !names.contains(curve) {
                    names.push(curve.clone());
                }
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{Id, WfError, lps, m};

    #[test]
    fn node_kind_and_heads() {
        let junction = Node {
            id: Id::from_index(0),
            name: "J1".into(),
            data: NodeData::Junction {
                elevation: m(100.0),
                demands: vec![
                    Demand {
                        base: lps(2.0),
                        pattern: None,
                        line: None,
                    },
                    Demand {
                        base: lps(3.0),
                        pattern: None,
                        line: None,
                    },
                ],
            },
            line: None,
        };
        assert_eq!(junction.kind(), NodeKind::Junction);
        assert!(junction.fixed_head().is_none());
        assert!((junction.base_demand().value - 0.005).abs() < 1e-12);

        let tank = Node {
            id: Id::from_index(1),
            name: "T1".into(),
            data: NodeData::Tank {
                elevation: m(50.0),
                init_level: m(4.0),
                min_level: m(0.0),
                max_level: m(8.0),
                diameter: m(10.0),
            },
            line: None,
        };
        assert_eq!(tank.kind(), NodeKind::Tank);
        assert!((tank.fixed_head().unwrap().value - 54.0).abs() < 1e-12);
    }

    #[test]
    fn link_other_end() {
        let link = Link {
            id: Id::from_index(0),
            name: "P1".into(),
            from: Id::from_index(3),
            to: Id::from_index(5),
            status: LinkStatus::Open,
            data: LinkData::Pump {
                drive: PumpDrive::Head {
                    curve: "C1".into(),
                },
            },
            line: None,
        };
        assert_eq!(link.kind(), LinkKind::Pump);
        assert_eq!(link.other_end(Id::from_index(3)), Some(Id::from_index(5)));
        assert_eq!(link.other_end(Id::from_index(5)), Some(Id::from_index(3)));
        assert_eq!(link.other_end(Id::from_index(4)), None);
    }

    #[test]
    fn source_head_rejects_non_finite() {
        let mut b = crate::NetworkBuilder::new();
        let r = b.add_source("R1", m(10.0));
        let j = b.add_junction("J1", m(1.0), lps(1.0));
        let mut net = b.build().unwrap();

        assert!(matches!(
            net.set_source_head(r, m(Real::NAN)),
            Err(NetworkError::Value(WfError::NonFinite { .. }))
        ));
        assert!(matches!(
            net.set_source_head(j, m(20.0)),
            Err(NetworkError::WrongKind { .. })
        ));
        net.set_source_head(r, m(20.0)).unwrap();
        assert!((net.source_head(r).unwrap().value - 20.0).abs() < 1e-12);
    }
}
