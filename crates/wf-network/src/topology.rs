//! Source to first-downstream-junction inference.
//!
//! This is an adjacency scan, not a path search: every link is inspected in
//! declaration order and the first link joining a source to a junction fixes
//! that source's entry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use wf_core::{LinkId, NodeId};

use crate::model::{Network, Node, NodeKind};

/// Decides which nodes count as sources and junctions for the mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Classifier {
    /// Use the node kind declared by the description section.
    #[default]
    ByKind,
    /// Match case-insensitive identifier prefixes.
    ByNamePrefix {
        sources: Vec<String>,
        junctions: Vec<String>,
    },
}

impl Classifier {
    /// `Reservoir*`/`Borewell*` sources feeding `J*` junctions.
    pub fn reference_names() -> Self {
        Classifier::ByNamePrefix {
            sources: vec!["reservoir".into(), "borewell".into()],
            junctions: vec!["J".into()],
        }
    }

    pub fn is_source(&self, node: &Node) -> bool {
        match self {
            Classifier::ByKind => node.kind() == NodeKind::Source,
            Classifier::ByNamePrefix { sources, .. } => has_prefix(&node.name, sources),
        }
    }

    pub fn is_junction(&self, node: &Node) -> bool {
        match self {
            Classifier::ByKind => node.kind() == NodeKind::Junction,
            Classifier::ByNamePrefix { junctions, .. } => has_prefix(&node.name, junctions),
        }
    }
}

fn has_prefix(name: &str, prefixes: &[String]) -> bool {
    let lower = name.to_ascii_lowercase();
    prefixes
        .iter()
        .any(|p| lower.starts_with(&p.to_ascii_lowercase()))
}

/// A mapped source: its first downstream junction and the link that joins them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub junction: NodeId,
    pub link: LinkId,
}

/// Source to first-downstream-junction map.
///
/// Sources without an adjacent junction have no entry and are listed in
/// [`SourceJunctionMap::gaps`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceJunctionMap {
    entries: BTreeMap<NodeId, MapEntry>,
    gaps: Vec<NodeId>,
}

impl SourceJunctionMap {
    pub fn get(&self, source: NodeId) -> Option<NodeId> {
        self.entries.get(&source).map(|e| e.junction)
    }

    pub fn link_for(&self, source: NodeId) -> Option<LinkId> {
        self.entries.get(&source).map(|e| e.link)
    }

    /// Entries ordered by source id (declaration order).
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.entries.iter().map(|(&s, e)| (s, e.junction))
    }

    /// Sources with no inferable downstream junction, in declaration order.
    pub fn gaps(&self) -> &[NodeId] {
        &self.gaps
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sources whose mapped junction is one of `junctions`.
    pub fn sources_feeding<'a>(
        &'a self,
        junctions: &'a [NodeId],
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.entries
            .iter()
            .filter(move |(_, e)| junctions.contains(&e.junction))
            .map(|(&s, _)| s)
    }
}

/// Infer, for every source, the junction at the other end of the first link
/// that joins them.
pub fn infer_source_junction_map(network: &Network, classifier: &Classifier) -> SourceJunctionMap {
    let mut entries: BTreeMap<NodeId, MapEntry> = BTreeMap::new();

    for link in network.links() {
        let (Some(a), Some(b)) = (network.node(link.from), network.node(link.to)) else {
            continue;
        };
        let pair = match (
            classifier.is_source(a) && classifier.is_junction(b),
            classifier.is_source(b) && classifier.is_junction(a),
        ) {
            (true, false) => Some((a.id, b.id)),
            (false, true) => Some((b.id, a.id)),
            _ => None,
        };
        if let Some((source, junction)) = pair {
            entries.entry(source).or_insert(MapEntry {
                junction,
                link: link.id,
            });
        }
    }

    let gaps: Vec<NodeId> = network
        .nodes()
        .iter()
        .filter(|n| classifier.is_source(n) && !entries.contains_key(&n.id))
        .map(|n| n.id)
        .collect();
    for &gap in &gaps {
        if let Some(node) = network.node(gap) {
            warn!(source = %node.name, "no downstream junction for source");
        }
    }
    debug!(mapped = entries.len(), gaps = gaps.len(), "inferred source-junction map");

    SourceJunctionMap { entries, gaps }
}
