//! Reachability of junctions from supply nodes.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::Dfs;
use wf_core::NodeId;

use crate::model::{Network, NodeKind};

/// Undirected view of the network, one graph node per network node, closed links included.
fn undirected(network: &Network) -> UnGraph<NodeId, ()> {
    let mut graph = UnGraph::with_capacity(network.nodes().len(), network.links().len());
    for node in network.nodes() {
        graph.add_node(node.id);
    }
    for link in network.links() {
        graph.add_edge(
            NodeIndex::new(link.from.slot()),
            NodeIndex::new(link.to.slot()),
            (),
        );
    }
    graph
}

/// Junctions that share no connected component with any source or tank.
pub fn disconnected_junctions(network: &Network) -> Vec<NodeId> {
    let graph = undirected(network);
    let mut reached = vec![false; network.nodes().len()];

    let mut supplies = network
        .nodes()
        .iter()
        .filter(|n| matches!(n.kind(), NodeKind::Source | NodeKind::Tank))
        .map(|n| NodeIndex::new(n.id.slot()));

    if let Some(first) = supplies.next() {
        let mut dfs = Dfs::new(&graph, first);
        for start in std::iter::once(first).chain(supplies) {
            if reached[start.index()] {
                continue;
            }
            dfs.move_to(start);
            while let Some(ix) = dfs.next(&graph) {
                reached[ix.index()] = true;
            }
        }
    }

    network
        .junctions()
        .filter(|n| !reached[n.id.slot()])
        .map(|n| n.id)
        .collect()
}
