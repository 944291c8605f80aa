//! One-shot network adjustments: target heads from junction elevations and
//! demand scaling.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wf_core::{NodeId, Real, m};
use wf_network::{Network, NodeData, SourceJunctionMap};

use crate::error::{CalibrationError, CalibrationResult};

/// Outcome of [`assign_target_heads`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadAssignment {
    /// `(source, junction, new head in m)` for every source that was set.
    pub assigned: Vec<(String, String, Real)>,
    /// Sources left unchanged: no mapped junction, or not a fixed-head node.
    pub unmapped: Vec<String>,
}

/// Set each mapped source's head to its downstream junction's elevation plus
/// `target_pressure_m`.
pub fn assign_target_heads(
    network: &mut Network,
    map: &SourceJunctionMap,
    target_pressure_m: Real,
) -> CalibrationResult<HeadAssignment> {
    if !target_pressure_m.is_finite() {
        return Err(CalibrationError::InvalidArg {
            what: "target pressure must be finite",
        });
    }
    let mut out = HeadAssignment::default();
    let pairs: Vec<(NodeId, NodeId)> = map.iter().collect();

    for (source, junction) in pairs {
        let (Some(s), Some(j)) = (network.node(source), network.node(junction)) else {
            continue;
        };
        let (source_name, junction_name) = (s.name.clone(), j.name.clone());
        let new_head = j.elevation().value + target_pressure_m;
        if network.source_head(source).is_none() {
            warn!(source = %source_name, "mapped node is not a source; head not set");
            out.unmapped.push(source_name);
            continue;
        }
        network.set_source_head(source, m(new_head))?;
        info!(source = %source_name, junction = %junction_name, head = new_head, "assigned target head");
        out.assigned.push((source_name, junction_name, new_head));
    }
    for &gap in map.gaps() {
        if let Some(node) = network.node(gap) {
            out.unmapped.push(node.name.clone());
        }
    }
    Ok(out)
}

/// Multiply every positive junction demand by `factor`. Returns how many
/// demand entries were scaled.
pub fn scale_demands(network: &mut Network, factor: Real) -> CalibrationResult<usize> {
    if !(factor.is_finite() && factor > 0.0) {
        return Err(CalibrationError::InvalidArg {
            what: "demand scale factor must be positive",
        });
    }
    let ids: Vec<NodeId> = network.junctions().map(|n| n.id).collect();
    let mut scaled = 0;
    for id in ids {
        if let Some(NodeData::Junction { demands, .. }) = network.node_data_mut(id) {
            for demand in demands.iter_mut().filter(|d| d.base.value > 0.0) {
                demand.base = demand.base * factor;
                scaled += 1;
            }
        }
    }
    info!(scaled, factor, "scaled junction demands");
    Ok(scaled)
}
