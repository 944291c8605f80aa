//! Network validation logic.

use std::collections::HashSet;

use crate::error::{NetworkError, NetworkResult};
use crate::model::{Curve, Link, LinkData, Node, PumpDrive};

/// Validate the network structure: names are unique, every link endpoint
/// exists, and every pump curve is defined.
pub(crate) fn validate_structure(
    nodes: &[Node],
    links: &[Link],
    curves: &[Curve],
) -> NetworkResult<()> {
    // Check that IDs are contiguous and match their indices
    for (i, node) in nodes.iter().enumerate() {
        if node.id.slot() != i {
            return Err(NetworkError::StructureMismatch {
                what: "node ids are not contiguous",
            });
        }
    }
    for (i, link) in links.iter().enumerate() {
        if link.id.slot() != i {
            return Err(NetworkError::StructureMismatch {
                what: "link ids are not contiguous",
            });
        }
    }

    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.name.as_str()) {
            return Err(NetworkError::DuplicateName {
                what: "node",
                name: node.name.clone(),
            });
        }
    }

    let mut seen = HashSet::new();
    for link in links {
        if !seen.insert(link.name.as_str()) {
            return Err(NetworkError::DuplicateName {
                what: "link",
                name: link.name.clone(),
            });
        }
    }

    // Every link must reference existing, distinct nodes
    for link in links {
        for endpoint in [link.from, link.to] {
            if endpoint.slot() >= nodes.len() {
                return Err(NetworkError::InvalidEndpoint {
                    link: link.id,
                    node: endpoint,
                });
            }
        }
        if link.from == link.to {
            return Err(NetworkError::SelfLoop { link: link.id });
        }
    }

    for link in links {
        if let LinkData::Pump {
            drive: PumpDrive::Head { curve },
        } = &link.data
        {
            if !curves.iter().any(|c| &c.name == curve) {
                return Err(NetworkError::UnknownCurve {
                    link: link.name.clone(),
                    curve: curve.clone(),
                });
            }
        }
    }

    Ok(())
}
