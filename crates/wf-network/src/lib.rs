//! wf-network: network model layer for waterflow.
//!
//! Provides:
//! - Lossless line model of the section-delimited network description
//! - Parser that skips and reports malformed lines
//! - Network data structures and an incremental builder with validation
//! - Source to downstream-junction mapping and connectivity checks
//! - Writer that rewrites only the tuned fields of the original description
//!
//! # Example
//!
//! ```
//! use wf_network::{Classifier, infer_source_junction_map, parse_network};
//!
//! let text = "[JUNCTIONS]\nJ1 100 5\n[RESERVOIRS]\nR1 120\n[PIPES]\nP1 R1 J1 100 200 130\n";
//! let parsed = parse_network(text).unwrap();
//! let map = infer_source_junction_map(&parsed.network, &Classifier::ByKind);
//!
//! let r1 = parsed.network.node_id("R1").unwrap();
//! assert_eq!(map.get(r1), parsed.network.node_id("J1"));
//! assert!(parsed.report.is_empty());
//! ```

pub mod builder;
pub mod connectivity;
pub mod document;
pub mod error;
pub mod model;
pub mod options;
pub mod parse;
pub mod topology;
pub(crate) mod validate;
pub mod writer;

// Re-exports for ergonomics
pub use builder::NetworkBuilder;
pub use connectivity::disconnected_junctions;
pub use document::InpDocument;
pub use error::{NetworkError, NetworkResult};
pub use model::{
    Curve, CurvePoint, Demand, Link, LinkData, LinkKind, LinkStatus, Network, Node, NodeData,
    NodeKind, Pattern, PumpDrive, ValveType,
};
pub use options::{FlowUnits, HeadlossModel, Options, Times};
pub use parse::{DefectKind, ParseDefect, ParseReport, ParsedNetwork, parse_network, read_network};
pub use topology::{Classifier, MapEntry, SourceJunctionMap, infer_source_junction_map};
pub use writer::{FieldChange, WriteOutcome, format_value};
