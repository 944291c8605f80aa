//! wf-core: stable foundation for waterflow.
//!
//! Contains:
//! - units (uom SI types + constructors for heads, lengths and flows)
//! - numeric (Real + tolerances + float helpers)
//! - ids (compact IDs for network nodes and links)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{WfError, WfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
