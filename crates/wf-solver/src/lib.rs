//! Hydraulic evaluation for water distribution networks.
//!
//! The [`Evaluator`] trait is the only thing calibration and search depend
//! on. [`GradientSolver`] is the built-in implementation: an extended-period
//! global gradient solver over junction heads and link flows.

pub mod error;
pub mod evaluator;
pub mod gradient;
pub mod hydraulics;
pub mod result;

pub use error::{SolverError, SolverResult};
pub use evaluator::{Evaluator, TimeoutEvaluator, evaluate_at};
pub use gradient::{GradientSolver, SolverOptions};
pub use hydraulics::fit_head_curve;
pub use result::{LinkState, NodeState, SimulationResult, Snapshot, TimeSelector};
