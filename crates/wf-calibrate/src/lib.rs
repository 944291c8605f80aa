//! Feedback calibration of source heads.
//!
//! [`calibrate`] evaluates the network, compares the minimum junction
//! pressure with a target and raises source heads until the target is met or
//! the iteration budget runs out. [`assign_target_heads`] and
//! [`scale_demands`] are one-shot adjustments used before or instead of the
//! loop.

pub mod calibrate;
pub mod error;
pub mod heads;
pub mod policy;
pub mod state;

pub use calibrate::{calibrate, scale_pump_curves};
pub use error::{CalibrationError, CalibrationResult};
pub use heads::{HeadAssignment, assign_target_heads, scale_demands};
pub use policy::{CalibrationConfig, StepPolicy, Targeting};
pub use state::{CalibrationState, CalibrationStatus, IterationRecord};
