//! Calibration configuration: step size, source targeting and limits.

use serde::{Deserialize, Serialize};
use wf_core::Real;
use wf_solver::TimeSelector;

use crate::error::{CalibrationError, CalibrationResult};

/// How far source heads move on an infeasible iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepPolicy {
    /// Constant increment (m) per iteration.
    Fixed { step_m: Real },
    /// `gain * shortfall`, never less than `min_step_m`.
    Proportional { gain: Real, min_step_m: Real },
}

impl Default for StepPolicy {
    fn default() -> Self {
        StepPolicy::Proportional {
            gain: 1.0,
            min_step_m: 0.01,
        }
    }
}

impl StepPolicy {
    pub fn validate(&self) -> CalibrationResult<()> {
        match *self {
            StepPolicy::Fixed { step_m } => {
                if !(step_m.is_finite() && step_m > 0.0) {
                    return Err(CalibrationError::InvalidArg {
                        what: "fixed step must be positive",
                    });
                }
            }
            StepPolicy::Proportional { gain, min_step_m } => {
                if !(gain > 0.0 && gain <= 1.0) {
                    return Err(CalibrationError::InvalidArg {
                        what: "proportional gain must be in (0, 1]",
                    });
                }
                if !(min_step_m.is_finite() && min_step_m > 0.0) {
                    return Err(CalibrationError::InvalidArg {
                        what: "minimum step must be positive",
                    });
                }
            }
        }
        Ok(())
    }

    /// Head increment for a pressure shortfall (m). Always positive.
    pub fn step(&self, shortfall: Real) -> Real {
        match *self {
            StepPolicy::Fixed { step_m } => step_m,
            StepPolicy::Proportional { gain, min_step_m } => (gain * shortfall.abs()).max(min_step_m),
        }
    }
}

/// Which sources an adjustment touches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Targeting {
    /// Every source.
    #[default]
    Uniform,
    /// Only sources whose mapped junction is among the `count` lowest-pressure junctions.
    LowestPressure { count: usize },
}

/// Calibration run parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Required minimum junction pressure (m).
    pub target_pressure_m: Real,
    /// Evaluation budget.
    pub max_iterations: usize,
    pub step: StepPolicy,
    pub targeting: Targeting,
    /// Multiplier applied to every pump head curve on each adjusting iteration.
    pub pump_gain: Option<Real>,
    /// Uniform head increment (m) after a diverged evaluation.
    pub divergence_step_m: Real,
    /// Time step whose pressures are judged.
    pub selector: TimeSelector,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            target_pressure_m: 0.0,
            max_iterations: 15,
            step: StepPolicy::default(),
            targeting: Targeting::default(),
            pump_gain: None,
            divergence_step_m: 10.0,
            selector: TimeSelector::PeakDemand,
        }
    }
}

impl CalibrationConfig {
    /// Default configuration with the given target and budget.
    pub fn new(target_pressure_m: Real, max_iterations: usize) -> Self {
        Self {
            target_pressure_m,
            max_iterations,
            ..Self::default()
        }
    }

    pub fn with_step(mut self, step: StepPolicy) -> Self {
        self.step = step;
        self
    }

    pub fn with_targeting(mut self, targeting: Targeting) -> Self {
        self.targeting = targeting;
        self
    }

    pub fn with_pump_gain(mut self, gain: Real) -> Self {
        self.pump_gain = Some(gain);
        self
    }

    pub fn validate(&self) -> CalibrationResult<()> {
        if !self.target_pressure_m.is_finite() {
            return Err(CalibrationError::InvalidArg {
                what: "target pressure must be finite",
            });
        }
        if self.max_iterations == 0 {
            return Err(CalibrationError::InvalidArg {
                what: "max_iterations must be positive",
            });
        }
        if !(self.divergence_step_m.is_finite() && self.divergence_step_m > 0.0) {
            return Err(CalibrationError::InvalidArg {
                what: "divergence step must be positive",
            });
        }
        if let Some(gain) = self.pump_gain {
            if !(gain.is_finite() && gain >= 1.0) {
                return Err(CalibrationError::InvalidArg {
                    what: "pump gain must be at least 1",
                });
            }
        }
        if let Targeting::LowestPressure { count: 0 } = self.targeting {
            return Err(CalibrationError::InvalidArg {
                what: "lowest-pressure targeting needs a positive count",
            });
        }
        self.step.validate()
    }
}
