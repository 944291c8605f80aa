//! Calibration run state and its report.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use wf_core::Real;

/// Terminal outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// Minimum junction pressure met the target.
    Feasible,
    /// The iteration budget ran out while still infeasible.
    Exhausted,
}

/// One evaluate-and-adjust cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based.
    pub iteration: usize,
    /// `None` when the evaluation diverged.
    pub min_pressure: Option<Real>,
    /// Head increment applied after this evaluation (0 when none was).
    pub step_m: Real,
    /// Sources raised after this evaluation.
    pub adjusted: Vec<String>,
}

impl IterationRecord {
    pub fn diverged(&self) -> bool {
        self.min_pressure.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    pub target_pressure_m: Real,
    /// Total head added per source (m), keyed by source identifier.
    pub offsets: BTreeMap<String, Real>,
    /// Last minimum junction pressure that was actually observed.
    pub last_min_pressure: Option<Real>,
    pub iterations: usize,
    pub status: CalibrationStatus,
    pub divergences: usize,
    pub history: Vec<IterationRecord>,
}

impl CalibrationState {
    pub(crate) fn new(target_pressure_m: Real) -> Self {
        Self {
            target_pressure_m,
            offsets: BTreeMap::new(),
            last_min_pressure: None,
            iterations: 0,
            status: CalibrationStatus::Exhausted,
            divergences: 0,
            history: Vec::new(),
        }
    }

    pub fn is_feasible(&self) -> bool {
        self.status == CalibrationStatus::Feasible
    }

    /// Human-readable outcome. Never reports success for an exhausted run.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        match (self.status, self.last_min_pressure) {
            (CalibrationStatus::Feasible, Some(p)) => {
                let _ = write!(
                    out,
                    "Feasible after {} iteration(s): minimum pressure {:.3} m meets target {:.3} m",
                    self.iterations, p, self.target_pressure_m
                );
            }
            (CalibrationStatus::Feasible, None) => {
                let _ = write!(
                    out,
                    "Feasible after {} iteration(s): no junctions to check",
                    self.iterations
                );
            }
            (CalibrationStatus::Exhausted, Some(p)) => {
                let _ = write!(
                    out,
                    "NOT feasible: budget of {} iteration(s) exhausted; last minimum pressure {:.3} m is below target {:.3} m",
                    self.iterations, p, self.target_pressure_m
                );
            }
            (CalibrationStatus::Exhausted, None) => {
                let _ = write!(
                    out,
                    "NOT feasible: budget of {} iteration(s) exhausted; the solver diverged on every iteration",
                    self.iterations
                );
            }
        }
        if self.divergences > 0 {
            let _ = write!(out, " ({} diverged evaluation(s))", self.divergences);
        }
        let raised: Vec<String> = self
            .offsets
            .iter()
            .filter(|(_, v)| **v > 0.0)
            .map(|(k, v)| format!("{k} +{v:.3} m"))
            .collect();
        if !raised.is_empty() {
            let _ = write!(out, "; raised {}", raised.join(", "));
        }
        out
    }
}
