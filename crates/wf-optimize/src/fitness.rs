//! Candidates, their scores and the fitness capability.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use wf_core::Real;

/// Score of one candidate. Lower cost is better; diagnostics are for
/// reporting and never take part in selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    pub cost: Real,
    #[serde(default)]
    pub diagnostics: BTreeMap<String, Real>,
}

impl Fitness {
    /// A NaN cost ranks as worst.
    pub fn new(cost: Real) -> Self {
        Self {
            cost: if cost.is_nan() { Real::INFINITY } else { cost },
            diagnostics: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: Real) -> Self {
        self.diagnostics.insert(name.into(), value);
        self
    }

    /// Worst-case score for an evaluation that failed.
    pub fn diverged() -> Self {
        Self::new(Real::INFINITY).with("diverged", 1.0)
    }

    pub fn is_diverged(&self) -> bool {
        self.diagnostics.get("diverged").is_some_and(|v| *v != 0.0)
    }
}

/// Scores a candidate vector.
///
/// Implementations run concurrently on distinct candidates and must not share
/// mutable state between calls. Failures are reported as
/// [`Fitness::diverged`], not as errors.
pub trait FitnessFn: Send + Sync {
    fn evaluate(&self, genes: &[Real]) -> Fitness;
}

impl<F> FitnessFn for F
where
    F: Fn(&[Real]) -> Fitness + Send + Sync,
{
    fn evaluate(&self, genes: &[Real]) -> Fitness {
        self(genes)
    }
}

/// One member of the population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub genes: Vec<Real>,
    /// `None` until evaluated; cleared whenever the genes change.
    pub fitness: Option<Fitness>,
}

impl Candidate {
    pub fn new(genes: Vec<Real>) -> Self {
        Self {
            genes,
            fitness: None,
        }
    }

    /// Ranking key; unevaluated candidates rank last.
    pub fn cost(&self) -> Real {
        self.fitness.as_ref().map_or(Real::INFINITY, |f| f.cost)
    }

    pub fn is_evaluated(&self) -> bool {
        self.fitness.is_some()
    }
}
