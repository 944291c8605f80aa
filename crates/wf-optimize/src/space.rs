//! Decision-variable bounds and the policy that keeps genes inside them.

use rand::Rng;
use serde::{Deserialize, Serialize};
use wf_core::Real;

use crate::error::{SearchError, SearchResult};

/// Value domain of one gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneKind {
    /// Whole numbers only.
    #[default]
    Integer,
    Real,
}

/// What happens to a gene that mutation pushed outside its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Snap to the nearest bound.
    #[default]
    Clamp,
    /// Mirror the overshoot back into the range.
    Reflect,
}

/// Inclusive range of one gene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneBounds {
    pub min: Real,
    pub max: Real,
    #[serde(default)]
    pub kind: GeneKind,
}

impl GeneBounds {
    pub fn new(min: Real, max: Real, kind: GeneKind) -> Self {
        Self { min, max, kind }
    }

    fn validate(&self) -> SearchResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) {
            return Err(SearchError::InvalidArg {
                what: "gene bounds must be finite",
            });
        }
        let (lo, hi) = self.effective();
        if lo > hi {
            return Err(SearchError::InvalidArg {
                what: "gene bounds are empty",
            });
        }
        Ok(())
    }

    /// Bounds actually reachable for this kind.
    fn effective(&self) -> (Real, Real) {
        match self.kind {
            GeneKind::Integer => (self.min.ceil(), self.max.floor()),
            GeneKind::Real => (self.min, self.max),
        }
    }

    /// Uniform draw from the range.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        let (lo, hi) = self.effective();
        match self.kind {
            GeneKind::Integer => rng.gen_range(lo as i64..=hi as i64) as Real,
            GeneKind::Real => rng.gen_range(lo..=hi),
        }
    }

    pub fn contains(&self, value: Real) -> bool {
        let (lo, hi) = self.effective();
        value >= lo && value <= hi
    }

    /// Bring `value` back inside the range under `policy`.
    pub fn apply(&self, value: Real, policy: BoundaryPolicy) -> Real {
        let (lo, hi) = self.effective();
        let value = match self.kind {
            GeneKind::Integer => value.round(),
            GeneKind::Real => value,
        };
        let inside = match policy {
            BoundaryPolicy::Clamp => value,
            BoundaryPolicy::Reflect => {
                if value > hi {
                    hi - (value - hi)
                } else if value < lo {
                    lo + (lo - value)
                } else {
                    value
                }
            }
        };
        // A reflection larger than the range width can still land outside.
        inside.clamp(lo, hi)
    }
}

/// Bounds for every position of a candidate vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    pub genes: Vec<GeneBounds>,
}

impl Default for SearchSpace {
    /// Ten integer genes in `[100, 200]`.
    fn default() -> Self {
        Self::uniform(10, 100.0, 200.0, GeneKind::Integer)
    }
}

impl SearchSpace {
    pub fn new(genes: Vec<GeneBounds>) -> Self {
        Self { genes }
    }

    /// `len` genes sharing one range.
    pub fn uniform(len: usize, min: Real, max: Real, kind: GeneKind) -> Self {
        Self {
            genes: vec![GeneBounds::new(min, max, kind); len],
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.genes.is_empty() {
            return Err(SearchError::InvalidArg {
                what: "search space has no genes",
            });
        }
        self.genes.iter().try_for_each(GeneBounds::validate)
    }

    /// A fresh candidate vector, each gene drawn independently.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Real> {
        self.genes.iter().map(|b| b.sample(rng)).collect()
    }

    /// Apply the boundary policy to every gene in place.
    pub fn enforce(&self, genes: &mut [Real], policy: BoundaryPolicy) {
        for (value, bounds) in genes.iter_mut().zip(&self.genes) {
            *value = bounds.apply(*value, policy);
        }
    }

    pub fn contains(&self, genes: &[Real]) -> bool {
        genes.len() == self.genes.len() && genes.iter().zip(&self.genes).all(|(v, b)| b.contains(*v))
    }
}
