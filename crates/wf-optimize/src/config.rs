//! Search run parameters.

use serde::{Deserialize, Serialize};
use wf_core::Real;

use crate::error::{SearchError, SearchResult};
use crate::space::{BoundaryPolicy, SearchSpace};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub population_size: usize,
    /// Number of evaluated generations.
    pub generations: usize,
    /// Per-gene mutation probability.
    pub mutation_rate: Real,
    /// Mutation adds an integer in `[-mutation_span, mutation_span]`.
    pub mutation_span: u32,
    /// Elite parents kept for breeding (K).
    pub parents: usize,
    pub boundary: BoundaryPolicy,
    pub space: SearchSpace,
    /// Fixed seed for reproducible runs; random when absent.
    pub seed: Option<u64>,
    /// Evaluate candidates of one generation on the rayon pool.
    pub parallel: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            population_size: 8,
            generations: 20,
            mutation_rate: 0.2,
            mutation_span: 10,
            parents: 2,
            boundary: BoundaryPolicy::Clamp,
            space: SearchSpace::default(),
            seed: None,
            parallel: true,
        }
    }
}

impl SearchConfig {
    pub fn with_space(mut self, space: SearchSpace) -> Self {
        self.space = space;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.parents < 2 {
            return Err(SearchError::InvalidArg {
                what: "at least two parents are needed for crossover",
            });
        }
        if self.population_size < self.parents {
            return Err(SearchError::InvalidArg {
                what: "population must be at least as large as the parent pool",
            });
        }
        if self.generations == 0 {
            return Err(SearchError::InvalidArg {
                what: "generations must be positive",
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(SearchError::InvalidArg {
                what: "mutation rate must be in [0, 1]",
            });
        }
        self.space.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = SearchConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.space.len(), 10);
    }

    #[test]
    fn rejects_bad_values() {
        let bad = [
            SearchConfig {
                parents: 1,
                ..SearchConfig::default()
            },
            SearchConfig {
                population_size: 1,
                ..SearchConfig::default()
            },
            SearchConfig {
                mutation_rate: 1.5,
                ..SearchConfig::default()
            },
            SearchConfig {
                mutation_rate: Real::NAN,
                ..SearchConfig::default()
            },
            SearchConfig {
                generations: 0,
                ..SearchConfig::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{cfg:?}");
        }
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: SearchConfig =
            serde_json::from_str(r#"{"generations": 5, "seed": 42, "boundary": "reflect"}"#).unwrap();
        assert_eq!(cfg.generations, 5);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.boundary, BoundaryPolicy::Reflect);
        assert_eq!(cfg.population_size, 8);
    }
}
