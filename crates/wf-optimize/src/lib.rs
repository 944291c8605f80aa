//! Population search over bounded decision vectors.
//!
//! [`GeneticSearch`] evolves a fixed-size population with elitist top-K
//! selection, single-point crossover and bounded integer mutation, scoring
//! candidates through any [`FitnessFn`]. [`HydraulicSizing`] is a fitness
//! function that sizes pipes and scores them with a hydraulic evaluator.
//!
//! ```
//! use wf_optimize::{Fitness, GeneticSearch, SearchConfig};
//!
//! let config = SearchConfig {
//!     generations: 5,
//!     seed: Some(7),
//!     ..SearchConfig::default()
//! };
//! let mut search = GeneticSearch::new(config, |g: &[f64]| Fitness::new(g.iter().sum())).unwrap();
//! let outcome = search.run().unwrap();
//! assert!(outcome.best_history.windows(2).all(|w| w[1] <= w[0]));
//! ```

pub mod config;
pub mod error;
pub mod fitness;
pub mod operators;
pub mod search;
pub mod sizing;
pub mod space;

pub use config::SearchConfig;
pub use error::{SearchError, SearchResult};
pub use fitness::{Candidate, Fitness, FitnessFn};
pub use operators::{mutate, random_cut, single_point_crossover};
pub use search::{GenerationStats, GeneticSearch, SearchOutcome, StopReason};
pub use sizing::{HydraulicSizing, SizingConfig};
pub use space::{BoundaryPolicy, GeneBounds, GeneKind, SearchSpace};
