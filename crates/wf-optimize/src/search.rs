//! Generational genetic search with an elite parent pool.

use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use wf_core::Real;

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::fitness::{Candidate, FitnessFn};
use crate::operators::{mutate, random_cut, single_point_crossover};

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// All configured generations were evaluated.
    Completed,
    /// The cancellation handle was set.
    Cancelled,
}

/// Summary of one evaluated generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// 1-based.
    pub generation: usize,
    pub best_cost: Real,
    pub mean_cost: Real,
    pub best_ever_cost: Real,
}

/// Result of [`GeneticSearch::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// Lowest-cost candidate seen in any generation.
    pub best: Candidate,
    /// Generation (1-based) in which `best` was first seen.
    pub best_generation: usize,
    /// Best-ever cost after each generation. Non-increasing.
    pub best_history: Vec<Real>,
    /// Best cost within each generation.
    pub generation_best: Vec<Real>,
    pub generations_run: usize,
    pub evaluations: usize,
    pub stop_reason: StopReason,
    /// Whether the best-ever cost dropped after the first generation.
    pub improved: bool,
}

impl SearchOutcome {
    pub fn best_cost(&self) -> Real {
        self.best.cost()
    }

    /// Human-readable outcome. Reports "no improvement" when the first
    /// generation's best was never beaten.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "Best cost {:.3} from generation {} after {} generation(s), {} evaluation(s)",
            self.best_cost(),
            self.best_generation,
            self.generations_run,
            self.evaluations
        );
        match self.best_history.first() {
            Some(first) if self.improved => {
                let _ = write!(out, "; improved from {first:.3}");
            }
            _ => out.push_str("; no improvement over the initial population"),
        }
        if self.stop_reason == StopReason::Cancelled {
            out.push_str(" (cancelled)");
        }
        if self.best.fitness.as_ref().is_some_and(|f| f.is_diverged()) {
            out.push_str("; every evaluation diverged");
        }
        out
    }
}

/// Genetic search over a bounded vector space.
///
/// Each generation is evaluated, the top-K candidates by cost (stable order)
/// become the parent pool, and the next population is refilled by repeated
/// single-point crossover of that pool followed by per-gene mutation and the
/// boundary policy. The best candidate ever evaluated is kept apart from the
/// population.
pub struct GeneticSearch<F> {
    config: SearchConfig,
    fitness: F,
    rng: StdRng,
    population: Vec<Candidate>,
    generation: usize,
    best: Option<(Candidate, usize)>,
    best_history: Vec<Real>,
    generation_best: Vec<Real>,
    evaluations: usize,
    cancelled: Arc<AtomicBool>,
}

impl<F: FitnessFn> GeneticSearch<F> {
    pub fn new(config: SearchConfig, fitness: F) -> SearchResult<Self> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        Ok(Self {
            config,
            fitness,
            rng: StdRng::seed_from_u64(seed),
            population: Vec::new(),
            generation: 0,
            best: None,
            best_history: Vec::new(),
            generation_best: Vec::new(),
            evaluations: 0,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn fitness(&self) -> &F {
        &self.fitness
    }

    /// Cooperative cancellation, checked once per generation by [`run`](Self::run).
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Draw a fresh generation-0 population and forget previous progress.
    pub fn initialize(&mut self) {
        self.population.clear();
        self.generation = 0;
        self.best = None;
        self.best_history.clear();
        self.generation_best.clear();
        self.evaluations = 0;
        for _ in 0..self.config.population_size {
            let genes = self.config.space.sample(&mut self.rng);
            self.population.push(Candidate::new(genes));
        }
    }

    pub fn population(&self) -> &[Candidate] {
        &self.population
    }

    /// Number of generations evaluated so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn best(&self) -> Option<&Candidate> {
        self.best.as_ref().map(|(c, _)| c)
    }

    /// Evaluate the current population and breed the next one.
    pub fn step(&mut self) -> GenerationStats {
        if self.population.is_empty() {
            self.initialize();
        }
        let stats = self.evaluate_generation();
        self.breed();
        stats
    }

    /// Run the configured number of generations from a fresh population.
    pub fn run(&mut self) -> SearchResult<SearchOutcome> {
        self.initialize();
        let mut stop_reason = StopReason::Completed;
        for g in 0..self.config.generations {
            if self.cancelled.load(Ordering::Relaxed) {
                info!(generation = self.generation, "search cancelled");
                stop_reason = StopReason::Cancelled;
                break;
            }
            self.evaluate_generation();
            if g + 1 < self.config.generations {
                self.breed();
            }
        }
        self.outcome(stop_reason)
    }

    fn outcome(&self, stop_reason: StopReason) -> SearchResult<SearchOutcome> {
        let Some((best, best_generation)) = self.best.clone() else {
            return Err(SearchError::Cancelled);
        };
        let improved = match (self.best_history.first(), self.best_history.last()) {
            (Some(first), Some(last)) => last < first,
            _ => false,
        };
        info!(
            best_cost = best.cost(),
            best_generation,
            generations = self.generation,
            improved,
            "search finished"
        );
        Ok(SearchOutcome {
            best,
            best_generation,
            best_history: self.best_history.clone(),
            generation_best: self.generation_best.clone(),
            generations_run: self.generation,
            evaluations: self.evaluations,
            stop_reason,
            improved,
        })
    }

    fn evaluate_generation(&mut self) -> GenerationStats {
        let fitness = &self.fitness;
        let pending = self.population.iter().filter(|c| !c.is_evaluated()).count();
        if self.config.parallel {
            self.population
                .par_iter_mut()
                .filter(|c| !c.is_evaluated())
                .for_each(|c| c.fitness = Some(fitness.evaluate(&c.genes)));
        } else {
            for c in self.population.iter_mut().filter(|c| !c.is_evaluated()) {
                c.fitness = Some(fitness.evaluate(&c.genes));
            }
        }
        self.evaluations += pending;
        self.generation += 1;

        // First minimum in population order.
        let mut best_idx = 0;
        for (i, c) in self.population.iter().enumerate() {
            if c.cost() < self.population[best_idx].cost() {
                best_idx = i;
            }
        }
        let best_cost = self.population[best_idx].cost();
        let improved = self.best.as_ref().is_none_or(|(b, _)| best_cost < b.cost());
        if improved {
            self.best = Some((self.population[best_idx].clone(), self.generation));
        }
        let best_ever_cost = self.best.as_ref().map_or(best_cost, |(b, _)| b.cost());
        let mean_cost =
            self.population.iter().map(Candidate::cost).sum::<Real>() / self.population.len() as Real;

        self.generation_best.push(best_cost);
        self.best_history.push(best_ever_cost);
        info!(
            generation = self.generation,
            best_cost, best_ever_cost, mean_cost, "generation evaluated"
        );
        GenerationStats {
            generation: self.generation,
            best_cost,
            mean_cost,
            best_ever_cost,
        }
    }

    /// Replace the population with children of its top-K members.
    fn breed(&mut self) {
        let k = self.config.parents;
        let mut ranked: Vec<&Candidate> = self.population.iter().collect();
        // Stable: equal costs keep population order.
        ranked.sort_by(|a, b| a.cost().total_cmp(&b.cost()));
        let parents: Vec<Vec<Real>> = ranked.iter().take(k).map(|c| c.genes.clone()).collect();

        let size = self.config.population_size;
        let mut next = Vec::with_capacity(size + 1);
        let mut mating = 0;
        while next.len() < size {
            let a = &parents[(2 * mating) % k];
            let b = &parents[(2 * mating + 1) % k];
            let cut = random_cut(a.len(), &mut self.rng);
            let (c1, c2) = single_point_crossover(a, b, cut);
            for mut genes in [c1, c2] {
                mutate(
                    &mut genes,
                    self.config.mutation_rate,
                    self.config.mutation_span,
                    &mut self.rng,
                );
                self.config.space.enforce(&mut genes, self.config.boundary);
                next.push(Candidate::new(genes));
            }
            mating += 1;
        }
        next.truncate(size);
        debug!(generation = self.generation, matings = mating, "bred next population");
        self.population = next;
    }
}
