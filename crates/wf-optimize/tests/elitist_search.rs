use wf_core::{Real, lps, m, mm};
use wf_network::NetworkBuilder;
use wf_optimize::{
    Fitness, GeneKind, GeneticSearch, HydraulicSizing, SearchConfig, SearchSpace, SizingConfig,
    StopReason,
};
use wf_solver::{GradientSolver, TimeoutEvaluator};

fn sum_cost(genes: &[Real]) -> Fitness {
    Fitness::new(genes.iter().sum())
}

#[test]
fn without_mutation_best_is_built_from_initial_elite_pair() {
    let config = SearchConfig {
        population_size: 8,
        generations: 5,
        mutation_rate: 0.0,
        seed: Some(2024),
        ..SearchConfig::default()
    };
    let mut search = GeneticSearch::new(config.clone(), sum_cost).unwrap();
    search.initialize();

    // Initial elite pair, ties broken by population order.
    let mut initial: Vec<Vec<Real>> = search.population().iter().map(|c| c.genes.clone()).collect();
    initial.sort_by(|a, b| a.iter().sum::<Real>().total_cmp(&b.iter().sum::<Real>()));
    let (a, b) = (initial[0].clone(), initial[1].clone());

    let mut best_ever = Vec::new();
    for _ in 0..config.generations {
        best_ever.push(search.step().best_ever_cost);
    }
    assert!(best_ever[4] <= best_ever[0]);
    assert!(best_ever.windows(2).all(|w| w[1] <= w[0]));

    let best = search.best().unwrap();
    assert!(best.cost() <= a.iter().sum::<Real>().min(b.iter().sum()));
    for (i, g) in best.genes.iter().enumerate() {
        assert!(*g == a[i] || *g == b[i], "gene {i} = {g} not from the elite pair");
    }
    let floor: Real = a.iter().zip(&b).map(|(x, y)| x.min(*y)).sum();
    assert!(best.cost() >= floor);
}

#[test]
fn run_is_reproducible_and_bounded() {
    let config = SearchConfig {
        mutation_span: 40,
        space: SearchSpace::uniform(6, 100.0, 120.0, GeneKind::Integer),
        seed: Some(99),
        ..SearchConfig::default()
    };
    let first = GeneticSearch::new(config.clone(), sum_cost).unwrap().run().unwrap();
    let second = GeneticSearch::new(config.clone(), sum_cost).unwrap().run().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.stop_reason, StopReason::Completed);
    assert!(config.space.contains(&first.best.genes));
    assert_eq!(first.best_history.len(), 20);
}

#[test]
fn sizing_search_prefers_smallest_adequate_pipes() {
    let mut b = NetworkBuilder::new();
    let r = b.add_source("R1", m(60.0));
    let j1 = b.add_junction("J1", m(10.0), lps(4.0));
    let j2 = b.add_junction("J2", m(12.0), lps(3.0));
    let j3 = b.add_junction("J3", m(8.0), lps(3.0));
    b.add_pipe("P1", r, j1, m(400.0), mm(150.0), 130.0);
    b.add_pipe("P2", j1, j2, m(300.0), mm(150.0), 130.0);
    b.add_pipe("P3", j1, j3, m(300.0), mm(150.0), 130.0);
    let network = b.build().unwrap();

    let evaluator = TimeoutEvaluator::new(GradientSolver::default(), std::time::Duration::from_secs(10));
    let sizing = HydraulicSizing::new(
        network,
        evaluator,
        SizingConfig {
            target_pressure_m: 10.0,
            ..SizingConfig::default()
        },
    )
    .unwrap();
    let config = SearchConfig {
        generations: 10,
        seed: Some(3),
        ..SearchConfig::default()
    }
    .with_space(sizing.search_space());

    let outcome = GeneticSearch::new(config, sizing).unwrap().run().unwrap();
    let fitness = outcome.best.fitness.as_ref().unwrap();
    assert!(!fitness.is_diverged());
    assert_eq!(fitness.diagnostics["pressure_deficit_m"], 0.0);
    assert!((fitness.diagnostics["total_demand_lps"] - 10.0).abs() < 1e-6);
    assert!(outcome.best_history.windows(2).all(|w| w[1] <= w[0]));
}
