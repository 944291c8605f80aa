//! Integration test: parse a description and solve it.

use wf_network::parse_network;
use wf_solver::{Evaluator, GradientSolver, SolverOptions, TimeSelector, evaluate_at};

const LOOPED: &str = "\
[JUNCTIONS]
 J1   60    8    DAY
 J2   55    6    DAY
 J3   50    4    DAY
 J4   58    2

[RESERVOIRS]
 R1   95

[TANKS]
 T1   70   10   0   20   15

[PIPES]
 P1   R1   J1   900    300   130
 P2   J1   J2   600    200   130
 P3   J2   J3   500    150   120
 P4   J3   J4   700    150   120
 P5   J4   J1   650    200   130
 P6   T1   J4   300    150   130

[PATTERNS]
 DAY  0.6  1.3  1.0

[TIMES]
 Duration            2:00
 Hydraulic Timestep  1:00

[END]
";

#[test]
fn looped_network_over_horizon() {
    let parsed = parse_network(LOOPED).unwrap();
    assert!(parsed.report.is_empty());

    let solver = GradientSolver::default();
    let result = solver.evaluate(&parsed.network).unwrap();
    assert_eq!(result.times(), vec![0, 3_600, 7_200]);

    for snap in &result.steps {
        // Continuity at every junction
        for j in snap.junctions() {
            assert!((j.inflow - j.demand).abs() < 1e-5, "{} at {}", j.name, snap.time_s);
        }
        // Supply matches demand
        assert!((snap.total_supply() - snap.total_demand()).abs() < 1e-5);
        // Heads stay below the highest fixed head
        for j in snap.junctions() {
            assert!(j.head <= 95.0 + 1e-6);
        }
    }

    let peak = evaluate_at(&solver, &parsed.network, TimeSelector::PeakDemand).unwrap();
    assert_eq!(peak.time_s, 3_600);
    let quiet = evaluate_at(&solver, &parsed.network, TimeSelector::At { time_s: 0 }).unwrap();
    assert!(peak.min_junction_pressure().unwrap() < quiet.min_junction_pressure().unwrap());
}

#[test]
fn raising_source_head_raises_every_pressure() {
    let parsed = parse_network(LOOPED).unwrap();
    let solver = GradientSolver::new(SolverOptions::default());
    let before = evaluate_at(&solver, &parsed.network, TimeSelector::PeakDemand).unwrap();

    let mut raised = parsed.network.clone();
    let r1 = raised.node_id("R1").unwrap();
    raised.set_source_head(r1, wf_core::m(105.0)).unwrap();
    let after = evaluate_at(&solver, &raised, TimeSelector::PeakDemand).unwrap();

    for (a, b) in before.junctions().zip(after.junctions()) {
        assert!(b.pressure >= a.pressure - 1e-6, "{}", a.name);
    }
}

#[test]
fn trial_limit_is_reported_as_divergence() {
    let parsed = parse_network(LOOPED).unwrap();
    let solver = GradientSolver::new(SolverOptions {
        max_trials: 1,
        ..SolverOptions::default()
    });
    let err = solver.evaluate(&parsed.network).unwrap_err();
    assert!(err.is_divergence());
}
