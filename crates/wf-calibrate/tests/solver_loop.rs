//! Calibration against the built-in solver, through to the written description.

use wf_calibrate::{CalibrationConfig, CalibrationStatus, StepPolicy, calibrate};
use wf_network::{Classifier, infer_source_junction_map, parse_network};
use wf_solver::{GradientSolver, TimeSelector, evaluate_at};

const SINGLE: &str = "\
[TITLE]
One source, one junction

[JUNCTIONS]
;ID   Elev   Demand
 J1   100    0.1

[RESERVOIRS]
;ID   Head
 R1   100      ;well head

[PIPES]
 P1   R1   J1   10   300   130

[END]
";

#[test]
fn junction_reaches_target_and_head_is_written() {
    let parsed = parse_network(SINGLE).unwrap();
    let mut network = parsed.network.clone();
    let map = infer_source_junction_map(&network, &Classifier::ByKind);
    let solver = GradientSolver::default();

    let state = calibrate(&mut network, &solver, &map, &CalibrationConfig::new(20.0, 15)).unwrap();
    assert_eq!(state.status, CalibrationStatus::Feasible);

    let snap = evaluate_at(&solver, &network, TimeSelector::PeakDemand).unwrap();
    assert!(snap.node("J1").unwrap().pressure >= 20.0);

    let out = parsed.write(&network).unwrap();
    let reparsed = parse_network(&out.text).unwrap();
    let head = reparsed.network.node_by_name("R1").unwrap().fixed_head().unwrap().value;
    assert!((head - 120.0).abs() < 0.05, "head {head}");
    assert!(out.text.contains(";well head"));
    assert_eq!(out.changes.len(), 1);
}

#[test]
fn exhausted_run_reports_last_pressure() {
    let parsed = parse_network(SINGLE).unwrap();
    let mut network = parsed.network.clone();
    let map = infer_source_junction_map(&network, &Classifier::ByKind);
    let cfg = CalibrationConfig::new(20.0, 3).with_step(StepPolicy::Fixed { step_m: 1.0 });

    let state = calibrate(&mut network, &GradientSolver::default(), &map, &cfg).unwrap();
    assert_eq!(state.status, CalibrationStatus::Exhausted);
    let last = state.last_min_pressure.unwrap();
    assert!(last < 20.0 && last > 1.0);
    assert!(state.summary().starts_with("NOT feasible"));
}
