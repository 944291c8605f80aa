//! End-to-end checks of the file-level services.

use std::path::{Path, PathBuf};

use wf_app::{
    RunConfig, analyze, assign_heads, connectivity, load_network, run_calibration, run_optimize,
    scale_network_demands,
};
use wf_calibrate::CalibrationConfig;
use wf_optimize::SearchConfig;

const SMALL_TOWN: &str = "\
[TITLE]
Small town

[JUNCTIONS]
;ID  Elev  Demand
J1   100   0.1
J2   95    0.2
J9   90    0.0

[RESERVOIRS]
;ID  Head
R1   100

[PIPES]
;ID  Node1  Node2  Length  Diameter  Roughness
P1   R1     J1     100     150       130
P2   J1     J2     200     100       130

[OPTIONS]
Units     LPS
Headloss  H-W

[END]
";

/// The same town with J9 fed from J2.
fn connected_town() -> String {
    SMALL_TOWN.replace(
        "P2   J1     J2     200     100       130",
        "P2   J1     J2     200     100       130\nP3   J2     J9     50      100       130",
    )
}

fn workspace(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("wf_app_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("town.inp");
    std::fs::write(&path, SMALL_TOWN).unwrap();
    path
}

fn head_of(path: &Path, source: &str) -> f64 {
    let parsed = load_network(path).unwrap();
    let id = parsed.network.node_id(source).unwrap();
    parsed.network.source_head(id).unwrap().value
}

#[test]
fn analysis_reports_mapping_and_isolated_junction() {
    let network = workspace("analyze");
    let report = analyze(&RunConfig::for_network(&network)).unwrap();
    assert_eq!(report.nodes, 4);
    assert_eq!(report.links, 2);
    assert!(report.defects.is_empty());
    assert_eq!(report.mapping.len(), 1);
    assert_eq!(report.mapping[0].source, "R1");
    assert_eq!(report.mapping[0].junction, "J1");
    assert_eq!(report.mapping[0].link.as_deref(), Some("P1"));
    assert!(report.gaps.is_empty());
    assert_eq!(report.disconnected, vec!["J9".to_string()]);
    assert!(report.solver_error.is_some());
    assert!(report.min_pressure_m.is_none());

    let conn = connectivity(&RunConfig::for_network(&network)).unwrap();
    assert_eq!(conn.junctions, 3);
    assert_eq!(conn.disconnected, vec!["J9".to_string()]);
}

#[test]
fn calibration_writes_network_and_summary() {
    let network = workspace("calibrate");
    let config = RunConfig {
        calibration: CalibrationConfig::new(0.0, 15),
        ..RunConfig::for_network(&network)
    };
    std::fs::write(&network, connected_town()).unwrap();

    let report = run_calibration(&config).unwrap();
    assert!(report.feasible, "{}", report.summary);
    assert!(report.summary.starts_with("Feasible"));
    assert!(report.output.ends_with("town_calibrated.inp"));
    assert!(report.output.exists());
    assert!(config.summary_path("calibrate").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config.summary_path("calibrate")).unwrap())
            .unwrap();
    assert_eq!(summary["command"], "calibrate");
    assert!(summary["created_at"].as_str().is_some());
    assert_eq!(summary["report"]["feasible"], true);

    // R1 starts level with J1; heads only go up.
    assert!(head_of(&report.output, "R1") > 100.0);
    assert!((head_of(&network, "R1") - 100.0).abs() < 1e-12);
}

#[test]
fn assigned_heads_land_in_named_file() {
    let network = workspace("heads");
    let report = assign_heads(&RunConfig::for_network(&network), 20.0).unwrap();
    assert!(report.output.ends_with("town_adjusted_target20m.inp"));
    assert_eq!(report.assignment.assigned.len(), 1);
    assert!((head_of(&report.output, "R1") - 120.0).abs() < 1e-6);
}

#[test]
fn demand_scaling_writes_scaled_copy() {
    let network = workspace("demands");
    let report = scale_network_demands(&RunConfig::for_network(&network), 0.5).unwrap();
    assert_eq!(report.scaled, 2);
    let parsed = load_network(&report.output).unwrap();
    let j2 = parsed.network.node_by_name("J2").unwrap();
    assert!((j2.base_demand().value - 0.0001).abs() < 1e-9);
}

#[test]
fn optimize_writes_best_candidate() {
    let network = workspace("optimize");
    std::fs::write(&network, connected_town().replace("R1   100", "R1   140")).unwrap();
    let config = RunConfig {
        search: SearchConfig {
            generations: 4,
            seed: Some(17),
            parallel: false,
            ..SearchConfig::default()
        },
        ..RunConfig::for_network(&network)
    };
    let report = run_optimize(&config).unwrap();
    assert_eq!(report.diameters_mm.len(), 3);
    assert_eq!(report.diagnostics.get("diverged"), None);
    assert_eq!(report.diagnostics["pressure_deficit_m"], 0.0);
    assert!(report.output.ends_with("town_optimized.inp"));
    assert!(config.summary_path("optimize").exists());
    assert_eq!(report.outcome.best_history.len(), 4);

    let written = load_network(&report.output).unwrap();
    let p1 = written.network.link_by_name("P1").unwrap();
    let wf_network::LinkData::Pipe { diameter, .. } = &p1.data else {
        panic!("P1 is a pipe");
    };
    assert!((diameter.value * 1000.0 - report.diameters_mm["P1"]).abs() < 1e-6);
}
