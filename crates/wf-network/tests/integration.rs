//! Integration tests for wf-network.

use wf_core::m;
use wf_network::{
    Classifier, LinkData, LinkKind, NodeData, NodeKind, disconnected_junctions,
    infer_source_junction_map, parse_network,
};

const TOWN: &str = "\
[TITLE]
Small town supply ; two sources, one booster

[JUNCTIONS]
;ID      Elev    Demand   Pattern
 J1      100     5        DAY     ;market
 J2      96      3.5
 J3      91      2        DAY
 J9      80      1                ;isolated

[RESERVOIRS]
;ID      Head
 Reservoir_North   130
 Borewell_2        90

[TANKS]
 T1      120     3    0    6    12

[PIPES]
;ID   Node1   Node2   Length  Diam   Rough
 P1   Reservoir_North   J1   1200   300   130
 P2   J1      J2      600     250    130   0   ;trunk
 P3   J2      J3      450     150    120
 P4   T1      J2      300     200    130
 P5   J1      J3      800     100    110   0   CLOSED

[PUMPS]
 PU1  Borewell_2   J3   HEAD  BOOST

[CURVES]
;ID     Flow   Head
 BOOST  10     35

[PATTERNS]
 DAY    0.8  1.0  1.4  1.0

[OPTIONS]
 Units      LPS
 Headloss   H-W

[TIMES]
 Duration             3:00
 Hydraulic Timestep   1:00

[END]
";

#[test]
fn parse_small_town() {
    let parsed = parse_network(TOWN).unwrap();
    let net = &parsed.network;

    assert!(parsed.report.is_empty(), "{:?}", parsed.report.defects());
    assert_eq!(net.junctions().count(), 4);
    assert_eq!(net.sources().count(), 2);
    assert_eq!(net.nodes_of_kind(NodeKind::Tank).count(), 1);
    assert_eq!(net.links_of_kind(LinkKind::Pipe).count(), 5);
    assert_eq!(net.links_of_kind(LinkKind::Pump).count(), 1);
    assert_eq!(net.pump_curve_names(), vec!["BOOST".to_string()]);
    assert_eq!(net.times().steps(), vec![0, 3_600, 7_200, 10_800]);

    // Every link endpoint exists
    for link in net.links() {
        assert!(net.node(link.from).is_some());
        assert!(net.node(link.to).is_some());
    }
}

#[test]
fn source_mapping_is_first_match_and_stable() {
    let parsed = parse_network(TOWN).unwrap();
    let net = &parsed.network;

    let first = infer_source_junction_map(net, &Classifier::ByKind);
    let second = infer_source_junction_map(net, &Classifier::ByKind);
    assert_eq!(first, second);

    let north = net.node_id("Reservoir_North").unwrap();
    let borewell = net.node_id("Borewell_2").unwrap();
    assert_eq!(first.get(north), net.node_id("J1"));
    assert_eq!(first.get(borewell), net.node_id("J3"));
    assert_eq!(first.link_for(borewell), net.link_id("PU1"));
    assert!(first.gaps().is_empty());

    let by_name = infer_source_junction_map(net, &Classifier::reference_names());
    assert_eq!(by_name, first);
}

#[test]
fn source_without_adjacent_junction_has_no_entry() {
    let text = "[JUNCTIONS]\nJ1 10 1\n[RESERVOIRS]\nR1 50\nR2 60\n[TANKS]\nT1 30 2 0 4 5\n\
                [PIPES]\nP1 R1 J1 100 200 130\nP2 R2 T1 100 200 130\nP3 T1 J1 100 200 130\n";
    let parsed = parse_network(text).unwrap();
    let net = &parsed.network;
    let map = infer_source_junction_map(net, &Classifier::ByKind);

    let r2 = net.node_id("R2").unwrap();
    assert_eq!(map.len(), 1);
    assert!(map.get(r2).is_none());
    assert_eq!(map.gaps(), &[r2]);
}

#[test]
fn isolated_junction_is_found() {
    let parsed = parse_network(TOWN).unwrap();
    let net = &parsed.network;
    assert_eq!(disconnected_junctions(net), vec![net.node_id("J9").unwrap()]);
}

#[test]
fn rewrite_and_reparse_keeps_untouched_values() {
    let parsed = parse_network(TOWN).unwrap();
    let mut tuned = parsed.network.clone();
    let north = tuned.node_id("Reservoir_North").unwrap();
    tuned.set_source_head(north, m(137.25)).unwrap();

    let out = parsed.write(&tuned).unwrap();
    assert_eq!(out.changes.len(), 1);
    assert_eq!(out.changes[0].entity, "Reservoir_North");

    let changed_line = out.changes[0].line;
    for (i, (a, b)) in TOWN.lines().zip(out.text.lines()).enumerate() {
        if i != changed_line {
            assert_eq!(a, b, "line {i} changed");
        }
    }

    let again = parse_network(&out.text).unwrap();
    assert!(again.report.is_empty());
    let before = &parsed.network;
    let after = &again.network;
    assert_eq!(before.nodes().len(), after.nodes().len());
    assert_eq!(before.links().len(), after.links().len());
    for (a, b) in before.nodes().iter().zip(after.nodes()) {
        assert_eq!(a.name, b.name);
        if a.id == north {
            assert!((b.fixed_head().unwrap().value - 137.25).abs() < 1e-9);
        } else {
            assert_eq!(a.data, b.data);
        }
    }
    for (a, b) in before.links().iter().zip(after.links()) {
        assert_eq!(a.name, b.name);
        assert_eq!(a.data, b.data);
        assert_eq!(a.status, b.status);
    }
}

#[test]
fn malformed_lines_are_counted_not_fatal() {
    let text = "[JUNCTIONS]\nJ1 100\nJ2\nJ3 x1\n[RESERVOIRS]\nR1 abc\nR2 150\n\
                [PIPES]\nP1 R2 J1 100 200 130\nP2 R2 J7 100 200 130\nP3 R2 J1 short\n";
    let parsed = parse_network(text).unwrap();
    assert_eq!(parsed.report.count_in("JUNCTIONS"), 2);
    assert_eq!(parsed.report.count_in("RESERVOIRS"), 1);
    assert_eq!(parsed.report.count_in("PIPES"), 2);
    assert_eq!(parsed.network.nodes().len(), 2);
    assert_eq!(parsed.network.links().len(), 1);

    match &parsed.network.link_by_name("P1").unwrap().data {
        LinkData::Pipe { diameter, .. } => assert!((diameter.value - 0.2).abs() < 1e-12),
        other => panic!("unexpected {other:?}"),
    }
    match &parsed.network.node_by_name("J1").unwrap().data {
        NodeData::Junction { demands, .. } => assert!(demands.is_empty()),
        other => panic!("unexpected {other:?}"),
    }
}
