//! Parser for the section-delimited network description.
//!
//! Parsing never aborts on a bad line: the line is skipped and recorded as a
//! [`ParseDefect`], and the (possibly partial) network is returned together
//! with a [`ParseReport`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use tracing::{debug, warn};
use wf_core::{LinkId, NodeId, Real, cms, kw, m, mm, parse_real};

use crate::builder::NetworkBuilder;
use crate::document::{InpDocument, Record};
use crate::error::NetworkResult;
use crate::model::{CurvePoint, Demand, LinkData, LinkStatus, Network, NodeData, PumpDrive, ValveType};
use crate::options::{FlowUnits, HeadlossModel, Times, parse_duration};

const NODE_SECTIONS: [&str; 3] = ["JUNCTIONS", "RESERVOIRS", "TANKS"];
const LINK_SECTIONS: [&str; 3] = ["PIPES", "PUMPS", "VALVES"];

/// Why a line was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum DefectKind {
    TooFewFields { expected: usize, found: usize },
    NotNumeric { field: &'static str, token: String },
    DuplicateId { id: String },
    UnknownNode { node: String },
    UnknownLink { link: String },
    UnknownCurve { curve: String },
    UnknownPattern { pattern: String },
    UnknownKeyword { token: String },
    NotAJunction { node: String },
    SelfLoop { node: String },
    UnsupportedUnits { token: String },
    TooManySteps { steps: u64, max: u64 },
}

/// A malformed line of the description.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseDefect {
    /// 0-based line index.
    pub line: usize,
    pub section: String,
    pub kind: DefectKind,
}

impl fmt::Display for ParseDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} [{}]: ", self.line + 1, self.section)?;
        match &self.kind {
            DefectKind::TooFewFields { expected, found } => {
                write!(f, "expected at least {} fields, found {}", expected, found)
            }
            DefectKind::NotNumeric { field, token } => {
                write!(f, "{} '{}' is not a number", field, token)
            }
            DefectKind::DuplicateId { id } => write!(f, "duplicate identifier '{}'", id),
            DefectKind::UnknownNode { node } => write!(f, "unknown node '{}'", node),
            DefectKind::UnknownLink { link } => write!(f, "unknown link '{}'", link),
            DefectKind::UnknownCurve { curve } => write!(f, "unknown curve '{}'", curve),
            DefectKind::UnknownPattern { pattern } => write!(f, "unknown pattern '{}'", pattern),
            DefectKind::UnknownKeyword { token } => write!(f, "unknown keyword '{}'", token),
            DefectKind::NotAJunction { node } => write!(f, "node '{}' is not a junction", node),
            DefectKind::SelfLoop { node } => write!(f, "link starts and ends at '{}'", node),
            DefectKind::UnsupportedUnits { token } => {
                write!(f, "unsupported flow units '{}', assuming LPS", token)
            }
            DefectKind::TooManySteps { steps, max } => {
                write!(f, "horizon needs {} hydraulic steps, more than {}; value ignored", steps, max)
            }
        }
    }
}

/// Defects collected while parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    defects: Vec<ParseDefect>,
}

impl ParseReport {
    pub fn defects(&self) -> &[ParseDefect] {
        &self.defects
    }

    pub fn len(&self) -> usize {
        self.defects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defects.is_empty()
    }

    /// Number of defects in a given section.
    pub fn count_in(&self, section: &str) -> usize {
        let wanted = section.to_ascii_uppercase();
        self.defects.iter().filter(|d| d.section == wanted).count()
    }

    fn push(&mut self, line: usize, section: &str, kind: DefectKind) {
        let defect = ParseDefect {
            line,
            section: section.to_string(),
            kind,
        };
        warn!(%defect, "skipping malformed line");
        self.defects.push(defect);
    }
}

/// A parsed description: the lossless document, the network built from it,
/// and the defects encountered.
#[derive(Debug, Clone)]
pub struct ParsedNetwork {
    pub document: InpDocument,
    pub network: Network,
    pub report: ParseReport,
}

/// Parse a description held in memory.
pub fn parse_network(text: &str) -> NetworkResult<ParsedNetwork> {
    let document = InpDocument::new(text);
    let (network, report) = Parser::new(&document).run()?;
    debug!(
        nodes = network.nodes().len(),
        links = network.links().len(),
        defects = report.len(),
        "parsed network description"
    );
    Ok(ParsedNetwork {
        document,
        network,
        report,
    })
}

/// Read and parse a description from disk.
pub fn read_network(path: &Path) -> NetworkResult<ParsedNetwork> {
    let text = std::fs::read_to_string(path)?;
    parse_network(&text)
}

struct Parser<'d> {
    doc: &'d InpDocument,
    builder: NetworkBuilder,
    report: ParseReport,
    flow_units: FlowUnits,
    node_ids: HashMap<String, NodeId>,
    junction_ids: HashSet<NodeId>,
    link_ids: HashMap<String, LinkId>,
    pattern_names: HashSet<String>,
    curve_names: HashSet<String>,
}

impl<'d> Parser<'d> {
    fn new(doc: &'d InpDocument) -> Self {
        Self {
            doc,
            builder: NetworkBuilder::new(),
            report: ParseReport::default(),
            flow_units: FlowUnits::default(),
            node_ids: HashMap::new(),
            junction_ids: HashSet::new(),
            link_ids: HashMap::new(),
            pattern_names: HashSet::new(),
            curve_names: HashSet::new(),
        }
    }

    fn run(mut self) -> NetworkResult<(Network, ParseReport)> {
        let doc = self.doc;
        // Options first: flow units scale every demand and curve point
        for record in doc.records("OPTIONS") {
            self.option(&record);
        }
        for record in doc.records("TIMES") {
            self.time(&record);
        }
        for record in doc.records("PATTERNS") {
            self.pattern(&record);
        }
        for record in doc.records("CURVES") {
            self.curve(&record);
        }

        // Nodes, then links, each in declaration order across their sections
        for section in doc.sections() {
            if !NODE_SECTIONS.contains(&section.name.as_str()) {
                continue;
            }
            for line in section.body.clone() {
                if let Some(record) = doc.record(line) {
                    match section.name.as_str() {
                        "JUNCTIONS" => self.junction(&record),
                        "RESERVOIRS" => self.reservoir(&record),
                        _ => self.tank(&record),
                    }
                }
            }
        }
        for section in doc.sections() {
            if !LINK_SECTIONS.contains(&section.name.as_str()) {
                continue;
            }
            for line in section.body.clone() {
                if let Some(record) = doc.record(line) {
                    match section.name.as_str() {
                        "PIPES" => self.pipe(&record),
                        "PUMPS" => self.pump(&record),
                        _ => self.valve(&record),
                    }
                }
            }
        }

        let mut replaced: HashSet<NodeId> = HashSet::new();
        for record in doc.records("DEMANDS") {
            self.demand(&record, &mut replaced);
        }
        for record in doc.records("STATUS") {
            self.status(&record);
        }

        let network = self.builder.build()?;
        Ok((network, self.report))
    }

    fn require(&mut self, record: &Record<'_>, section: &str, expected: usize) -> bool {
        if record.len() < expected {
            self.report.push(
                record.line,
                section,
                DefectKind::TooFewFields {
                    expected,
                    found: record.len(),
                },
            );
            return false;
        }
        true
    }

    fn number(
        &mut self,
        record: &Record<'_>,
        section: &str,
        index: usize,
        field: &'static str,
    ) -> Option<Real> {
        let token = record.field(index)?;
        match parse_real(token) {
            Some(v) => Some(v),
            None => {
                self.report.push(
                    record.line,
                    section,
                    DefectKind::NotNumeric {
                        field,
                        token: token.to_string(),
                    },
                );
                None
            }
        }
    }

    /// `Some(None)` when the field is absent, `None` when it names an unknown pattern.
    fn pattern_ref(
        &mut self,
        record: &Record<'_>,
        section: &str,
        index: usize,
    ) -> Option<Option<String>> {
        let Some(name) = record.field(index) else {
            return Some(None);
        };
        if self.pattern_names.contains(name) {
            Some(Some(name.to_string()))
        } else {
            self.report.push(
                record.line,
                section,
                DefectKind::UnknownPattern {
                    pattern: name.to_string(),
                },
            );
            None
        }
    }

    fn node_ref(&mut self, record: &Record<'_>, section: &str, index: usize) -> Option<NodeId> {
        let name = record.field(index)?;
        match self.node_ids.get(name) {
            Some(&id) => Some(id),
            None => {
                self.report.push(
                    record.line,
                    section,
                    DefectKind::UnknownNode {
                        node: name.to_string(),
                    },
                );
                None
            }
        }
    }

    fn claim_node_name(&mut self, record: &Record<'_>, section: &str) -> Option<String> {
        let name = record.field(0)?;
        if self.node_ids.contains_key(name) {
            self.report.push(
                record.line,
                section,
                DefectKind::DuplicateId {
                    id: name.to_string(),
                },
            );
            return None;
        }
        Some(name.to_string())
    }

    fn option(&mut self, record: &Record<'_>) {
        let key = record.field(0).unwrap_or_default().to_ascii_uppercase();
        let value = record.field(1);
        match (key.as_str(), value) {
            ("UNITS", Some(token)) => match FlowUnits::from_keyword(token) {
                Some(units) => self.flow_units = units,
                None => self.report.push(
                    record.line,
                    "OPTIONS",
                    DefectKind::UnsupportedUnits {
                        token: token.to_string(),
                    },
                ),
            },
            ("HEADLOSS", Some(token)) => match HeadlossModel::from_keyword(token) {
                Some(model) => self.builder.options_mut().headloss = model,
                None => self.report.push(
                    record.line,
                    "OPTIONS",
                    DefectKind::UnknownKeyword {
                        token: token.to_string(),
                    },
                ),
            },
            ("PATTERN", Some(token)) => {
                self.builder.options_mut().default_pattern = Some(token.to_string());
            }
            ("DEMAND", Some(next)) if next.eq_ignore_ascii_case("MULTIPLIER") => {
                if let Some(v) = self.number(record, "OPTIONS", 2, "demand multiplier") {
                    self.builder.options_mut().demand_multiplier = v;
                }
            }
            ("TRIALS", Some(_)) => {
                if let Some(v) = self.number(record, "OPTIONS", 1, "trials") {
                    self.builder.options_mut().trials = Some(v.max(1.0) as usize);
                }
            }
            ("ACCURACY", Some(_)) => {
                if let Some(v) = self.number(record, "OPTIONS", 1, "accuracy") {
                    self.builder.options_mut().accuracy = Some(v);
                }
            }
            _ => {}
        }
        self.builder.options_mut().flow_units = self.flow_units;
    }

    fn time(&mut self, record: &Record<'_>) {
        let Some(split) = record
            .fields
            .iter()
            .position(|f| f.text.starts_with(|c: char| c.is_ascii_digit() || c == '.'))
        else {
            return;
        };
        let key: Vec<String> = record.fields[..split]
            .iter()
            .map(|f| f.text.to_ascii_uppercase())
            .collect();
        let key = key.join(" ");
        let value = record.fields[split].text;
        let unit = record.field(split + 1);

        if !matches!(
            key.as_str(),
            "DURATION" | "HYDRAULIC TIMESTEP" | "PATTERN TIMESTEP" | "PATTERN START"
        ) {
            return;
        }
        let Some(secs) = parse_duration(value, unit) else {
            self.report.push(
                record.line,
                "TIMES",
                DefectKind::NotNumeric {
                    field: "time value",
                    token: value.to_string(),
                },
            );
            return;
        };

        let times = self.builder.times_mut();
        let previous = times.clone();
        match key.as_str() {
            "DURATION" => times.duration_s = secs,
            "HYDRAULIC TIMESTEP" => times.hydraulic_step_s = secs,
            "PATTERN TIMESTEP" => times.pattern_step_s = secs,
            _ => times.pattern_start_s = secs,
        }
        if !times.is_bounded() {
            let steps = times.step_count();
            *times = previous;
            self.report.push(
                record.line,
                "TIMES",
                DefectKind::TooManySteps {
                    steps,
                    max: Times::MAX_STEPS,
                },
            );
        }
    }

    fn pattern(&mut self, record: &Record<'_>) {
        if !self.require(record, "PATTERNS", 2) {
            return;
        }
        let mut multipliers = Vec::with_capacity(record.len() - 1);
        for i in 1..record.len() {
            match self.number(record, "PATTERNS", i, "multiplier") {
                Some(v) => multipliers.push(v),
                None => return,
            }
        }
        let name = record.field(0).unwrap_or_default();
        self.builder.extend_pattern(name, &multipliers);
        self.pattern_names.insert(name.to_string());
    }

    fn curve(&mut self, record: &Record<'_>) {
        if !self.require(record, "CURVES", 3) {
            return;
        }
        let Some(x) = self.number(record, "CURVES", 1, "x value") else {
            return;
        };
        let Some(y) = self.number(record, "CURVES", 2, "y value") else {
            return;
        };
        let name = record.field(0).unwrap_or_default();
        self.builder.push_curve_point(
            name,
            CurvePoint {
                x: self.flow_units.to_cms(x),
                y,
                line: Some(record.line),
            },
        );
        self.curve_names.insert(name.to_string());
    }

    fn junction(&mut self, record: &Record<'_>) {
        const SECTION: &str = "JUNCTIONS";
        if !self.require(record, SECTION, 2) {
            return;
        }
        let Some(name) = self.claim_node_name(record, SECTION) else {
            return;
        };
        let Some(elevation) = self.number(record, SECTION, 1, "elevation") else {
            return;
        };
        let mut demands = Vec::new();
        if record.field(2).is_some() {
            let Some(base) = self.number(record, SECTION, 2, "demand") else {
                return;
            };
            let Some(pattern) = self.pattern_ref(record, SECTION, 3) else {
                return;
            };
            demands.push(Demand {
                base: cms(self.flow_units.to_cms(base)),
                pattern,
                line: Some(record.line),
            });
        }
        let id = self.builder.push_node(
            name.clone(),
            NodeData::Junction {
                elevation: m(elevation),
                demands,
            },
            Some(record.line),
        );
        self.junction_ids.insert(id);
        self.node_ids.insert(name, id);
    }

    fn reservoir(&mut self, record: &Record<'_>) {
        const SECTION: &str = "RESERVOIRS";
        if !self.require(record, SECTION, 2) {
            return;
        }
        let Some(name) = self.claim_node_name(record, SECTION) else {
            return;
        };
        let Some(head) = self.number(record, SECTION, 1, "head") else {
            return;
        };
        let Some(pattern) = self.pattern_ref(record, SECTION, 2) else {
            return;
        };
        let id = self.builder.push_node(
            name.clone(),
            NodeData::Source {
                head: m(head),
                pattern,
            },
            Some(record.line),
        );
        self.node_ids.insert(name, id);
    }

    fn tank(&mut self, record: &Record<'_>) {
        const SECTION: &str = "TANKS";
        if !self.require(record, SECTION, 6) {
            return;
        }
        let Some(name) = self.claim_node_name(record, SECTION) else {
            return;
        };
        let mut values = [0.0; 5];
        let labels = ["elevation", "initial level", "minimum level", "maximum level", "diameter"];
        for (i, label) in labels.iter().enumerate() {
            match self.number(record, SECTION, i + 1, label) {
                Some(v) => values[i] = v,
                None => return,
            }
        }
        let id = self.builder.push_node(
            name.clone(),
            NodeData::Tank {
                elevation: m(values[0]),
                init_level: m(values[1]),
                min_level: m(values[2]),
                max_level: m(values[3]),
                diameter: m(values[4]),
            },
            Some(record.line),
        );
        self.node_ids.insert(name, id);
    }

    /// Common prefix of every link line: unique id and two known, distinct endpoints.
    fn link_head(
        &mut self,
        record: &Record<'_>,
        section: &str,
        min_fields: usize,
    ) -> Option<(String, NodeId, NodeId)> {
        if !self.require(record, section, min_fields) {
            return None;
        }
        let name = record.field(0)?;
        if self.link_ids.contains_key(name) {
            self.report.push(
                record.line,
                section,
                DefectKind::DuplicateId {
                    id: name.to_string(),
                },
            );
            return None;
        }
        let from = self.node_ref(record, section, 1)?;
        let to = self.node_ref(record, section, 2)?;
        if from == to {
            self.report.push(
                record.line,
                section,
                DefectKind::SelfLoop {
                    node: record.field(1).unwrap_or_default().to_string(),
                },
            );
            return None;
        }
        Some((name.to_string(), from, to))
    }

    fn pipe(&mut self, record: &Record<'_>) {
        const SECTION: &str = "PIPES";
        let Some((name, from, to)) = self.link_head(record, SECTION, 6) else {
            return;
        };
        let Some(length) = self.number(record, SECTION, 3, "length") else {
            return;
        };
        let Some(diameter) = self.number(record, SECTION, 4, "diameter") else {
            return;
        };
        let Some(roughness) = self.number(record, SECTION, 5, "roughness") else {
            return;
        };
        let minor_loss = if record.field(6).is_some() {
            match self.number(record, SECTION, 6, "minor loss") {
                Some(v) => v,
                None => return,
            }
        } else {
            0.0
        };
        let (status, check_valve) = match record.field(7).map(|s| s.to_ascii_uppercase()) {
            None => (LinkStatus::Open, false),
            Some(s) if s == "OPEN" => (LinkStatus::Open, false),
            Some(s) if s == "CLOSED" => (LinkStatus::Closed, false),
            Some(s) if s == "CV" => (LinkStatus::Open, true),
            Some(s) => {
                self.report
                    .push(record.line, SECTION, DefectKind::UnknownKeyword { token: s });
                return;
            }
        };

        let id = self.builder.push_link(
            name.clone(),
            from,
            to,
            LinkData::Pipe {
                length: m(length),
                diameter: mm(diameter),
                roughness,
                minor_loss,
                check_valve,
            },
            Some(record.line),
        );
        self.builder.set_link_status(id, status);
        self.link_ids.insert(name, id);
    }

    fn pump(&mut self, record: &Record<'_>) {
        const SECTION: &str = "PUMPS";
        let Some((name, from, to)) = self.link_head(record, SECTION, 5) else {
            return;
        };

        let mut drive = None;
        let mut i = 3;
        while i + 1 < record.len() {
            let keyword = record.field(i).unwrap_or_default().to_ascii_uppercase();
            let value = record.field(i + 1).unwrap_or_default();
            match keyword.as_str() {
                "HEAD" => {
                    if !self.curve_names.contains(value) {
                        self.report.push(
                            record.line,
                            SECTION,
                            DefectKind::UnknownCurve {
                                curve: value.to_string(),
                            },
                        );
                        return;
                    }
                    drive = Some(PumpDrive::Head {
                        curve: value.to_string(),
                    });
                }
                "POWER" => {
                    let Some(p) = self.number(record, SECTION, i + 1, "power") else {
                        return;
                    };
                    drive = Some(PumpDrive::Power { power: kw(p) });
                }
                "SPEED" | "PATTERN" => {}
                _ => {
                    self.report.push(
                        record.line,
                        SECTION,
                        DefectKind::UnknownKeyword { token: keyword },
                    );
                    return;
                }
            }
            i += 2;
        }

        let Some(drive) = drive else {
            self.report.push(
                record.line,
                SECTION,
                DefectKind::UnknownKeyword {
                    token: record.field(3).unwrap_or_default().to_string(),
                },
            );
            return;
        };
        let id = self.builder.push_link(
            name.clone(),
            from,
            to,
            LinkData::Pump { drive },
            Some(record.line),
        );
        self.link_ids.insert(name, id);
    }

    fn valve(&mut self, record: &Record<'_>) {
        const SECTION: &str = "VALVES";
        let Some((name, from, to)) = self.link_head(record, SECTION, 6) else {
            return;
        };
        let Some(diameter) = self.number(record, SECTION, 3, "diameter") else {
            return;
        };
        let type_token = record.field(4).unwrap_or_default();
        let Some(valve_type) = ValveType::from_keyword(type_token) else {
            self.report.push(
                record.line,
                SECTION,
                DefectKind::UnknownKeyword {
                    token: type_token.to_string(),
                },
            );
            return;
        };
        // GPV settings name a curve rather than a number
        let setting = if valve_type == ValveType::Gpv {
            0.0
        } else {
            match self.number(record, SECTION, 5, "setting") {
                Some(v) => v,
                None => return,
            }
        };
        let minor_loss = if record.field(6).is_some() {
            match self.number(record, SECTION, 6, "minor loss") {
                Some(v) => v,
                None => return,
            }
        } else {
            0.0
        };
        let id = self.builder.push_link(
            name.clone(),
            from,
            to,
            LinkData::Valve {
                diameter: mm(diameter),
                valve_type,
                setting,
                minor_loss,
            },
            Some(record.line),
        );
        self.link_ids.insert(name, id);
    }

    fn demand(&mut self, record: &Record<'_>, replaced: &mut HashSet<NodeId>) {
        const SECTION: &str = "DEMANDS";
        if !self.require(record, SECTION, 2) {
            return;
        }
        let Some(node) = self.node_ref(record, SECTION, 0) else {
            return;
        };
        if !self.junction_ids.contains(&node) {
            self.report.push(
                record.line,
                SECTION,
                DefectKind::NotAJunction {
                    node: record.field(0).unwrap_or_default().to_string(),
                },
            );
            return;
        }
        let Some(base) = self.number(record, SECTION, 1, "demand") else {
            return;
        };
        let Some(pattern) = self.pattern_ref(record, SECTION, 2) else {
            return;
        };
        // The first [DEMANDS] row of a junction supersedes its junction-line demand
        if replaced.insert(node) {
            self.builder.clear_demands(node);
        }
        self.builder.push_demand(
            node,
            Demand {
                base: cms(self.flow_units.to_cms(base)),
                pattern,
                line: Some(record.line),
            },
        );
    }

    fn status(&mut self, record: &Record<'_>) {
        const SECTION: &str = "STATUS";
        if !self.require(record, SECTION, 2) {
            return;
        }
        let name = record.field(0).unwrap_or_default();
        let Some(&link) = self.link_ids.get(name) else {
            self.report.push(
                record.line,
                SECTION,
                DefectKind::UnknownLink {
                    link: name.to_string(),
                },
            );
            return;
        };
        let value = record.field(1).unwrap_or_default().to_ascii_uppercase();
        match value.as_str() {
            "OPEN" => self.builder.set_link_status(link, LinkStatus::Open),
            "CLOSED" => self.builder.set_link_status(link, LinkStatus::Closed),
            // Numeric speed or valve settings are not modelled
            other if parse_real(other).is_some() => {}
            _ => self
                .report
                .push(record.line, SECTION, DefectKind::UnknownKeyword { token: value }),
        }
    }
}
