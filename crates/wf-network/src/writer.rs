//! Write a tuned network back into its original description.
//!
//! Only fields whose value differs from the as-parsed network are rewritten;
//! every other byte of the description, comments included, is preserved.

use std::path::Path;

use tracing::{debug, warn};
use wf_core::{Real, Tolerances, nearly_equal};

use crate::document::InpDocument;
use crate::error::{NetworkError, NetworkResult};
use crate::model::{LinkData, Network, NodeData};
use crate::parse::ParsedNetwork;

/// Field positions of the editable values.
mod field {
    pub const SOURCE_HEAD: usize = 1;
    pub const JUNCTION_DEMAND: usize = 2;
    pub const DEMANDS_ROW_DEMAND: usize = 1;
    pub const CURVE_Y: usize = 2;
    pub const PIPE_DIAMETER: usize = 4;
}

/// One rewritten field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// 0-based line index.
    pub line: usize,
    pub field: usize,
    /// Identifier of the entity that owns the value.
    pub entity: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct WriteOutcome {
    pub text: String,
    pub changes: Vec<FieldChange>,
}

impl WriteOutcome {
    pub fn save(&self, path: &Path) -> NetworkResult<()> {
        std::fs::write(path, &self.text)?;
        Ok(())
    }
}

/// Numeric formatting of rewritten values.
pub fn format_value(v: Real) -> String {
    format!("{:.6}", v)
}

impl ParsedNetwork {
    /// Produce the description of `tuned`, which must share this network's structure.
    pub fn write(&self, tuned: &Network) -> NetworkResult<WriteOutcome> {
        check_structure(&self.network, tuned)?;

        let mut doc = self.document.clone();
        let mut changes = Vec::new();
        let units = self.network.options().flow_units;

        for (before, after) in self.network.nodes().iter().zip(tuned.nodes()) {
            match (&before.data, &after.data) {
                (NodeData::Source { head: h0, .. }, NodeData::Source { head: h1, .. }) => {
                    if changed(h0.value, h1.value) {
                        edit(
                            &mut doc,
                            &mut changes,
                            &after.name,
                            before.line,
                            field::SOURCE_HEAD,
                            h1.value,
                        )?;
                    }
                }
                (
                    NodeData::Junction { demands: d0, .. },
                    NodeData::Junction { demands: d1, .. },
                ) => {
                    if d0.len() != d1.len() {
                        return Err(NetworkError::StructureMismatch {
                            what: "junction demand count",
                        });
                    }
                    for (a, b) in d0.iter().zip(d1) {
                        if !changed(a.base.value, b.base.value) {
                            continue;
                        }
                        let index = if a.line == before.line {
                            field::JUNCTION_DEMAND
                        } else {
                            field::DEMANDS_ROW_DEMAND
                        };
                        edit(
                            &mut doc,
                            &mut changes,
                            &after.name,
                            a.line,
                            index,
                            units.from_cms(b.base.value),
                        )?;
                    }
                }
                _ => {}
            }
        }

        for (before, after) in self.network.curves().iter().zip(tuned.curves()) {
            if before.points.len() != after.points.len() {
                return Err(NetworkError::StructureMismatch {
                    what: "curve point count",
                });
            }
            for (p0, p1) in before.points.iter().zip(&after.points) {
                if changed(p0.y, p1.y) {
                    edit(
                        &mut doc,
                        &mut changes,
                        &after.name,
                        p0.line,
                        field::CURVE_Y,
                        p1.y,
                    )?;
                }
            }
        }

        for (before, after) in self.network.links().iter().zip(tuned.links()) {
            if let (
                LinkData::Pipe { diameter: d0, .. },
                LinkData::Pipe { diameter: d1, .. },
            ) = (&before.data, &after.data)
            {
                if changed(d0.value, d1.value) {
                    edit(
                        &mut doc,
                        &mut changes,
                        &after.name,
                        before.line,
                        field::PIPE_DIAMETER,
                        d1.value * 1_000.0,
                    )?;
                }
            }
        }

        debug!(changes = changes.len(), "wrote tuned network");
        Ok(WriteOutcome {
            text: doc.to_text(),
            changes,
        })
    }
}

fn edit(
    doc: &mut InpDocument,
    changes: &mut Vec<FieldChange>,
    entity: &str,
    line: Option<usize>,
    field: usize,
    value: Real,
) -> NetworkResult<()> {
    let Some(line) = line else {
        warn!(entity, "value has no source line; change not written");
        return Ok(());
    };
    let text = format_value(value);
    if !doc.set_field(line, field, &text) {
        return Err(NetworkError::StructureMismatch {
            what: "edited field missing from description",
        });
    }
    changes.push(FieldChange {
        line,
        field,
        entity: entity.to_string(),
        value: text,
    });
    Ok(())
}

/// Values equal within the default tolerances are left as written.
fn changed(before: Real, after: Real) -> bool {
    !nearly_equal(before, after, Tolerances::default())
}

fn check_structure(parsed: &Network, tuned: &Network) -> NetworkResult<()> {
    if parsed.nodes().len() != tuned.nodes().len()
        || parsed
            .nodes()
            .iter()
            .zip(tuned.nodes())
            .any(|(a, b)| a.name != b.name || a.kind() != b.kind())
    {
        return Err(NetworkError::StructureMismatch { what: "nodes" });
    }
    if parsed.links().len() != tuned.links().len()
        || parsed
            .links()
            .iter()
            .zip(tuned.links())
            .any(|(a, b)| a.name != b.name || a.from != b.from || a.to != b.to)
    {
        return Err(NetworkError::StructureMismatch { what: "links" });
    }
    if parsed.curves().len() != tuned.curves().len() {
        return Err(NetworkError::StructureMismatch { what: "curves" });
    }
    Ok(())
}
