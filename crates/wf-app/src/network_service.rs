//! Network file loading, writing and run summaries.

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use wf_network::{Network, ParsedNetwork, WriteOutcome, parse_network};

use crate::error::{AppError, AppResult};

/// Load and parse a network description. Line defects are logged and kept
/// in the returned report.
pub fn load_network(path: &Path) -> AppResult<ParsedNetwork> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let parsed = parse_network(&content)?;
    if !parsed.report.is_empty() {
        warn!(
            path = %path.display(),
            defects = parsed.report.len(),
            "network loaded with skipped lines"
        );
    }
    Ok(parsed)
}

/// Write `tuned` through the original document to `path`.
pub fn write_network(parsed: &ParsedNetwork, tuned: &Network, path: &Path) -> AppResult<WriteOutcome> {
    let outcome = parsed.write(tuned)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| AppError::FileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, &outcome.text).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), changes = outcome.changes.len(), "wrote network");
    Ok(outcome)
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    command: &'a str,
    network: &'a Path,
    created_at: String,
    report: &'a T,
}

/// Write a timestamped JSON summary of `report`.
pub fn write_summary<T: Serialize>(path: &Path, command: &str, network: &Path, report: &T) -> AppResult<()> {
    let envelope = Envelope {
        command,
        network,
        created_at: Utc::now().to_rfc3339(),
        report,
    };
    let json = serde_json::to_string_pretty(&envelope)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, json).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), command, "wrote summary");
    Ok(())
}
