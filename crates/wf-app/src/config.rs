//! YAML run configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wf_calibrate::CalibrationConfig;
use wf_network::Classifier;
use wf_optimize::{SearchConfig, SizingConfig};
use wf_solver::{Evaluator, GradientSolver, SolverOptions, TimeoutEvaluator};

use crate::error::{AppError, AppResult};

/// Everything one invocation needs. Every section falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Network description file.
    pub network: PathBuf,
    /// Directory for written files; next to the network when absent.
    pub output: Option<PathBuf>,
    pub solver: SolverOptions,
    /// Wall-clock limit per evaluation (s). A timed-out evaluation counts as
    /// diverged.
    pub timeout_s: Option<f64>,
    pub classifier: Classifier,
    pub calibration: CalibrationConfig,
    pub search: SearchConfig,
    pub sizing: SizingConfig,
    /// Calibrate every sizing candidate before scoring it.
    pub repair: bool,
}

impl RunConfig {
    /// Defaults for a single network file.
    pub fn for_network(path: impl Into<PathBuf>) -> Self {
        Self {
            network: path.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.network.as_os_str().is_empty() {
            return Err(AppError::Config("no network file given".to_string()));
        }
        if let Some(t) = self.timeout_s {
            if !(t.is_finite() && t > 0.0) {
                return Err(AppError::Config("timeout_s must be positive".to_string()));
            }
        }
        self.calibration.validate()?;
        self.search.validate()?;
        Ok(())
    }

    /// Solver with the configured options, wrapped in a timeout when one is set.
    pub fn evaluator(&self) -> Box<dyn Evaluator> {
        let solver = GradientSolver::new(self.solver.clone());
        match self.timeout_s {
            Some(t) => Box::new(TimeoutEvaluator::new(solver, Duration::from_secs_f64(t))),
            None => Box::new(solver),
        }
    }

    /// `<output dir>/<network stem><suffix>.<network extension>`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        let stem = self
            .network
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "network".to_string());
        let ext = self
            .network
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "inp".to_string());
        let dir = match &self.output {
            Some(dir) => dir.clone(),
            None => self
                .network
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        dir.join(format!("{stem}{suffix}.{ext}"))
    }

    /// Path of the JSON summary for `command`.
    pub fn summary_path(&self, command: &str) -> PathBuf {
        self.output_path(&format!("_{command}_summary"))
            .with_extension("json")
    }
}

/// Load a run configuration from a YAML file.
pub fn load_config(path: &Path) -> AppResult<RunConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: RunConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse run config YAML: {}", e)))?;

    Ok(config)
}

/// Save a run configuration to a YAML file.
pub fn save_config(path: &Path, config: &RunConfig) -> AppResult<()> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize run config: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
