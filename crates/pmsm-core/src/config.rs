//! Project configuration: the stator template, machine constants and a queue
//! of studies to run.
//!
//! ```json
//! {
//!   "stator_path": "stator_quater.FEM",
//!   "irms": 12,
//!   "rpm": 1000,
//!   "simulations": [
//!     {"name": "spm", "study": "sweep_1d", "rotor": "surface",
//!      "steps": {"magnet_depth": [1, 5, 9]}}
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cache::CachePolicy;
use crate::engine::DEFAULT_WORKERS;
use crate::error::ConfigError;
use crate::femm::FemmConfig;
use crate::rotor::RotorKind;
use crate::value::Params;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StudyKind {
    /// Standstill, no current: cogging torque and back-EMF.
    Static,
    /// Rotating at rated current.
    Moving,
    /// Single-parameter sweep over `magnet_depth`.
    Sweep1d,
    /// Two-parameter sweep over the builder outputs `x` and `y`.
    Sweep2d,
}

impl StudyKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "static" => Some(StudyKind::Static),
            "moving" => Some(StudyKind::Moving),
            "sweep_1d" | "sweep1d" => Some(StudyKind::Sweep1d),
            "sweep_2d" | "sweep2d" => Some(StudyKind::Sweep2d),
            _ => None,
        }
    }

    pub fn is_sweep(self) -> bool {
        matches!(self, StudyKind::Sweep1d | StudyKind::Sweep2d)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationEntry {
    pub name: String,
    pub study: StudyKind,
    pub rotor: RotorKind,
    /// Rotor parameters held fixed for every combo.
    #[serde(default)]
    pub params: Params,
    /// Sweep description in the JSON sweep form; required for sweep studies.
    #[serde(default)]
    pub steps: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub stator_path: PathBuf,
    pub symmetry_factor: f64,
    /// Rated phase current (RMS).
    pub irms: f64,
    pub rpm: f64,
    pub workers: usize,
    /// Root for cached CSVs (`sims/`) and scratch artifacts (`tmp/`).
    pub project_dir: PathBuf,
    pub cache_policy: CachePolicy,
    pub femm: FemmConfig,
    pub simulations: Vec<SimulationEntry>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            stator_path: PathBuf::from("stator_quater.FEM"),
            symmetry_factor: 4.0,
            irms: 12.0,
            rpm: 1000.0,
            workers: DEFAULT_WORKERS,
            project_dir: PathBuf::from("."),
            cache_policy: CachePolicy::default(),
            femm: FemmConfig::default(),
            simulations: Vec::new(),
        }
    }
}

impl ProjectConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a project file. Relative `stator_path` and `project_dir` are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json_str(&raw)?;
        if let Some(base) = path.parent() {
            if config.stator_path.is_relative() {
                config.stator_path = base.join(&config.stator_path);
            }
            if config.project_dir.is_relative() {
                config.project_dir = base.join(&config.project_dir);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.symmetry_factor.is_nan() || self.symmetry_factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "symmetry_factor must be positive, got {}",
                self.symmetry_factor
            )));
        }
        if self.rpm.is_nan() || self.rpm <= 0.0 {
            return Err(ConfigError::Invalid(format!("rpm must be positive, got {}", self.rpm)));
        }
        if !self.irms.is_finite() || self.irms < 0.0 {
            return Err(ConfigError::Invalid(format!("irms must be non-negative, got {}", self.irms)));
        }

        let mut names = HashSet::new();
        for sim in &self.simulations {
            check_sim_name(&sim.name).map_err(ConfigError::Invalid)?;
            if !names.insert(sim.name.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate simulation name '{}'", sim.name)));
            }
            if sim.study.is_sweep() && sim.steps.is_none() {
                return Err(ConfigError::Invalid(format!(
                    "simulation '{}' is a sweep but has no steps",
                    sim.name
                )));
            }
        }
        Ok(())
    }

    /// Peak phase current, `sqrt(2) * irms`.
    pub fn peak_current(&self) -> f64 {
        std::f64::consts::SQRT_2 * self.irms
    }

    pub fn results_dir(&self, name: &str) -> PathBuf {
        self.project_dir.join("sims").join(name)
    }

    pub fn scratch_dir(&self, name: &str) -> PathBuf {
        self.project_dir
            .join("tmp")
            .join("sims")
            .join(name)
            .join(format!("{}_steps", name))
    }
}

/// A simulation name becomes a directory under the project, so it must be a
/// single non-empty path component.
pub fn check_sim_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("simulation name must not be empty".to_string());
    }
    if name.contains(&['/', '\\', '\0'][..]) || name == "." || name == ".." {
        return Err(format!("simulation name '{}' must be a plain directory name", name));
    }
    Ok(())
}

pub fn debug_dump_config(config: &ProjectConfig) {
    println!(
        "config: stator={} irms={} rpm={} workers={} simulations={}",
        config.stator_path.display(),
        config.irms,
        config.rpm,
        config.workers,
        config.simulations.len()
    );
}
