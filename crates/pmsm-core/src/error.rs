//! Error types for sweeps, tasks and solver sessions.

use std::path::PathBuf;

use pmsm_geometry::GeometryError;
use thiserror::Error;

/// Failure to turn a sweep description into combos.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SweepError {
    #[error("invalid sweep spec for '{key}': {message}")]
    InvalidSpec { key: String, message: String },

    #[error("unknown nested mode '{0}' (expected 'select' or 'create')")]
    UnknownMode(String),
}

/// Failures raised while talking to the solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver executable not found: {0}")]
    NotFound(String),

    #[error("solver run failed: {0}")]
    ExecutionFailed(String),

    #[error("solver timed out after {0} seconds")]
    Timeout(u64),

    #[error("malformed solver output: {0}")]
    BadOutput(String),

    #[error("session already closed")]
    Closed,

    #[error("template not found: {path}")]
    TemplateNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that can make one combo fail. A failed combo is dropped from
/// the sweep; siblings keep running.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("invalid parameter '{key}': {message}")]
    InvalidParameter { key: String, message: String },

    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    #[error("solver error: {0}")]
    Solver(#[from] SolverError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Errors that abort a whole sweep or study, as opposed to a single combo.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("failed to start worker pool: {0}")]
    Pool(String),

    #[error("result cache error: {0}")]
    Cache(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing column '{0}' in result table")]
    MissingColumn(String),

    #[error("malformed CSV at line {line}: {message}")]
    Csv { line: usize, message: String },
}
