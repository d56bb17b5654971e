//! Sweep expansion and simulation orchestration for PMSM rotor studies.

pub mod analysis;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod femm;
pub mod result_store;
pub mod rotor;
pub mod solver;
pub mod study;
pub mod sweep;
pub mod sweep_json;
pub mod value;

pub use engine::{run_sweep, run_sweep_with, SweepJob, SweepOutcome};
pub use error::{ConfigError, RunError, SolverError, SweepError, TaskError};
pub use sweep::{expand, SweepSpec, SweepValue};
pub use value::{Params, Value};
