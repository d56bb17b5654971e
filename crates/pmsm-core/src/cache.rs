//! On-disk result cache for sweeps.
//!
//! The cache key is the CSV path. Under [`CachePolicy::PathExists`] an existing
//! file is trusted as-is, so editing a sweep without renaming it keeps serving
//! the old table. [`CachePolicy::Fingerprint`] also stores a hash of the
//! resolved combo list next to the CSV and re-runs when it differs.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::engine::{SweepJob, SweepOutcome};
use crate::error::RunError;
use crate::result_store::ResultTable;
use crate::sweep::expand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    #[default]
    PathExists,
    Fingerprint,
}

pub fn fingerprint_path(csv_path: &Path) -> PathBuf {
    let mut name = csv_path.as_os_str().to_owned();
    name.push(".fingerprint");
    PathBuf::from(name)
}

/// Hex SHA-256 of the rotor kind, fixed params and both resolved combo lists.
pub fn job_fingerprint(job: &SweepJob) -> Result<String, RunError> {
    let steps = expand(&job.steps)?;
    let inner = expand(&job.excitations)?;
    let payload = serde_json::json!({
        "rotor": job.rotor,
        "fixed": job.fixed,
        "steps": steps,
        "excitations": inner,
    });
    let encoded = serde_json::to_vec(&payload).map_err(|e| RunError::Cache(e.to_string()))?;
    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    Ok(format!("{:x}", hasher.finalize()))
}

fn is_fresh(csv_path: &Path, policy: CachePolicy, job: &SweepJob) -> Result<bool, RunError> {
    if !csv_path.exists() {
        return Ok(false);
    }
    match policy {
        CachePolicy::PathExists => Ok(true),
        CachePolicy::Fingerprint => {
            let stored = match fs::read_to_string(fingerprint_path(csv_path)) {
                Ok(stored) => stored,
                Err(_) => return Ok(false),
            };
            Ok(stored.trim() == job_fingerprint(job)?)
        }
    }
}

/// Returns the table at `csv_path`, running `run` first when the cache is
/// missing or stale. The table is always re-read from disk, so a fresh run
/// and a cache hit yield the same values.
pub fn run_cached<F>(
    csv_path: &Path,
    policy: CachePolicy,
    job: &SweepJob,
    run: F,
) -> Result<ResultTable, RunError>
where
    F: FnOnce(&SweepJob) -> Result<SweepOutcome, RunError>,
{
    if is_fresh(csv_path, policy, job)? {
        info!("using cached results {}", csv_path.display());
        return ResultTable::read_csv(csv_path);
    }

    let outcome = run(job)?;
    outcome.into_table().write_csv(csv_path)?;
    if policy == CachePolicy::Fingerprint {
        fs::write(fingerprint_path(csv_path), job_fingerprint(job)?)?;
    }
    ResultTable::read_csv(csv_path)
}
