//! Result Cache Tests
//!
//! A cached sweep must not touch the solver again; the fingerprint policy
//! re-runs when the resolved sweep changes.

mod common;

use common::MockBackend;
use pmsm_core::cache::{fingerprint_path, job_fingerprint, run_cached, CachePolicy};
use pmsm_core::engine::{run_sweep, PoolConfig, SweepJob};
use pmsm_core::rotor::RotorKind;
use pmsm_core::sweep::{SweepSpec, SweepValue};

fn job(scratch: &std::path::Path, depths: &[f64]) -> SweepJob {
    let mut job = SweepJob::new("cached", RotorKind::Surface, &scratch.join("stator.fem"), scratch);
    job.steps = SweepSpec::new().with("magnet_depth", SweepValue::list(depths.iter().copied()));
    job.excitations = SweepSpec::new()
        .with("irms", 0.0)
        .with("degel", 0.0)
        .with("degmech", SweepValue::range(0.0, 45.0, 2));
    job
}

#[test]
fn second_run_opens_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("sims").join("cached_point_static.csv");
    let job = job(&dir.path().join("steps"), &[3.0, 4.0]);
    let backend = MockBackend::default();
    let pool = PoolConfig { workers: 2 };

    let first = run_cached(&csv, CachePolicy::PathExists, &job, |j| run_sweep(&backend, j, &pool)).unwrap();
    assert_eq!(backend.counters.opens(), 2);
    assert_eq!(first.len(), 4);

    let second = run_cached(&csv, CachePolicy::PathExists, &job, |j| run_sweep(&backend, j, &pool)).unwrap();
    assert_eq!(backend.counters.opens(), 2);
    assert_eq!(first, second);
}

#[test]
fn path_policy_serves_stale_results() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("stale.csv");
    let backend = MockBackend::default();
    let pool = PoolConfig { workers: 2 };

    let scratch = dir.path().join("steps");
    run_cached(&csv, CachePolicy::PathExists, &job(&scratch, &[3.0]), |j| run_sweep(&backend, j, &pool))
        .unwrap();
    let changed = job(&scratch, &[3.0, 4.0, 5.0]);
    let table = run_cached(&csv, CachePolicy::PathExists, &changed, |j| run_sweep(&backend, j, &pool)).unwrap();
    assert_eq!(backend.counters.opens(), 1);
    assert_eq!(table.len(), 2);
}

#[test]
fn fingerprint_policy_reruns_on_change() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("fp.csv");
    let scratch = dir.path().join("steps");
    let backend = MockBackend::default();
    let pool = PoolConfig { workers: 2 };

    run_cached(&csv, CachePolicy::Fingerprint, &job(&scratch, &[3.0]), |j| run_sweep(&backend, j, &pool))
        .unwrap();
    assert!(fingerprint_path(&csv).exists());
    run_cached(&csv, CachePolicy::Fingerprint, &job(&scratch, &[3.0]), |j| run_sweep(&backend, j, &pool))
        .unwrap();
    assert_eq!(backend.counters.opens(), 1);

    let table = run_cached(&csv, CachePolicy::Fingerprint, &job(&scratch, &[3.0, 4.0]), |j| {
        run_sweep(&backend, j, &pool)
    })
    .unwrap();
    assert_eq!(backend.counters.opens(), 3);
    assert_eq!(table.len(), 4);
}

#[test]
fn fingerprint_depends_on_resolved_combos() {
    let dir = tempfile::tempdir().unwrap();
    let a = job(dir.path(), &[3.0, 4.0]);
    let b = job(dir.path(), &[3.0, 4.0]);
    let c = job(dir.path(), &[4.0, 3.0]);
    assert_eq!(job_fingerprint(&a).unwrap(), job_fingerprint(&b).unwrap());
    assert_ne!(job_fingerprint(&a).unwrap(), job_fingerprint(&c).unwrap());
}

#[test]
fn cached_table_reads_back_numbers() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("numbers.csv");
    let backend = MockBackend::default();
    let pool = PoolConfig { workers: 1 };
    let table = run_cached(&csv, CachePolicy::PathExists, &job(&dir.path().join("steps"), &[3.0]), |j| {
        run_sweep(&backend, j, &pool)
    })
    .unwrap();
    let degmech: Vec<Option<f64>> = table.column_f64("degmech");
    assert_eq!(degmech, vec![Some(0.0), Some(45.0)]);
    assert!(table.has_column("torque_airgap"));
}

#[test]
fn sidecar_holds_sha256_hex_digest() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("digest.csv");
    let job = job(&dir.path().join("steps"), &[3.0]);
    let backend = MockBackend::default();
    let pool = PoolConfig { workers: 1 };

    run_cached(&csv, CachePolicy::Fingerprint, &job, |j| run_sweep(&backend, j, &pool)).unwrap();
    let stored = std::fs::read_to_string(fingerprint_path(&csv)).unwrap();
    assert_eq!(stored.len(), 64);
    assert!(stored.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(stored, job_fingerprint(&job).unwrap());
}
