//! Sweep orchestration.
//!
//! Combos from `job.steps` are fanned out over a bounded rayon pool; each task
//! owns one solver session and one artifact file in the scratch directory and
//! walks every inner state from `job.excitations`. Results come back over a
//! channel in completion order. A failed or panicking combo is logged and
//! dropped; the sweep itself only fails on setup errors.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Instant;

use log::{info, warn};

use crate::error::{RunError, TaskError};
use crate::result_store::ResultTable;
use crate::rotor::RotorKind;
use crate::solver::{Excitation, SolverBackend, SolverSession};
use crate::sweep::{expand, SweepSpec};
use crate::value::Params;

pub const DEFAULT_WORKERS: usize = 12;
/// Key holding a combo's 1-based slot in [`CollectMode::Slots`].
pub const SLOT_KEY: &str = "kk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub workers: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectMode {
    /// Every row of every combo, in completion order.
    #[default]
    Table,
    /// One map per combo: the first row, stored at the combo's slot.
    Slots,
}

#[derive(Debug, Clone)]
pub struct SweepJob {
    pub name: String,
    pub rotor: RotorKind,
    /// Merged under every combo.
    pub fixed: Params,
    pub steps: SweepSpec,
    pub excitations: SweepSpec,
    pub template: PathBuf,
    pub scratch_dir: PathBuf,
    pub mode: CollectMode,
}

impl SweepJob {
    pub fn new(name: &str, rotor: RotorKind, template: &Path, scratch_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            rotor,
            fixed: Params::new(),
            steps: SweepSpec::new(),
            excitations: SweepSpec::new(),
            template: template.to_path_buf(),
            scratch_dir: scratch_dir.to_path_buf(),
            mode: CollectMode::Table,
        }
    }
}

/// Everything one task needs to simulate one combo.
#[derive(Debug)]
pub struct TaskInput<'a> {
    /// 0-based submission index.
    pub index: usize,
    pub fixed: &'a Params,
    pub combo: &'a Params,
    pub inner: &'a [Params],
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    Table(ResultTable),
    Slots(Vec<Params>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepOutcome {
    pub collected: Collected,
    pub completed: usize,
    pub dropped: usize,
    pub total: usize,
}

impl SweepOutcome {
    /// Table view of the outcome. Empty slots are skipped.
    pub fn into_table(self) -> ResultTable {
        match self.collected {
            Collected::Table(table) => table,
            Collected::Slots(slots) => {
                ResultTable::from_rows(slots.into_iter().filter(|s| !s.is_empty()).collect())
            }
        }
    }
}

pub fn artifact_path(scratch_dir: &Path, index: usize) -> PathBuf {
    scratch_dir.join(format!("step_{:05}.fem", index))
}

fn prepare_scratch(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

/// Runs `job` with the default task against `backend`.
pub fn run_sweep<B: SolverBackend>(
    backend: &B,
    job: &SweepJob,
    pool: &PoolConfig,
) -> Result<SweepOutcome, RunError> {
    run_sweep_with(job, pool, |input| {
        simulate_combo(backend, job.rotor, &job.template, input)
    })
}

pub fn run_sweep_with<F>(job: &SweepJob, pool: &PoolConfig, task: F) -> Result<SweepOutcome, RunError>
where
    F: Fn(&TaskInput<'_>) -> Result<Vec<Params>, TaskError> + Sync,
{
    let combos = expand(&job.steps)?;
    let inner = expand(&job.excitations)?;
    prepare_scratch(&job.scratch_dir)?;

    let workers = rayon::ThreadPoolBuilder::new()
        .num_threads(pool.workers.max(1))
        .thread_name(|i| format!("sweep-worker-{}", i))
        .build()
        .map_err(|e| RunError::Pool(e.to_string()))?;

    let total = combos.len();
    info!(
        "starting sweep {} ({} combos x {} states, {} workers)",
        job.name,
        total,
        inner.len(),
        pool.workers.max(1)
    );

    let started = Instant::now();
    let mut collector = Collector::new(job.mode, total);
    let (tx, rx) = mpsc::channel::<(usize, Result<Vec<Params>, TaskError>)>();
    let workers = &workers;
    let combos = &combos;
    let inner = inner.as_slice();
    let task = &task;

    std::thread::scope(|scope| {
        scope.spawn(move || {
            workers.scope(|s| {
                for (index, combo) in combos.iter().enumerate() {
                    let tx = tx.clone();
                    s.spawn(move |_| {
                        let input = TaskInput {
                            index,
                            fixed: &job.fixed,
                            combo,
                            inner,
                            artifact: artifact_path(&job.scratch_dir, index),
                        };
                        let result = panic::catch_unwind(AssertUnwindSafe(|| task(&input)))
                            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));
                        // receiver outlives the pool scope
                        let _ = tx.send((index, result));
                    });
                }
            });
        });

        for (index, result) in rx {
            collector.accept(index, result, started.elapsed().as_secs_f64());
        }
    });

    info!(
        "finished sweep {} in {}",
        job.name,
        format_duration(started.elapsed().as_secs_f64())
    );
    Ok(collector.finish())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

struct Collector {
    mode: CollectMode,
    total: usize,
    done: usize,
    completed: usize,
    dropped: usize,
    table: ResultTable,
    slots: Vec<Params>,
}

impl Collector {
    fn new(mode: CollectMode, total: usize) -> Self {
        let slots = match mode {
            CollectMode::Slots => vec![Params::new(); total],
            CollectMode::Table => Vec::new(),
        };
        Self {
            mode,
            total,
            done: 0,
            completed: 0,
            dropped: 0,
            table: ResultTable::new(),
            slots,
        }
    }

    fn accept(&mut self, index: usize, result: Result<Vec<Params>, TaskError>, elapsed_secs: f64) {
        self.done += 1;
        match result {
            Ok(rows) => {
                self.completed += 1;
                self.store(index, rows);
                let remaining = elapsed_secs * (self.total - self.done) as f64 / self.done as f64;
                info!(
                    "ran step {}/{} ({:.2}%). time remaining: {}",
                    self.done,
                    self.total,
                    100.0 * self.done as f64 / self.total as f64,
                    format_duration(remaining)
                );
            }
            Err(err) => {
                self.dropped += 1;
                warn!("dropped step {}/{}: {}", self.done, self.total, err);
            }
        }
    }

    fn store(&mut self, index: usize, rows: Vec<Params>) {
        match self.mode {
            CollectMode::Table => {
                for row in rows {
                    self.table.push(row);
                }
            }
            CollectMode::Slots => {
                let Some(first) = rows.into_iter().next() else {
                    return;
                };
                let slot = first
                    .get_f64(SLOT_KEY)
                    .filter(|k| *k >= 1.0 && k.fract() == 0.0)
                    .map(|k| k as usize - 1)
                    .unwrap_or(index);
                if let Some(target) = self.slots.get_mut(slot) {
                    target.merge(&first);
                }
            }
        }
    }

    fn finish(self) -> SweepOutcome {
        let collected = match self.mode {
            CollectMode::Table => Collected::Table(self.table),
            CollectMode::Slots => Collected::Slots(self.slots),
        };
        SweepOutcome {
            collected,
            completed: self.completed,
            dropped: self.dropped,
            total: self.total,
        }
    }
}

/// Default task: one session, one rotor, every inner state solved in order.
/// The session is closed whether or not the combo succeeds.
pub fn simulate_combo<B: SolverBackend>(
    backend: &B,
    rotor: RotorKind,
    template: &Path,
    input: &TaskInput<'_>,
) -> Result<Vec<Params>, TaskError> {
    let mut session = backend.open(template, &input.artifact)?;
    let result = simulate_in_session(&mut session, rotor, input);
    session.close();
    result
}

fn simulate_in_session<S: SolverSession>(
    session: &mut S,
    rotor: RotorKind,
    input: &TaskInput<'_>,
) -> Result<Vec<Params>, TaskError> {
    let mut row = input.fixed.merged(input.combo);
    if let Some(first) = input.inner.first() {
        row.merge(first);
    }
    let derived = rotor.build(&row, session)?;
    row.merge(&derived);

    let mut rows = Vec::with_capacity(input.inner.len());
    for state in input.inner {
        row.merge(state);
        let excitation = Excitation::from_params(&row)?;
        let outputs = session.solve(&excitation)?;
        outputs.write_into(&mut row);
        rows.push(row.clone());
    }
    Ok(rows)
}

/// `1 week, 2 days, 3 hours, 4 minutes`; minutes are always present.
pub fn format_duration(seconds: f64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const WEEK: u64 = 7 * DAY;

    let mut rest = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let weeks = rest / WEEK;
    rest %= WEEK;
    let days = rest / DAY;
    rest %= DAY;
    let hours = rest / HOUR;
    rest %= HOUR;
    let minutes = rest / MINUTE;

    let mut parts = Vec::new();
    for (count, unit) in [(weeks, "week"), (days, "day"), (hours, "hour")] {
        if count > 0 {
            parts.push(format!("{} {}{}", count, unit, if count > 1 { "s" } else { "" }));
        }
    }
    parts.push(format!("{} minute{}", minutes, if minutes != 1 { "s" } else { "" }));
    parts.join(", ")
}

pub fn debug_dump_outcome(outcome: &SweepOutcome) {
    let rows = match &outcome.collected {
        Collected::Table(table) => table.len(),
        Collected::Slots(slots) => slots.iter().filter(|s| !s.is_empty()).count(),
    };
    println!(
        "sweep: total={} completed={} dropped={} rows={}",
        outcome.total, outcome.completed, outcome.dropped, rows
    );
}
