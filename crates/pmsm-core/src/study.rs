//! Standard studies built on the sweep engine.
//!
//! Each study is planned as one or two cached sweeps sharing a scratch
//! directory, then analyzed from the re-read CSV tables:
//!
//! * `static`: no current, rotor stepped over 0..90 degrees; cogging torque and
//!   back-EMF.
//! * `moving`: rated current with the electrical angle locked to the rotor.
//! * `sweep_1d`: standstill (off and on) and moving tables over `magnet_depth`.
//! * `sweep_2d`: the same over the builder outputs `x` and `y`.

use std::path::PathBuf;

use serde::Serialize;

use crate::analysis::{
    back_emf, filter_eq, group_stats, max_rows_by, pivot, sort_by, BackEmf, GroupStat, Pivot,
    PivotAgg,
};
use crate::cache::run_cached;
use crate::config::{ProjectConfig, SimulationEntry, StudyKind};
use crate::engine::{run_sweep, PoolConfig, SweepJob};
use crate::error::RunError;
use crate::result_store::ResultTable;
use crate::solver::SolverBackend;
use crate::sweep::{NestedSweep, SweepSpec, SweepValue};
use crate::sweep_json::spec_from_json;
use crate::value::{Params, Value};

/// Rotor positions per point study over a quarter turn.
pub const POINT_POSITIONS: usize = 270;
/// Rotor positions per combo in a 1D sweep.
pub const SWEEP_1D_POSITIONS: usize = 46;
/// Rotor positions per combo in a 2D sweep, over 22.5..67.5 degrees.
pub const SWEEP_2D_POSITIONS: usize = 11;
/// Offset between the electrical zero and the mechanical zero, degrees.
pub const MOVING_OFFSET_DEG: f64 = 45.0;
/// Electrical degrees per mechanical degree in point and 1D moving studies.
pub const POLE_PAIRS: f64 = 4.0;

const SWEEP_1D_AXIS: &str = "magnet_depth";
const TORQUE: &str = "torque_airgap";

/// Standstill with no current.
pub fn static_excitations() -> SweepSpec {
    SweepSpec::new()
        .with("irms", 0.0)
        .with("degel", 0.0)
        .with("degmech", SweepValue::range(0.0, 90.0, POINT_POSITIONS))
}

/// Standstill at `degel = 0`, once without and once with `peak` current.
pub fn standstill_excitations(peak: f64, start: f64, end: f64, count: usize) -> SweepSpec {
    SweepSpec::new()
        .with("irms", SweepValue::list([0.0, peak]))
        .with("degel", 0.0)
        .with("degmech", SweepValue::range(start, end, count))
}

/// Rotating at `peak` current: `degel = scale * deg`, `degmech = deg + offset`.
pub fn rotating_excitations(
    peak: f64,
    start: f64,
    end: f64,
    count: usize,
    scale: f64,
    offset: f64,
) -> SweepSpec {
    let positions = SweepSpec::new().with("deg", SweepValue::range(start, end, count));
    let pos = NestedSweep::create(positions, move |combo| {
        let deg = combo.get_f64("deg")?;
        Some(
            Params::new()
                .with("degel", scale * deg)
                .with("degmech", deg + offset),
        )
    });
    SweepSpec::new().with("irms", peak).with("pos", pos)
}

/// One cached sweep of a study.
#[derive(Debug, Clone)]
pub struct StudyPlan {
    pub csv_path: PathBuf,
    pub job: SweepJob,
}

fn csv_path(project: &ProjectConfig, name: &str, suffix: &str) -> PathBuf {
    project.results_dir(name).join(format!("{}_{}.csv", name, suffix))
}

pub fn plan_study(project: &ProjectConfig, sim: &SimulationEntry) -> Result<Vec<StudyPlan>, RunError> {
    let steps = match &sim.steps {
        Some(json) => spec_from_json(json)?,
        None => SweepSpec::new(),
    };
    let scratch = project.scratch_dir(&sim.name);
    let job = |excitations: SweepSpec| {
        let mut job = SweepJob::new(&sim.name, sim.rotor, &project.stator_path, &scratch);
        job.fixed = sim.params.clone();
        job.steps = steps.clone();
        job.excitations = excitations;
        job
    };
    let peak = project.peak_current();

    let plans = match sim.study {
        StudyKind::Static => vec![StudyPlan {
            csv_path: csv_path(project, &sim.name, "point_static"),
            job: job(static_excitations()),
        }],
        StudyKind::Moving => vec![StudyPlan {
            csv_path: csv_path(project, &sim.name, "point_movin"),
            job: job(rotating_excitations(
                peak,
                0.0,
                90.0,
                POINT_POSITIONS,
                POLE_PAIRS,
                MOVING_OFFSET_DEG,
            )),
        }],
        StudyKind::Sweep1d => vec![
            StudyPlan {
                csv_path: csv_path(project, &sim.name, "sweep_stand"),
                job: job(standstill_excitations(peak, 0.0, 90.0, SWEEP_1D_POSITIONS)),
            },
            StudyPlan {
                csv_path: csv_path(project, &sim.name, "sweep_movin"),
                job: job(rotating_excitations(
                    peak,
                    0.0,
                    90.0,
                    SWEEP_1D_POSITIONS,
                    POLE_PAIRS,
                    MOVING_OFFSET_DEG,
                )),
            },
        ],
        StudyKind::Sweep2d => vec![
            StudyPlan {
                csv_path: csv_path(project, &sim.name, "sweep_stand"),
                job: job(standstill_excitations(peak, 22.5, 67.5, SWEEP_2D_POSITIONS)),
            },
            StudyPlan {
                csv_path: csv_path(project, &sim.name, "sweep_movin"),
                job: job(rotating_excitations(
                    peak,
                    22.5,
                    67.5,
                    SWEEP_2D_POSITIONS,
                    project.symmetry_factor,
                    0.0,
                )),
            },
        ],
    };
    Ok(plans)
}

#[derive(Debug, Clone, Serialize)]
pub struct Sweep1dReport {
    /// Row of maximum torque per depth, with current.
    pub max_on: ResultTable,
    /// Row of maximum torque per depth, without current.
    pub max_off: ResultTable,
    /// `(magnet_depth, max_off / max_on)`.
    pub reluctance_ratio: Vec<(f64, f64)>,
    pub static_on: Pivot,
    pub static_off: Pivot,
    pub moving: Pivot,
    /// Mean torque and ripple per depth while rotating.
    pub moving_stats: Vec<GroupStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sweep2dReport {
    pub max_on: Pivot,
    pub max_off: Pivot,
    /// Absolute mean torque while rotating.
    pub mean: Pivot,
    pub ripple: Pivot,
    /// `max_on / max_off`, within `[0, 10]`.
    pub torque_ratio: Pivot,
    /// `ripple / mean`, within `[0, 1]`.
    pub ripple_ratio: Pivot,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "study", rename_all = "snake_case")]
pub enum StudyReport {
    Static { back_emf: BackEmf },
    Moving { back_emf: BackEmf },
    Sweep1d(Sweep1dReport),
    Sweep2d(Sweep2dReport),
}

/// Plans, runs (or loads from cache) and analyzes one queued simulation.
pub fn run_study<B: SolverBackend>(
    backend: &B,
    project: &ProjectConfig,
    sim: &SimulationEntry,
) -> Result<StudyReport, RunError> {
    let pool = PoolConfig {
        workers: project.workers,
    };
    let mut tables = Vec::new();
    for plan in plan_study(project, sim)? {
        let table = run_cached(&plan.csv_path, project.cache_policy, &plan.job, |job| {
            run_sweep(backend, job, &pool)
        })?;
        tables.push(table);
    }
    analyze_study(project, sim.study, &tables)
}

/// Analyzes the tables of one study, in the order [`plan_study`] returns them.
pub fn analyze_study(
    project: &ProjectConfig,
    study: StudyKind,
    tables: &[ResultTable],
) -> Result<StudyReport, RunError> {
    let table = |i: usize| tables.get(i).cloned().unwrap_or_default();
    let peak = Value::Float(project.peak_current());
    let off = Value::Float(0.0);

    match study {
        StudyKind::Static => {
            let rows = filter_eq(&table(0), "irms", &off);
            Ok(StudyReport::Static {
                back_emf: back_emf(&rows, project.rpm, project.symmetry_factor)?,
            })
        }
        StudyKind::Moving => {
            let rows = filter_eq(&table(0), "irms", &peak);
            Ok(StudyReport::Moving {
                back_emf: back_emf(&rows, project.rpm, project.symmetry_factor)?.negated(),
            })
        }
        StudyKind::Sweep1d => {
            let standstill = table(0);
            let moving = table(1);
            let on = filter_eq(&standstill, "irms", &peak);
            let off_rows = filter_eq(&standstill, "irms", &off);

            let max_rows = max_rows_by(&standstill, &[SWEEP_1D_AXIS, "irms"], TORQUE)?;
            let max_on = sort_by(&filter_eq(&max_rows, "irms", &peak), SWEEP_1D_AXIS);
            let max_off = sort_by(&filter_eq(&max_rows, "irms", &off), SWEEP_1D_AXIS);
            let reluctance_ratio = max_on
                .rows
                .iter()
                .filter_map(|row| {
                    let depth = row.get_f64(SWEEP_1D_AXIS)?;
                    let on_torque = row.get_f64(TORQUE)?;
                    let off_torque = max_off
                        .rows
                        .iter()
                        .find(|r| r.get_f64(SWEEP_1D_AXIS) == Some(depth))?
                        .get_f64(TORQUE)?;
                    Some((depth, off_torque / on_torque))
                })
                .collect();

            Ok(StudyReport::Sweep1d(Sweep1dReport {
                static_on: pivot(&on, SWEEP_1D_AXIS, "degmech", TORQUE, PivotAgg::First)?,
                static_off: pivot(&off_rows, SWEEP_1D_AXIS, "degmech", TORQUE, PivotAgg::First)?,
                moving: pivot(
                    &filter_eq(&moving, "irms", &peak),
                    SWEEP_1D_AXIS,
                    "degmech",
                    TORQUE,
                    PivotAgg::First,
                )?,
                moving_stats: group_stats(&moving, &[SWEEP_1D_AXIS], TORQUE)?,
                max_on,
                max_off,
                reluctance_ratio,
            }))
        }
        StudyKind::Sweep2d => {
            let standstill = table(0);
            let moving = filter_eq(&table(1), "irms", &peak);

            let max_on = pivot(&filter_eq(&standstill, "irms", &peak), "x", "y", TORQUE, PivotAgg::Max)?.fill(0.0);
            let max_off = pivot(&filter_eq(&standstill, "irms", &off), "x", "y", TORQUE, PivotAgg::Max)?.fill(0.0);

            let stats = stats_table(&group_stats(&moving, &["x", "y"], TORQUE)?, &["x", "y"]);
            let mean = pivot(&stats, "x", "y", "mean", PivotAgg::First)?.fill(0.0).abs();
            let ripple = pivot(&stats, "x", "y", "ripple", PivotAgg::First)?.fill(0.0);

            Ok(StudyReport::Sweep2d(Sweep2dReport {
                torque_ratio: max_on.ratio(&max_off, 0.0, 10.0),
                ripple_ratio: ripple.ratio(&mean, 0.0, 1.0),
                max_on,
                max_off,
                mean,
                ripple,
            }))
        }
    }
}

fn stats_table(stats: &[GroupStat], by: &[&str]) -> ResultTable {
    ResultTable::from_rows(
        stats
            .iter()
            .map(|stat| {
                let mut row = Params::new();
                for (name, key) in by.iter().zip(&stat.key) {
                    row.insert(name, *key);
                }
                row.insert("mean", stat.mean);
                row.insert("ripple", stat.std);
                row
            })
            .collect(),
    )
}

pub fn debug_dump_report(name: &str, report: &StudyReport) {
    match report {
        StudyReport::Static { back_emf } | StudyReport::Moving { back_emf } => {
            println!("study {}: samples={}", name, back_emf.time_ms.len())
        }
        StudyReport::Sweep1d(r) => println!(
            "study {}: depths={} positions={}",
            name,
            r.static_on.index.len(),
            r.static_on.columns.len()
        ),
        StudyReport::Sweep2d(r) => println!(
            "study {}: x={} y={}",
            name,
            r.max_on.index.len(),
            r.max_on.columns.len()
        ),
    }
}
