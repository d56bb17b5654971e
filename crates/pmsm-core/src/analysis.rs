//! Post-processing of result tables: filtering, pivots, grouped statistics and
//! back-EMF from flux linkage.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::RunError;
use crate::result_store::ResultTable;
use crate::value::{Params, Value};

pub fn constrain(value: f64, min: f64, max: f64) -> f64 {
    value.max(min).min(max)
}

pub fn filter_eq(table: &ResultTable, column: &str, value: &Value) -> ResultTable {
    ResultTable {
        columns: table.columns.clone(),
        rows: table
            .rows
            .iter()
            .filter(|row| row.get(column).is_some_and(|v| v.loosely_eq(value)))
            .cloned()
            .collect(),
    }
}

/// Stable ascending sort on a numeric column; rows without it go last.
pub fn sort_by(table: &ResultTable, column: &str) -> ResultTable {
    let mut rows = table.rows.clone();
    rows.sort_by(|a, b| cmp_opt(a.get_f64(column), b.get_f64(column)));
    ResultTable {
        columns: table.columns.clone(),
        rows,
    }
}

fn cmp_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn cmp_keys(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn require(table: &ResultTable, column: &str) -> Result<(), RunError> {
    if table.is_empty() || table.has_column(column) {
        Ok(())
    } else {
        Err(RunError::MissingColumn(column.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PivotAgg {
    First,
    Max,
    Mean,
}

/// 2D table with sorted numeric axes. Cells with no source row are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pivot {
    pub index: Vec<f64>,
    pub columns: Vec<f64>,
    pub cells: Vec<Vec<Option<f64>>>,
}

impl Pivot {
    pub fn get(&self, index: f64, column: f64) -> Option<f64> {
        let i = self.index.iter().position(|v| *v == index)?;
        let j = self.columns.iter().position(|v| *v == column)?;
        self.cells[i][j]
    }

    pub fn fill(&self, value: f64) -> Pivot {
        self.map(|cell| Some(cell.unwrap_or(value)))
    }

    pub fn abs(&self) -> Pivot {
        self.map(|cell| cell.map(f64::abs))
    }

    pub fn map(&self, f: impl Fn(Option<f64>) -> Option<f64>) -> Pivot {
        Pivot {
            index: self.index.clone(),
            columns: self.columns.clone(),
            cells: self
                .cells
                .iter()
                .map(|row| row.iter().map(|c| f(*c)).collect())
                .collect(),
        }
    }

    /// Cell-wise `self / other` on the axes of `self`, matched by label. Missing
    /// cells count as 0 and `0 / 0` becomes 0; the result is clamped to
    /// `[min, max]`.
    pub fn ratio(&self, other: &Pivot, min: f64, max: f64) -> Pivot {
        let mut out = self.fill(0.0);
        for (i, x) in self.index.iter().enumerate() {
            for (j, y) in self.columns.iter().enumerate() {
                let a = self.cells[i][j].unwrap_or(0.0);
                let b = other.get(*x, *y).unwrap_or(0.0);
                let q = a / b;
                out.cells[i][j] = Some(constrain(if q.is_nan() { 0.0 } else { q }, min, max));
            }
        }
        out
    }
}

pub fn pivot(
    table: &ResultTable,
    index: &str,
    columns: &str,
    values: &str,
    agg: PivotAgg,
) -> Result<Pivot, RunError> {
    for column in [index, columns, values] {
        require(table, column)?;
    }

    let mut cells: Vec<((f64, f64), Vec<f64>)> = Vec::new();
    for row in &table.rows {
        let (Some(x), Some(y), Some(v)) = (row.get_f64(index), row.get_f64(columns), row.get_f64(values))
        else {
            continue;
        };
        match cells.iter_mut().find(|(k, _)| *k == (x, y)) {
            Some((_, seen)) => seen.push(v),
            None => cells.push(((x, y), vec![v])),
        }
    }

    let index_axis = sorted_unique(cells.iter().map(|((x, _), _)| *x));
    let column_axis = sorted_unique(cells.iter().map(|((_, y), _)| *y));
    let mut out = vec![vec![None; column_axis.len()]; index_axis.len()];
    for ((x, y), seen) in &cells {
        let i = index_axis.iter().position(|v| v == x);
        let j = column_axis.iter().position(|v| v == y);
        if let (Some(i), Some(j)) = (i, j) {
            out[i][j] = aggregate(seen, agg);
        }
    }
    Ok(Pivot {
        index: index_axis,
        columns: column_axis,
        cells: out,
    })
}

fn aggregate(values: &[f64], agg: PivotAgg) -> Option<f64> {
    match agg {
        PivotAgg::First => values.first().copied(),
        PivotAgg::Max => values.iter().copied().max_by(f64::total_cmp),
        PivotAgg::Mean => mean(values),
    }
}

fn sorted_unique(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut out: Vec<f64> = values.collect();
    out.sort_by(f64::total_cmp);
    out.dedup();
    out
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some((values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64).sqrt())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStat {
    pub key: Vec<f64>,
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl GroupStat {
    /// `std / mean`, the relative torque ripple.
    pub fn ripple_ratio(&self) -> f64 {
        self.std / self.mean
    }
}

fn group_rows<'a>(table: &'a ResultTable, by: &[&str], value: &str) -> Vec<(Vec<f64>, Vec<&'a Params>)> {
    let mut groups: Vec<(Vec<f64>, Vec<&Params>)> = Vec::new();
    for row in &table.rows {
        let key: Option<Vec<f64>> = by.iter().map(|k| row.get_f64(k)).collect();
        let (Some(key), Some(_)) = (key, row.get_f64(value)) else {
            continue;
        };
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    groups.sort_by(|a, b| cmp_keys(&a.0, &b.0));
    groups
}

/// Mean and population std of `value` per distinct key of `by`, sorted by key.
pub fn group_stats(table: &ResultTable, by: &[&str], value: &str) -> Result<Vec<GroupStat>, RunError> {
    for column in by.iter().copied().chain([value]) {
        require(table, column)?;
    }
    Ok(group_rows(table, by, value)
        .into_iter()
        .filter_map(|(key, members)| {
            let values: Vec<f64> = members.iter().filter_map(|r| r.get_f64(value)).collect();
            Some(GroupStat {
                key,
                mean: mean(&values)?,
                std: std_dev(&values)?,
                count: values.len(),
            })
        })
        .collect())
}

/// The row with the largest `value` in each group of `by`; the first row wins
/// ties. Groups come out sorted by key.
pub fn max_rows_by(table: &ResultTable, by: &[&str], value: &str) -> Result<ResultTable, RunError> {
    for column in by.iter().copied().chain([value]) {
        require(table, column)?;
    }
    let mut out = ResultTable {
        columns: table.columns.clone(),
        rows: Vec::new(),
    };
    for (_, members) in group_rows(table, by, value) {
        let mut best: Option<&Params> = None;
        for row in members {
            let better = match best {
                None => true,
                Some(current) => cmp_opt(row.get_f64(value), current.get_f64(value)) == Ordering::Greater,
            };
            if better {
                best = Some(row);
            }
        }
        if let Some(row) = best {
            out.rows.push(row.clone());
        }
    }
    Ok(out)
}

/// Torque and induced voltages over one sampled rotation, times in ms.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackEmf {
    pub time_ms: Vec<f64>,
    pub torque: Vec<f64>,
    /// Midpoints of `time_ms`, where the differentiated voltages live.
    pub mid_time_ms: Vec<f64>,
    pub phase: Vec<f64>,
    pub line: Vec<f64>,
}

impl BackEmf {
    /// Same curves with the voltage sign flipped.
    pub fn negated(mut self) -> Self {
        self.phase.iter_mut().for_each(|v| *v = -*v);
        self.line.iter_mut().for_each(|v| *v = -*v);
        self
    }
}

/// Back-EMF from the flux linkage of phases A and C over `degmech`.
///
/// With `n` rows spanning `amin..amax` degrees at `rpm`, the time step is
/// `dt = (amax - amin) / 360 * T / n` with `T = 60 / rpm`. Phase voltage is
/// `symmetry_factor * d(flux_a)/dt`; line voltage is phase A minus phase C.
pub fn back_emf(table: &ResultTable, rpm: f64, symmetry_factor: f64) -> Result<BackEmf, RunError> {
    for column in ["degmech", "torque_airgap", "flux_a", "flux_c"] {
        require(table, column)?;
    }
    let sorted = sort_by(table, "degmech");
    let rows: Vec<&Params> = sorted
        .rows
        .iter()
        .filter(|r| r.get_f64("degmech").is_some())
        .collect();
    let n = rows.len();
    if n == 0 || rpm <= 0.0 {
        return Ok(BackEmf::default());
    }

    let angles: Vec<f64> = rows.iter().filter_map(|r| r.get_f64("degmech")).collect();
    let amin = angles.iter().copied().fold(f64::INFINITY, f64::min);
    let amax = angles.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let period = 60.0 / rpm;
    let dt = (amax - amin) / 360.0 * period / n as f64;

    let column = |name: &str| -> Vec<f64> { rows.iter().map(|r| r.get_f64(name).unwrap_or(f64::NAN)).collect() };
    let torque = column("torque_airgap");
    let flux_a = column("flux_a");
    let flux_c = column("flux_c");

    let time: Vec<f64> = (0..n).map(|i| i as f64 * dt).collect();
    let mut emf = BackEmf {
        time_ms: time.iter().map(|t| t * 1000.0).collect(),
        torque,
        ..BackEmf::default()
    };
    if n < 2 || dt <= 0.0 {
        return Ok(emf);
    }

    let derivative = |flux: &[f64]| -> Vec<f64> {
        flux.windows(2)
            .map(|w| symmetry_factor * (w[1] - w[0]) / dt)
            .collect()
    };
    let va = derivative(&flux_a);
    let vc = derivative(&flux_c);
    emf.mid_time_ms = time[..n - 1].iter().map(|t| (t + dt / 2.0) * 1000.0).collect();
    emf.line = va.iter().zip(&vc).map(|(a, c)| a - c).collect();
    emf.phase = va;
    Ok(emf)
}

pub fn debug_dump_pivot(name: &str, pivot: &Pivot) {
    println!(
        "pivot {}: index={} columns={}",
        name,
        pivot.index.len(),
        pivot.columns.len()
    );
}
