use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use pmsm_core::config::check_sim_name;
use pmsm_core::engine::{PoolConfig, SweepJob, DEFAULT_WORKERS};
use pmsm_core::femm::FemmConfig;
use pmsm_core::result_store::{ResultTable, SweepRecord};
use pmsm_core::rotor::RotorKind;
use pmsm_core::sweep_json::spec_from_json;
use pmsm_core::{expand, Params, SweepError, SweepSpec, TaskError};
use pmsm_geometry::rotors::{INNER_RADIUS, OUTER_RADIUS};
use pmsm_geometry::{Document, DrawingPrimitive};

#[derive(Debug, Clone, Deserialize)]
pub struct ExpandRequest {
    pub sweep: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpandResponse {
    pub count: usize,
    pub combos: Vec<Params>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreviewRequest {
    pub rotor: String,
    #[serde(default)]
    pub params: Params,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewResponse {
    pub rotor: RotorKind,
    pub derived: Params,
    pub primitives: Vec<DrawingPrimitive>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunSweepRequest {
    pub name: String,
    pub rotor: String,
    pub stator_path: PathBuf,
    /// Scratch artifacts go to `<scratch_root>/<name>_steps`.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,
    #[serde(default)]
    pub params: Params,
    pub steps: serde_json::Value,
    /// Inner states solved per combo; one standstill state when absent.
    #[serde(default)]
    pub excitations: Option<serde_json::Value>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub femm: FemmConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunAccepted {
    pub run_id: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub run_id: usize,
    pub name: String,
    pub status: String,
    pub completed: usize,
    pub dropped: usize,
    pub total: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Params>,
    pub message: Option<String>,
}

pub fn expand_sweep(request: &ExpandRequest) -> Result<ExpandResponse, SweepError> {
    let spec = spec_from_json(&request.sweep)?;
    let combos = expand(&spec)?;
    Ok(ExpandResponse {
        count: combos.len(),
        combos,
    })
}

/// Builds `kind` into a bare quarter-rotor document and returns what was
/// drawn. `outer_radius` and `inner_radius` in `params` size the outline.
pub fn preview_rotor(kind: RotorKind, params: &Params) -> Result<PreviewResponse, TaskError> {
    let outer = params.get_f64("outer_radius").unwrap_or(OUTER_RADIUS);
    let inner = params.get_f64("inner_radius").unwrap_or(INNER_RADIUS);
    let mut doc = Document::quarter_rotor(outer, inner);
    let derived = kind.build(params, &mut doc)?;
    Ok(PreviewResponse {
        rotor: kind,
        derived,
        primitives: doc.primitives(),
    })
}

pub fn standstill_state() -> SweepSpec {
    SweepSpec::new()
        .with("irms", 0.0)
        .with("degel", 0.0)
        .with("degmech", 0.0)
}

/// Turns a run request into a job and its pool, checking everything that
/// would otherwise fail on every combo.
pub fn sweep_job(request: &RunSweepRequest) -> Result<(SweepJob, PoolConfig), String> {
    check_sim_name(&request.name)?;
    let rotor = RotorKind::parse(&request.rotor)
        .ok_or_else(|| format!("unknown rotor '{}'", request.rotor))?;
    if !request.stator_path.is_file() {
        return Err(format!(
            "stator template not found: {}",
            request.stator_path.display()
        ));
    }
    let workers = request.workers.unwrap_or(DEFAULT_WORKERS);
    if workers == 0 {
        return Err("workers must be at least 1".to_string());
    }

    let root = request
        .scratch_root
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("pmsm-sweeps"));
    let scratch = root.join(format!("{}_steps", request.name));
    let mut job = SweepJob::new(&request.name, rotor, &request.stator_path, &scratch);
    job.fixed = request.params.clone();
    job.steps = spec_from_json(&request.steps).map_err(|err| err.to_string())?;
    job.excitations = match &request.excitations {
        Some(raw) => spec_from_json(raw).map_err(|err| err.to_string())?,
        None => standstill_state(),
    };
    Ok((job, PoolConfig { workers }))
}

pub fn sweep_to_response(record: &SweepRecord) -> SweepResponse {
    let table = record.table.clone().unwrap_or_else(ResultTable::new);
    SweepResponse {
        run_id: record.id.0,
        name: record.name.clone(),
        status: format!("{:?}", record.status).to_ascii_lowercase(),
        completed: record.completed,
        dropped: record.dropped,
        total: record.total,
        columns: table.columns,
        rows: table.rows,
        message: record.message.clone(),
    }
}
