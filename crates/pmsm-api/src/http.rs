use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use log::{info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex};

use pmsm_core::engine::{run_sweep, PoolConfig, SweepJob};
use pmsm_core::expand;
use pmsm_core::femm::{FemmBackend, FemmConfig};
use pmsm_core::result_store::{RunId, SweepRecord, SweepStatus, SweepStore};
use pmsm_core::rotor::RotorKind;

use crate::schema::{
    expand_sweep, preview_rotor, sweep_job, sweep_to_response, ExpandRequest, PreviewRequest,
    RunAccepted, RunSweepRequest,
};

pub struct HttpServerConfig {
    pub bind_addr: String,
}

#[derive(Clone, Default)]
pub struct ApiState {
    store: Arc<Mutex<SweepStore>>,
}

impl ApiState {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    details: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

pub async fn run(config: HttpServerConfig) -> Result<(), String> {
    let app = build_router(ApiState::new());
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|err| format!("bind {} failed: {}", config.bind_addr, err))?;
    info!("listening on {}", config.bind_addr);
    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/v1/sweeps/expand", post(expand_combos))
        .route("/v1/sweeps/run", post(start_sweep))
        .route("/v1/sweeps/{id}", get(get_sweep))
        .route("/v1/geometry/preview", post(preview))
        .with_state(state)
}

async fn expand_combos(Json(payload): Json<ExpandRequest>) -> impl IntoResponse {
    match expand_sweep(&payload) {
        Ok(response) => Json(response).into_response(),
        Err(err) => api_error(
            StatusCode::BAD_REQUEST,
            "SWEEP_ERROR",
            "sweep expansion failed",
            Some(vec![err.to_string()]),
        ),
    }
}

async fn preview(Json(payload): Json<PreviewRequest>) -> impl IntoResponse {
    let Some(kind) = RotorKind::parse(&payload.rotor) else {
        return api_error(
            StatusCode::BAD_REQUEST,
            "UNKNOWN_ROTOR",
            &format!("unknown rotor '{}'", payload.rotor),
            None,
        );
    };
    match preview_rotor(kind, &payload.params) {
        Ok(response) => Json(response).into_response(),
        Err(err) => api_error(
            StatusCode::BAD_REQUEST,
            "BUILD_ERROR",
            "rotor build failed",
            Some(vec![err.to_string()]),
        ),
    }
}

async fn start_sweep(
    State(state): State<ApiState>,
    Json(payload): Json<RunSweepRequest>,
) -> impl IntoResponse {
    let (job, pool) = match sweep_job(&payload) {
        Ok(value) => value,
        Err(err) => {
            return api_error(StatusCode::BAD_REQUEST, "INVALID_REQUEST", &err, None);
        }
    };
    let total = match expand(&job.steps) {
        Ok(combos) => combos.len(),
        Err(err) => {
            return api_error(
                StatusCode::BAD_REQUEST,
                "SWEEP_ERROR",
                "sweep expansion failed",
                Some(vec![err.to_string()]),
            );
        }
    };

    let run_id = {
        let mut store = match state.store.lock() {
            Ok(guard) => guard,
            Err(_) => {
                return api_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "result store is unavailable",
                    None,
                );
            }
        };
        let mut record = SweepRecord::running(&job.name);
        record.total = total;
        store.add_run(record)
    };

    let femm = payload.femm.clone();
    let store = Arc::clone(&state.store);
    tokio::task::spawn_blocking(move || execute(store, run_id, job, pool, femm));

    (
        StatusCode::ACCEPTED,
        Json(RunAccepted {
            run_id: run_id.0,
            total,
        }),
    )
        .into_response()
}

fn execute(
    store: Arc<Mutex<SweepStore>>,
    run_id: RunId,
    job: SweepJob,
    pool: PoolConfig,
    femm: FemmConfig,
) {
    let backend = FemmBackend::new(femm);
    let result = run_sweep(&backend, &job, &pool);
    let Ok(mut store) = store.lock() else {
        warn!("sweep {} finished but the store is poisoned", job.name);
        return;
    };
    let Some(record) = store.get_mut(run_id) else {
        return;
    };
    match result {
        Ok(outcome) => {
            record.status = SweepStatus::Completed;
            record.completed = outcome.completed;
            record.dropped = outcome.dropped;
            record.total = outcome.total;
            record.table = Some(outcome.into_table());
        }
        Err(err) => {
            warn!("sweep {} failed: {}", job.name, err);
            record.status = SweepStatus::Failed;
            record.message = Some(err.to_string());
        }
    }
}

async fn get_sweep(State(state): State<ApiState>, Path(id): Path<usize>) -> impl IntoResponse {
    let store = match state.store.lock() {
        Ok(guard) => guard,
        Err(_) => {
            return api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORE_ERROR",
                "result store is unavailable",
                None,
            );
        }
    };
    match store.get(RunId(id)) {
        Some(record) => Json(sweep_to_response(record)).into_response(),
        None => api_error(
            StatusCode::NOT_FOUND,
            "RUN_NOT_FOUND",
            "run_id not found",
            None,
        ),
    }
}

fn api_error(
    status: StatusCode,
    code: &str,
    message: &str,
    details: Option<Vec<String>>,
) -> axum::response::Response {
    let body = ErrorResponse {
        error: ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
            details,
        },
    };
    (status, Json(body)).into_response()
}
