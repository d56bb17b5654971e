//! HTTP Tests
//!
//! Routes exercised over a real socket with a minimal HTTP/1.1 client.

use std::net::SocketAddr;
use std::time::Duration;

use pmsm_api::http::{build_router, ApiState};
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(ApiState::new());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn send(addr: SocketAddr, method: &str, path: &str, body: Option<Value>) -> (u16, Value) {
    let body = body.map(|b| b.to_string()).unwrap_or_default();
    let request = format!(
        "{} {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        method,
        path,
        body.len(),
        body
    );
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    let (head, payload) = text.split_once("\r\n\r\n").unwrap();
    let status = head.split_whitespace().nth(1).unwrap().parse().unwrap();
    (status, serde_json::from_str(payload).unwrap_or(Value::Null))
}

#[tokio::test]
async fn expand_route_returns_combos() {
    let addr = spawn_server().await;
    let (status, body) = send(
        addr,
        "POST",
        "/v1/sweeps/expand",
        Some(json!({"sweep": {"magnet_depth": [1, 5, 3]}})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["count"], 3);
    assert_eq!(body["combos"][2]["magnet_depth"], 5.0);
}

#[tokio::test]
async fn bad_sweep_is_a_structured_error() {
    let addr = spawn_server().await;
    let (status, body) = send(
        addr,
        "POST",
        "/v1/sweeps/expand",
        Some(json!({"sweep": {"ratio": {"values": "nope"}}})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "SWEEP_ERROR");
    assert!(body["error"]["details"].is_array());
}

#[tokio::test]
async fn preview_route_builds_geometry() {
    let addr = spawn_server().await;
    let (status, body) = send(
        addr,
        "POST",
        "/v1/geometry/preview",
        Some(json!({"rotor": "vshape", "params": {"magnet_depth": 2, "magnet_angle": 20}})),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["rotor"], "vshape");
    assert!(!body["primitives"].as_array().unwrap().is_empty());

    let (status, body) = send(
        addr,
        "POST",
        "/v1/geometry/preview",
        Some(json!({"rotor": "ispoke"})),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "UNKNOWN_ROTOR");
}

#[tokio::test]
async fn unknown_run_is_not_found() {
    let addr = spawn_server().await;
    let (status, body) = send(addr, "GET", "/v1/sweeps/42", None).await;
    assert_eq!(status, 404);
    assert_eq!(body["error"]["code"], "RUN_NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn run_without_solver_drops_every_step() {
    let dir = tempfile::tempdir().unwrap();
    let stator = dir.path().join("stator.FEM");
    std::fs::write(&stator, b"[Format] = 4.0\n").unwrap();

    let addr = spawn_server().await;
    let (status, body) = send(
        addr,
        "POST",
        "/v1/sweeps/run",
        Some(json!({
            "name": "spm",
            "rotor": "surface",
            "stator_path": stator,
            "scratch_root": dir.path().join("tmp"),
            "steps": {"magnet_depth": [1, 3, 3]},
            "workers": 2,
            "femm": {"executable": "definitely-not-femm-on-this-host"}
        })),
    )
    .await;
    assert_eq!(status, 202);
    assert_eq!(body["total"], 3);
    let id = body["run_id"].as_u64().unwrap();

    let mut record = Value::Null;
    for _ in 0..100 {
        let (_, body) = send(addr, "GET", &format!("/v1/sweeps/{}", id), None).await;
        if body["status"] != "running" {
            record = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(record["status"], "completed");
    assert_eq!(record["dropped"], 3);
    assert_eq!(record["completed"], 0);
    assert!(record["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn run_with_missing_template_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let addr = spawn_server().await;
    let (status, body) = send(
        addr,
        "POST",
        "/v1/sweeps/run",
        Some(json!({
            "name": "spm",
            "rotor": "surface",
            "stator_path": dir.path().join("missing.FEM"),
            "steps": {"magnet_depth": [1, 3, 3]}
        })),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "INVALID_REQUEST");
}
