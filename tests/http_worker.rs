//! HTTP tests against an in-process stand-in for the Rails key-value app
//!
//! The stand-in stores every insert as a new row, like a model without a
//! uniqueness constraint, so racing inserts show up as duplicates.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use kvbench::bench::{BenchSpec, BspBenchmark, Worker};
use kvbench::config::BenchConfig;
use kvbench::driver::HostControl;
use kvbench::models::OpKind;
use kvbench::remote::RemoteHosts;
use kvbench::smoke::{run_smoke, write_smoke};
use serde_json::{json, Value};

type Rows = Arc<Mutex<HashMap<String, Vec<String>>>>;

async fn insert(State(rows): State<Rows>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let key = body["key"].as_str().unwrap_or_default().to_string();
    let value = body["value"].as_str().unwrap_or_default().to_string();
    rows.lock()
        .unwrap()
        .entry(key.clone())
        .or_default()
        .push(value.clone());
    (StatusCode::CREATED, Json(json!({ "key": key, "value": value })))
}

async fn update(
    State(rows): State<Rows>,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> StatusCode {
    let value = body["value"].as_str().unwrap_or_default().to_string();
    match rows.lock().unwrap().get_mut(&key) {
        Some(values) => {
            for v in values.iter_mut() {
                *v = value.clone();
            }
            StatusCode::OK
        }
        None => StatusCode::NOT_FOUND,
    }
}

async fn fetch(
    State(rows): State<Rows>,
    Path(key): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let rows = rows.lock().unwrap();
    let value = rows
        .get(&key)
        .and_then(|values| values.first())
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(json!({ "key": key, "value": value })))
}

async fn remove(State(rows): State<Rows>, Path(key): Path<String>) -> StatusCode {
    match rows.lock().unwrap().remove(&key) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

fn spawn_app(model: &str) -> (String, u16, Rows) {
    let rows = Rows::default();
    let collection = format!("/{}s", model);
    let member = format!("/{}s/:key", model);
    let app = Router::new()
        .route(&collection, post(insert))
        .route(&member, get(fetch).put(update).delete(remove))
        .with_state(rows.clone());

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app.into_make_service());
    tokio::spawn(async move {
        server.await.unwrap();
    });

    (format!("http://127.0.0.1:{}", port), port, rows)
}

#[tokio::test]
async fn test_worker_endpoints() {
    let (base_url, _, rows) = spawn_app("simple_key_value");
    let worker = Worker::new(&base_url, "simple_key_value", Duration::from_secs(5)).unwrap();

    let res = worker.insert_kvp("alpha", "one").await.unwrap();
    assert_eq!(res.status, 201);
    assert!(res.is_success());

    let res = worker.update_kvp("alpha", "two").await.unwrap();
    assert_eq!(res.status, 200);
    assert_eq!(rows.lock().unwrap()["alpha"], vec!["two".to_string()]);

    let res = worker.get_kvp("alpha").await.unwrap();
    assert_eq!(res.status, 200);
    let body: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(body["value"], "two");

    let res = worker.get_kvp("missing").await.unwrap();
    assert_eq!(res.status, 404);
    assert!(!res.is_success());

    let res = worker.execute(OpKind::Delete, "alpha", "").await.unwrap();
    assert_eq!(res.status, 204);
    assert!(rows.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_smoke_sequence() {
    let (base_url, _, rows) = spawn_app("unique_key_value");
    let worker = Worker::new(&base_url, "unique_key_value", Duration::from_secs(5)).unwrap();

    let steps = run_smoke(&worker).await.unwrap();

    let statuses: Vec<u16> = steps.iter().map(|s| s.response.status).collect();
    assert_eq!(statuses, vec![201, 200, 200, 404, 204]);
    assert!(rows.lock().unwrap().is_empty());

    let mut out = Vec::new();
    write_smoke(&mut out, &steps).unwrap();
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[2].starts_with("get test: 200"));
    assert!(lines[2].contains("unique_key_value"));
    assert!(lines[3].starts_with("get baz: 404"));
}

#[tokio::test]
async fn test_bsp_benchmark_records_every_request() {
    let (base_url, _, rows) = spawn_app("simple_key_value");
    let bench = BspBenchmark::new(base_url, Duration::from_secs(5))
        .unwrap()
        .with_key_prefix("t");

    let result = bench
        .run(&BenchSpec::new("simple_key_value", 4, 3))
        .await
        .unwrap();

    assert_eq!(result.model, "simple_key_value");
    assert_eq!(result.ops.len(), 3);
    for op in [OpKind::Insert, OpKind::Update, OpKind::Get] {
        assert_eq!(result.ops[&op].requests, 12);
        assert_eq!(result.ops[&op].errors, 0);
    }
    assert_eq!(result.total_requests(), 36);

    // every client inserted the shared key of each trial
    let rows = rows.lock().unwrap();
    assert_eq!(rows.len(), 3);
    for trial in 0..3 {
        assert_eq!(rows[&format!("t-{}", trial)].len(), 4);
    }
}

#[tokio::test]
async fn test_bsp_benchmark_counts_error_statuses() {
    let (base_url, _, _) = spawn_app("simple_key_value");
    // updating and reading before anything is inserted yields 404s
    let bench = BspBenchmark::new(base_url, Duration::from_secs(5))
        .unwrap()
        .with_phases(vec![OpKind::Update, OpKind::Get]);

    let result = bench
        .run(&BenchSpec::new("simple_key_value", 2, 2))
        .await
        .unwrap();

    assert_eq!(result.ops[&OpKind::Update].errors, 4);
    assert_eq!(result.ops[&OpKind::Get].errors, 4);
    assert_eq!(result.total_errors(), 4 + 4);
}

#[tokio::test]
async fn test_remote_hosts_benchmark_uses_given_host() {
    let (_, port, rows) = spawn_app("indexed_key_value");
    let mut config = BenchConfig::default().with_progress(false);
    config.hosts.app_port = port;

    let hosts = RemoteHosts::from_config(&config);
    let result = hosts
        .run_benchmark("127.0.0.1", &BenchSpec::new("indexed_key_value", 2, 2))
        .await
        .unwrap();

    assert_eq!(result.total_requests(), 2 * 2 * 3);
    assert_eq!(rows.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_server_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let worker = Worker::new(
        &format!("http://127.0.0.1:{}", port),
        "simple_key_value",
        Duration::from_secs(2),
    )
    .unwrap();
    assert!(worker.get_kvp("alpha").await.is_err());
}

#[tokio::test]
async fn test_remote_hosts_smoke_uses_given_host() {
    let (_, port, rows) = spawn_app("simple_key_value");
    let mut config = BenchConfig::default();
    config.hosts.app_port = port;

    let steps = RemoteHosts::from_config(&config)
        .smoke("127.0.0.1", "simple_key_value")
        .await
        .unwrap();

    assert_eq!(steps.len(), 5);
    assert_eq!(steps[0].label, "insert test");
    assert!(rows.lock().unwrap().is_empty());
}
