mod support_coordinator;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::json;
use tempfile::tempdir;

use support_coordinator::{
    FakeCoordinator, spawn_http_server, spawn_swarmer, wait_for_exit,
};

const NODE_ID: &str = "e2e-node";
const STEP_TIMEOUT: Duration = Duration::from_secs(10);

fn write_definitions(dir: &tempfile::TempDir, url: &str) -> Result<PathBuf, String> {
    let path = dir.path().join("definitions.json");
    let document = json!([
        {
            "name": "index",
            "url": url,
            "method": "GET",
            "weight": { "constant": 1 }
        }
    ]);
    fs::write(&path, document.to_string())
        .map_err(|err| format!("write definitions failed: {}", err))?;
    Ok(path)
}

fn worker_args(port: u16, definitions: &Path) -> Vec<String> {
    vec![
        "--master-host".to_owned(),
        "127.0.0.1".to_owned(),
        "--master-port".to_owned(),
        port.to_string(),
        "--test-definitions".to_owned(),
        definitions.to_string_lossy().into_owned(),
        "--node-id".to_owned(),
        NODE_ID.to_owned(),
        "--max-rps".to_owned(),
        "50".to_owned(),
    ]
}

fn requests_in(stats: &serde_json::Value) -> u64 {
    stats
        .pointer("/data/stats_total/num_requests")
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0)
}

#[test]
fn e2e_hatch_stop_quit_cycle() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let definitions = write_definitions(&dir, &url)?;
    let coordinator = FakeCoordinator::bind()?;

    let mut child = spawn_swarmer(worker_args(coordinator.port()?, &definitions))?;
    let mut conn = coordinator.accept(STEP_TIMEOUT)?;

    let ready = conn.expect("client_ready", STEP_TIMEOUT)?;
    if ready.get("node_id").and_then(serde_json::Value::as_str) != Some(NODE_ID) {
        return Err(format!("unexpected client_ready frame: {}", ready));
    }

    conn.send(&json!({
        "type": "hatch",
        "data": { "num_clients": 2, "hatch_rate": 2 }
    }))?;
    conn.expect("hatching", STEP_TIMEOUT)?;
    let complete = conn.expect("hatch_complete", STEP_TIMEOUT)?;
    if complete.get("count").and_then(serde_json::Value::as_u64) != Some(2) {
        return Err(format!("unexpected hatch_complete frame: {}", complete));
    }

    let stats = conn.expect_matching("stats", STEP_TIMEOUT, |frame| requests_in(frame) > 0)?;
    if stats
        .pointer("/data/user_count")
        .and_then(serde_json::Value::as_u64)
        != Some(2)
    {
        return Err(format!("unexpected user_count: {}", stats));
    }
    if stats
        .pointer("/data/stats_total/num_failures")
        .and_then(serde_json::Value::as_u64)
        != Some(0)
    {
        return Err(format!("requests against the test server failed: {}", stats));
    }

    conn.send(&json!({ "type": "stop" }))?;
    conn.expect("client_stopped", STEP_TIMEOUT)?;
    conn.expect("client_ready", STEP_TIMEOUT)?;

    conn.send(&json!({ "type": "quit" }))?;
    let status = wait_for_exit(&mut child, STEP_TIMEOUT)?;
    if !status.success() {
        return Err(format!("swarmer exited with {}", status));
    }
    Ok(())
}

#[test]
fn e2e_invalid_hatch_keeps_worker_ready() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let definitions = write_definitions(&dir, &url)?;
    let coordinator = FakeCoordinator::bind()?;

    let mut child = spawn_swarmer(worker_args(coordinator.port()?, &definitions))?;
    let mut conn = coordinator.accept(STEP_TIMEOUT)?;
    conn.expect("client_ready", STEP_TIMEOUT)?;

    conn.send(&json!({
        "type": "hatch",
        "data": { "num_clients": 0, "hatch_rate": 1 }
    }))?;
    conn.send(&json!({
        "type": "hatch",
        "data": { "num_clients": 1, "hatch_rate": 1 }
    }))?;
    conn.expect("hatching", STEP_TIMEOUT)?;
    let complete = conn.expect("hatch_complete", STEP_TIMEOUT)?;
    if complete.get("count").and_then(serde_json::Value::as_u64) != Some(1) {
        return Err(format!("unexpected hatch_complete frame: {}", complete));
    }

    conn.send(&json!({ "type": "quit" }))?;
    let status = wait_for_exit(&mut child, STEP_TIMEOUT)?;
    if !status.success() {
        return Err(format!("swarmer exited with {}", status));
    }
    Ok(())
}

#[test]
fn e2e_coordinator_hangup_fails_the_worker() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let definitions = write_definitions(&dir, &url)?;
    let coordinator = FakeCoordinator::bind()?;

    let mut child = spawn_swarmer(worker_args(coordinator.port()?, &definitions))?;
    let mut conn = coordinator.accept(STEP_TIMEOUT)?;
    conn.expect("client_ready", STEP_TIMEOUT)?;
    conn.hang_up();

    let status = wait_for_exit(&mut child, STEP_TIMEOUT)?;
    if status.success() {
        return Err("worker should fail when the coordinator disappears".to_owned());
    }
    Ok(())
}

#[test]
fn e2e_run_tasks_once_without_coordinator() -> Result<(), String> {
    let (url, _server) = spawn_http_server()?;
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let definitions = write_definitions(&dir, &url)?;

    let mut child = spawn_swarmer([
        "--test-definitions".to_owned(),
        definitions.to_string_lossy().into_owned(),
        "--run-tasks".to_owned(),
        "index".to_owned(),
    ])?;
    let status = wait_for_exit(&mut child, STEP_TIMEOUT)?;
    if !status.success() {
        return Err(format!("run-tasks exited with {}", status));
    }
    Ok(())
}

#[test]
fn e2e_missing_definitions_file_fails() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let missing = dir.path().join("absent.json");

    let mut child = spawn_swarmer([
        "--test-definitions".to_owned(),
        missing.to_string_lossy().into_owned(),
        "--master-port".to_owned(),
        "1".to_owned(),
    ])?;
    let status = wait_for_exit(&mut child, STEP_TIMEOUT)?;
    if status.success() {
        return Err("missing definitions should fail".to_owned());
    }
    Ok(())
}
