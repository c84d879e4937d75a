//! Integration tests for `JobController`.
//!
//! A shell script stands in for the trainer binary. It honours the stop
//! file named in its config artifact and prints epoch records in the
//! trainer's format.

#![cfg(unix)]

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use atelier_api::engine::JobStatus;
use atelier_api::error::AppError;
use atelier_core::protocol::ProgressEvent;
use common::{
    build_controller, drain_events, next_event, wait_for, write_trainer, TRAINER_IGNORES_STOP,
    TRAINER_UNTIL_STOPPED,
};
use serde_json::json;

fn overrides(value: serde_json::Value) -> atelier_core::protocol::TrainingOverrides {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// Test: start writes the config artifact and runs the trainer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_writes_config_and_streams_progress() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller
        .start_job(&overrides(json!({ "maxEpoch": 50, "datafile": "iris.csv" })))
        .await
        .unwrap();
    assert_eq!(controller.status(), JobStatus::Running);

    let paths = &controller.settings().paths;
    let config = std::fs::read_to_string(&paths.config_file).unwrap();
    assert!(config.contains("maxEpoch = 50\n"));
    assert!(config.contains("datafile = iris.csv\n"));
    assert!(config.contains(&format!("stopFile = {}\n", paths.stop_file.display())));
    assert!(!config.contains("category"));
    assert_eq!(std::fs::read_to_string(&paths.stop_file).unwrap(), "");

    // Progress eventually shows up on the observer channel.
    loop {
        if let ProgressEvent::Progress { .. } = next_event(&mut rx).await {
            break;
        }
    }

    controller.stop_job(false).await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: a second start while running is rejected
// ---------------------------------------------------------------------------

#[tokio::test]
async fn second_start_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);

    controller.start_job(&overrides(json!({}))).await.unwrap();
    let second = controller.start_job(&overrides(json!({ "maxEpoch": 5 }))).await;

    assert_matches!(second, Err(AppError::AlreadyRunning));
    // The first job's config was left untouched.
    let config = std::fs::read_to_string(&controller.settings().paths.config_file).unwrap();
    assert!(config.contains("maxEpoch = -1\n"));

    controller.stop_job(false).await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: stop with notify joins the trainer, then sends Completed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_joins_trainer_then_sends_completed() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller.start_job(&overrides(json!({}))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    controller.stop_job(true).await.unwrap();

    let paths = &controller.settings().paths;
    assert_eq!(controller.status(), JobStatus::Idle);
    assert_eq!(std::fs::read_to_string(&paths.stop_file).unwrap(), "1");
    // The launcher's export step ran before the stop returned.
    assert!(paths.export_script_file.exists());

    let events = drain_events(&mut rx);
    assert_eq!(events.last(), Some(&ProgressEvent::Completed));
    assert_eq!(
        events.iter().filter(|e| **e == ProgressEvent::Completed).count(),
        1
    );
}

// ---------------------------------------------------------------------------
// Test: stopTraining through handle_message is acted on only when running
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_message_when_idle_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller.handle_message(r#"{"category":"stopTraining"}"#).await;

    assert_eq!(controller.status(), JobStatus::Idle);
    assert!(drain_events(&mut rx).is_empty());
}

// ---------------------------------------------------------------------------
// Test: start and stop messages drive a full job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn messages_drive_full_job() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller
        .handle_message(r#"{"category":"startTraining","layers":"2 3 1","format":"csv"}"#)
        .await;
    assert!(controller.is_running());

    loop {
        if let ProgressEvent::Progress { .. } = next_event(&mut rx).await {
            break;
        }
    }

    controller.handle_message(r#"{"category":"stopTraining"}"#).await;
    assert!(!controller.is_running());
    assert_eq!(drain_events(&mut rx).last(), Some(&ProgressEvent::Completed));
}

// ---------------------------------------------------------------------------
// Test: malformed and unknown messages leave the job alone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_messages_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);

    controller.handle_message("not json").await;
    controller.handle_message(r#"{"layers":"2 3 1"}"#).await;
    controller.handle_message(r#"{"category":"pauseTraining"}"#).await;

    assert_eq!(controller.status(), JobStatus::Idle);
    assert!(!controller.settings().paths.config_file.exists());
}

// ---------------------------------------------------------------------------
// Test: a new observer silently stops the running job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_stops_job_without_completed() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let _old_rx = controller.on_observer_connected("conn-1").await;

    controller.start_job(&overrides(json!({}))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rx = controller.on_observer_connected("conn-2").await;

    assert_eq!(controller.status(), JobStatus::Idle);
    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = drain_events(&mut rx);
    assert!(!events.contains(&ProgressEvent::Completed));
}

// ---------------------------------------------------------------------------
// Test: a trainer that ignores the stop file times the stop out
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_timeout_leaves_job_running() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_IGNORES_STOP);
    let controller = build_controller(dir.path(), trainer, Some(Duration::from_millis(200)));
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller.start_job(&overrides(json!({}))).await.unwrap();

    let result = controller.stop_job(true).await;

    assert_matches!(result, Err(AppError::StopTimedOut { .. }));
    assert!(controller.is_running());
    assert!(!drain_events(&mut rx).contains(&ProgressEvent::Completed));

    // Once the trainer exits on its own the job returns to Idle.
    wait_for(|| !controller.is_running()).await;
    controller.stop_job(false).await.unwrap();
}

// ---------------------------------------------------------------------------
// Test: a restart after a stop runs a fresh job
// ---------------------------------------------------------------------------

#[tokio::test]
async fn restart_after_stop_runs_again() {
    let dir = tempfile::tempdir().unwrap();
    let trainer = write_trainer(dir.path(), TRAINER_UNTIL_STOPPED);
    let controller = build_controller(dir.path(), trainer, None);
    let mut rx = controller.on_observer_connected("conn-1").await;

    controller.start_job(&overrides(json!({}))).await.unwrap();
    controller.stop_job(false).await.unwrap();
    drain_events(&mut rx);

    // The stale stop marker is cleared on start.
    controller.start_job(&overrides(json!({}))).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&controller.settings().paths.stop_file).unwrap(),
        ""
    );
    loop {
        if let ProgressEvent::Progress { .. } = next_event(&mut rx).await {
            break;
        }
    }
    assert!(controller.is_running());

    controller.stop_job(false).await.unwrap();
}
