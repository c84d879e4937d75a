#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ws::Message;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

use atelier_api::config::ServerConfig;
use atelier_api::engine::watcher::WatcherSettings;
use atelier_api::engine::{ControllerSettings, JobController};
use atelier_api::routes;
use atelier_api::state::AppState;
use atelier_api::ws::ObserverSession;
use atelier_core::paths::JobPaths;
use atelier_core::protocol::ProgressEvent;

/// Upper bound on any single wait in the tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// Prints one epoch record every 50 ms until the stop file holds `1`, then
/// writes a two-line network export.
pub const TRAINER_UNTIL_STOPPED: &str = r#"
stop=$(sed -n 's/^stopFile = //p' "$1")
export=$(sed -n 's/^export = //p' "$1")
echo "Loading training data"
i=1
while [ "$i" -le 400 ]; do
  if [ "$(cat "$stop" 2>/dev/null)" = "1" ]; then
    break
  fi
  echo "Epoch $i : train 0.5 test 0.4 elapsed 1s test accuracy:9$i.5% mse 0.00$i"
  i=$((i + 1))
  sleep 0.05
done
printf 'layers 2 3 1\nweights 0.1 0.2\n' > "$export"
"#;

/// Never looks at the stop file.
pub const TRAINER_IGNORES_STOP: &str = r#"
echo "Loading training data"
sleep 3
"#;

/// Prints one line and exits without exporting anything.
pub const TRAINER_NO_EXPORT: &str = r#"
echo "Epoch 1 : train 0.5 test 0.4 elapsed 1s test accuracy:50.0% mse 0.25"
"#;

/// Write a shell script trainer into `dir` and make it executable.
#[cfg(unix)]
pub fn write_trainer(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake_trainer.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Watcher timings short enough for tests.
pub fn fast_watcher() -> WatcherSettings {
    WatcherSettings {
        grace: Duration::from_millis(10),
        interval: Duration::from_millis(20),
    }
}

/// Build a controller whose job files live under `tmp_dir`.
pub fn build_controller(
    tmp_dir: &Path,
    executable: PathBuf,
    stop_timeout: Option<Duration>,
) -> Arc<JobController> {
    let settings = ControllerSettings {
        paths: JobPaths::new(tmp_dir),
        executable,
        watcher: fast_watcher(),
        stop_timeout,
    };
    Arc::new(JobController::new(settings, Arc::new(ObserverSession::new())))
}

/// Build the full application router around `controller`.
pub fn build_test_app(controller: Arc<JobController>) -> Router {
    let config = ServerConfig {
        port: 0,
        open_browser: false,
        ..ServerConfig::default()
    };
    routes::build_router(AppState {
        config: Arc::new(config),
        controller,
    })
}

/// Receive the next message queued for an observer.
pub async fn next_message(rx: &mut UnboundedReceiver<Message>) -> Message {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for an observer message")
        .expect("observer channel closed")
}

/// Receive the next progress event queued for an observer.
pub async fn next_event(rx: &mut UnboundedReceiver<Message>) -> ProgressEvent {
    match next_message(rx).await {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

/// Drain everything currently queued for an observer.
pub fn drain_events(rx: &mut UnboundedReceiver<Message>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        if let Message::Text(text) = msg {
            events.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    events
}

/// Poll until `condition` holds or [`WAIT`] elapses.
pub async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

/// Send a GET request through the router.
pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
