//! `atelier-api` -- local control plane for the trainer.
//!
//! Serves one observer over WebSocket, launches the platform trainer on
//! request, streams its progress, and stops it cooperatively.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atelier_core::platform::{self, UNSUPPORTED_PLATFORM_EXIT_CODE};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use atelier_api::config::ServerConfig;
use atelier_api::engine::{ControllerSettings, JobController};
use atelier_api::state::AppState;
use atelier_api::{routes, ws};

/// Delay before opening the front-end, so the listener is up first.
const UI_OPEN_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "atelier_api=debug,atelier_core=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        std::process::exit(1);
    });
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Trainer executable ---
    let executable = match &config.trainer_executable {
        Some(path) => path.clone(),
        None => platform::host_trainer_executable(&config.bin_dir).unwrap_or_else(|e| {
            tracing::error!(error = %e, "No trainer available for this platform");
            std::process::exit(UNSUPPORTED_PLATFORM_EXIT_CODE);
        }),
    };
    tracing::info!(executable = %executable.display(), "Resolved trainer executable");

    // --- Temp directory ---
    if let Err(e) = tokio::fs::create_dir_all(&config.tmp_dir).await {
        tracing::error!(path = %config.tmp_dir.display(), error = %e, "Failed to create temp directory");
        std::process::exit(1);
    }

    // --- Observer session + heartbeat ---
    let observer = Arc::new(ws::ObserverSession::new());
    let heartbeat_handle = ws::start_heartbeat(Arc::clone(&observer));

    // --- Job controller ---
    let controller = Arc::new(JobController::new(
        ControllerSettings::from_config(&config, executable),
        Arc::clone(&observer),
    ));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        controller: Arc::clone(&controller),
    };
    let app = routes::build_router(state);

    // --- Start server ---
    let addr = match config.host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, config.port),
        Err(e) => {
            tracing::error!(host = %config.host, error = %e, "Invalid HOST address");
            std::process::exit(1);
        }
    };
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "Failed to bind to address");
            std::process::exit(1);
        }
    };
    tracing::info!(%addr, "Starting server");

    if config.open_browser {
        spawn_open_ui(config.ui_file.clone());
    }

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "Server error");
    }

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Err(e) = controller.stop_job(false).await {
        tracing::error!(error = %e, "Failed to stop training job during shutdown");
    }
    observer.shutdown().await;

    heartbeat_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Open the bundled front-end in the default browser after a short delay.
///
/// A missing page is logged and otherwise ignored.
fn spawn_open_ui(ui_file: PathBuf) {
    tokio::spawn(async move {
        tokio::time::sleep(UI_OPEN_DELAY).await;

        let page = match tokio::fs::canonicalize(&ui_file).await {
            Ok(page) => page,
            Err(e) => {
                tracing::error!(path = %ui_file.display(), error = %e, "Front-end page not found");
                return;
            }
        };

        tracing::info!(path = %page.display(), "Opening front-end page");
        match tokio::task::spawn_blocking(move || open::that(&page)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to open browser"),
            Err(e) => tracing::warn!(error = %e, "Browser launcher task failed"),
        }
    });
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
