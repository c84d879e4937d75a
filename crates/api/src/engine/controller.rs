//! Job controller.
//!
//! Owns the single training job: accepts start and stop requests from the
//! observer, writes the config artifact and the stop file, spawns the
//! watcher and launcher, and joins both when a stop is requested.
//!
//! State machine:
//!
//! ```text
//! Idle --start--> Running --trainer exits--> Idle
//! Running --stop(notify)--> Idle, then Completed is sent
//! any --observer connects--> stop(silent)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::Message;
use atelier_core::paths::{JobPaths, STOP_MARKER};
use atelier_core::protocol::{ObserverCommand, ProgressEvent, TrainingOverrides};
use atelier_core::training_config::TrainingConfig;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::engine::job_state::{JobState, JobStatus};
use crate::engine::launcher::Launcher;
use crate::engine::watcher::{ProgressWatcher, WatcherSettings};
use crate::error::{AppError, AppResult};
use crate::ws::ObserverSession;

/// Everything the controller needs to run a job.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub paths: JobPaths,
    pub executable: PathBuf,
    pub watcher: WatcherSettings,
    /// `None` makes a stop wait for the trainer indefinitely.
    pub stop_timeout: Option<Duration>,
}

impl ControllerSettings {
    pub fn from_config(config: &ServerConfig, executable: PathBuf) -> Self {
        Self {
            paths: config.job_paths(),
            executable,
            watcher: config.watcher_settings(),
            stop_timeout: config.stop_timeout,
        }
    }
}

/// Tasks spawned for one job.
struct JobTasks {
    launcher: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

pub struct JobController {
    settings: ControllerSettings,
    state: Arc<JobState>,
    observer: Arc<ObserverSession>,
    /// Tasks of the current job. Held across a stop's join so concurrent
    /// start/stop requests queue behind it.
    worker: Mutex<Option<JobTasks>>,
}

impl JobController {
    pub fn new(settings: ControllerSettings, observer: Arc<ObserverSession>) -> Self {
        Self {
            settings,
            state: Arc::new(JobState::new()),
            observer,
            worker: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    pub fn observer(&self) -> &Arc<ObserverSession> {
        &self.observer
    }

    pub fn status(&self) -> JobStatus {
        self.state.status()
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// Install `conn_id` as the observer, then silently stop any job.
    ///
    /// The reset runs whether or not a job was running, so a reloaded
    /// front-end never inherits an orphaned run. Returns the receiver of
    /// the new observer's outbound messages.
    pub async fn on_observer_connected(&self, conn_id: &str) -> mpsc::UnboundedReceiver<Message> {
        let rx = self.observer.install(conn_id.to_string()).await;
        if let Err(e) = self.stop_job(false).await {
            tracing::error!(conn_id = %conn_id, error = %e, "Reset on connect failed");
        }
        rx
    }

    /// Decode and act on one observer text frame.
    ///
    /// Every failure is logged here; nothing is reported back to the
    /// observer.
    pub async fn handle_message(&self, text: &str) {
        let command = match ObserverCommand::parse(text) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(error = %e, raw = %text, "Malformed observer message");
                return;
            }
        };
        tracing::debug!(?command, "Observer command received");

        match command {
            ObserverCommand::StartTraining(overrides) => match self.start_job(&overrides).await {
                Ok(()) => {}
                Err(AppError::AlreadyRunning) => {
                    tracing::warn!("Start requested while a training job is already running");
                }
                Err(e) => tracing::error!(error = %e, "Failed to start training job"),
            },
            ObserverCommand::StopTraining => {
                if !self.is_running() {
                    tracing::warn!("Stop requested while no training job is running");
                    return;
                }
                tracing::info!("Halting training job");
                match self.stop_job(true).await {
                    Ok(()) => tracing::info!("Training job halted"),
                    Err(e) => tracing::error!(error = %e, "Failed to stop training job"),
                }
            }
            ObserverCommand::Unknown(category) => {
                tracing::warn!(%category, "Unknown observer message category");
            }
        }
    }

    /// Start a job with `overrides` merged over the default config.
    ///
    /// Rejected with [`AppError::AlreadyRunning`] unless the job is Idle.
    /// Returns as soon as the watcher and launcher are spawned; the
    /// observer learns about the start through the first progress event.
    pub async fn start_job(&self, overrides: &TrainingOverrides) -> AppResult<()> {
        let mut worker = self.worker.lock().await;

        let Some(generation) = self.state.try_start() else {
            return Err(AppError::AlreadyRunning);
        };
        tracing::info!(generation, "Initializing training job");

        if let Err(e) = self.prepare_files(overrides).await {
            self.state.finish(generation);
            return Err(e);
        }

        let paths = &self.settings.paths;
        let watcher = ProgressWatcher::new(
            paths.output_file.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.observer),
            self.settings.watcher,
        );
        let watcher = tokio::spawn(watcher.run(generation));

        let launcher = Launcher::new(
            self.settings.executable.clone(),
            paths.clone(),
            Arc::clone(&self.state),
        );
        *worker = Some(JobTasks {
            launcher: tokio::spawn(launcher.run(generation)),
            watcher,
        });

        tracing::info!(generation, "Training job started");
        Ok(())
    }

    /// Write the config artifact and clear any stale stop marker.
    async fn prepare_files(&self, overrides: &TrainingOverrides) -> AppResult<()> {
        let paths = &self.settings.paths;
        let config = TrainingConfig::from_overrides(paths, overrides);
        tracing::info!(config = ?config.entries().collect::<Vec<_>>(), "Writing configuration file");

        tokio::fs::write(&paths.config_file, config.render())
            .await
            .map_err(|e| AppError::io(&paths.config_file, e))?;
        tokio::fs::write(&paths.stop_file, "")
            .await
            .map_err(|e| AppError::io(&paths.stop_file, e))?;
        Ok(())
    }

    /// Ask the trainer to stop and wait until the launcher has returned.
    ///
    /// The stop file is written whether or not a job is running. With
    /// `notify_observer` a Completed event is sent, strictly after the
    /// launcher and the watcher have finished. If a stop timeout is
    /// configured and expires, the job is left running and no event is
    /// sent.
    pub async fn stop_job(&self, notify_observer: bool) -> AppResult<()> {
        let mut worker = self.worker.lock().await;

        let stop_file = &self.settings.paths.stop_file;
        tokio::fs::write(stop_file, STOP_MARKER)
            .await
            .map_err(|e| AppError::io(stop_file, e))?;

        if let Some(mut tasks) = worker.take() {
            let joined = match self.settings.stop_timeout {
                Some(limit) => tokio::time::timeout(limit, &mut tasks.launcher).await.ok(),
                None => Some((&mut tasks.launcher).await),
            };
            match joined {
                Some(Ok(())) => {}
                Some(Err(e)) => tracing::error!(error = %e, "Launcher task failed"),
                None => {
                    let secs = self.settings.stop_timeout.map_or(0, |d| d.as_secs());
                    tracing::error!(
                        generation = self.state.generation(),
                        timeout_secs = secs,
                        "Trainer ignored the stop request; job is stuck",
                    );
                    *worker = Some(tasks);
                    return Err(AppError::StopTimedOut { secs });
                }
            }
            // No sample may follow Completed. The watcher exits within one
            // interval of the job going Idle.
            if let Err(e) = tasks.watcher.await {
                tracing::error!(error = %e, "Watcher task failed");
            }
        }
        drop(worker);

        if notify_observer {
            if let Err(e) = self.observer.send_event(&ProgressEvent::Completed).await {
                tracing::warn!(error = %e, "Completion event not delivered");
            }
        }
        Ok(())
    }
}
