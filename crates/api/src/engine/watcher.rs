//! Progress watcher.
//!
//! Samples the trainer's output sink while its job is running and pushes
//! one event per sample to the observer. Each sample re-reads the whole
//! sink and looks only at its last line, so a sink rewritten between
//! samples is handled the same as one that was appended to.
//!
//! The watcher is never cancelled explicitly: it stops on its own once the
//! job it was started for is no longer the running job.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use atelier_core::progress::{self, ProgressTracker};
use atelier_core::protocol::ProgressEvent;

use crate::engine::job_state::JobState;
use crate::error::{AppError, AppResult};
use crate::ws::ObserverSession;

/// Timing of the sampling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Delay before the first sample, giving the trainer time to create
    /// its output sink.
    pub grace: Duration,
    /// Delay before every sample.
    pub interval: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(500),
            interval: Duration::from_millis(200),
        }
    }
}

pub struct ProgressWatcher {
    output_file: PathBuf,
    state: Arc<JobState>,
    observer: Arc<ObserverSession>,
    settings: WatcherSettings,
}

impl ProgressWatcher {
    pub fn new(
        output_file: PathBuf,
        state: Arc<JobState>,
        observer: Arc<ObserverSession>,
        settings: WatcherSettings,
    ) -> Self {
        Self {
            output_file,
            state,
            observer,
            settings,
        }
    }

    /// Run the sampling loop for job `generation` until it stops running.
    ///
    /// No per-sample failure ends the loop: unreadable sinks, malformed
    /// lines and missing observers are logged and the next sample proceeds
    /// after the usual interval.
    pub async fn run(self, generation: u64) {
        tokio::time::sleep(self.settings.grace).await;
        tracing::info!(generation, path = %self.output_file.display(), "Progress watcher started");

        let mut tracker = ProgressTracker::new();
        while self.state.is_current(generation) {
            tokio::time::sleep(self.settings.interval).await;

            let event = match self.sample(&mut tracker).await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(generation, error = %e, "Progress sample skipped");
                    continue;
                }
            };

            if !self.state.is_current(generation) {
                break;
            }
            if let ProgressEvent::Progress { epoch, accuracy, mse } = &event {
                tracing::debug!(generation, %epoch, %accuracy, %mse, "Epoch record read");
            }
            if let Err(e) = self.observer.send_event(&event).await {
                tracing::warn!(generation, error = %e, "Progress event not delivered");
            }
        }

        tracing::info!(generation, "Progress watcher ended");
    }

    /// Read the sink and classify its last line.
    async fn sample(&self, tracker: &mut ProgressTracker) -> AppResult<Option<ProgressEvent>> {
        let bytes = tokio::fs::read(&self.output_file)
            .await
            .map_err(|e| AppError::io(&self.output_file, e))?;
        let contents = String::from_utf8_lossy(&bytes);
        let line = progress::last_line(&contents)?;
        tracing::trace!(line, "Output sink sampled");
        Ok(tracker.observe(line)?)
    }
}
