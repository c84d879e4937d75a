//! Trainer process launcher.
//!
//! Runs the trainer with the config artifact as its only argument and its
//! stdout redirected into the output sink, waits for it to exit, then
//! derives the front-end import script from the network export. The job
//! returns to Idle when the launcher finishes, however it finishes.
//!
//! The trainer is never killed from here. Stopping it early is only ever
//! requested through the stop file.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use atelier_core::export;
use atelier_core::paths::JobPaths;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::engine::job_state::JobState;
use crate::error::{AppError, AppResult};

/// Maximum stderr captured from the trainer (64 KiB).
const MAX_STDERR_BYTES: u64 = 64 * 1024;

pub struct Launcher {
    executable: PathBuf,
    paths: JobPaths,
    state: Arc<JobState>,
}

/// Returns the job to Idle when dropped, including on panic or abort.
struct FinishOnDrop {
    state: Arc<JobState>,
    generation: u64,
}

impl Drop for FinishOnDrop {
    fn drop(&mut self) {
        if self.state.finish(self.generation) {
            tracing::info!(generation = self.generation, "Training job finished");
        }
    }
}

impl Launcher {
    pub fn new(executable: PathBuf, paths: JobPaths, state: Arc<JobState>) -> Self {
        Self {
            executable,
            paths,
            state,
        }
    }

    /// Run job `generation` to completion.
    ///
    /// Trainer and export failures are logged, never propagated.
    pub async fn run(self, generation: u64) {
        let _finish = FinishOnDrop {
            state: Arc::clone(&self.state),
            generation,
        };

        match self.run_trainer().await {
            Ok(status) if status.success() => {
                tracing::info!(generation, "Trainer exited successfully");
            }
            Ok(status) => {
                tracing::warn!(generation, exit_code = ?status.code(), "Trainer exited with failure");
            }
            Err(e) => {
                tracing::error!(generation, error = %e, "Trainer could not be run");
            }
        }

        tracing::info!(generation, "Copying exported network into the import script");
        if let Err(e) = self.export_import_script().await {
            tracing::error!(generation, error = %e, "Export post-processing failed");
        }
    }

    /// Spawn the trainer and wait for it to exit.
    async fn run_trainer(&self) -> AppResult<ExitStatus> {
        let sink = tokio::fs::File::create(&self.paths.output_file)
            .await
            .map_err(|e| AppError::io(&self.paths.output_file, e))?
            .into_std()
            .await;

        tracing::info!(
            executable = %self.executable.display(),
            config = %self.paths.config_file.display(),
            output = %self.paths.output_file.display(),
            "Launching trainer",
        );

        let mut child = Command::new(&self.executable)
            .arg(&self.paths.config_file)
            .stdin(Stdio::null())
            .stdout(Stdio::from(sink))
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AppError::io(&self.executable, e))?;

        // Drain stderr concurrently so a chatty trainer cannot block on a
        // full pipe while we wait for it.
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(stderr) = stderr {
                let _ = stderr
                    .take(MAX_STDERR_BYTES)
                    .read_to_end(&mut buf)
                    .await;
            }
            buf
        });

        let status = child
            .wait()
            .await
            .map_err(|e| AppError::io(&self.executable, e))?;

        let stderr = stderr_task.await.unwrap_or_default();
        let stderr = String::from_utf8_lossy(&stderr);
        if !stderr.trim().is_empty() {
            tracing::info!(stderr = %stderr.trim(), "Trainer stderr");
        }

        Ok(status)
    }

    /// Turn the network export into the front-end import script.
    async fn export_import_script(&self) -> AppResult<()> {
        let export_file = &self.paths.export_file;
        let script_file = &self.paths.export_script_file;

        let bytes = tokio::fs::read(export_file)
            .await
            .map_err(|e| AppError::io(export_file, e))?;
        let script = export::render_import_script(&String::from_utf8_lossy(&bytes));
        tokio::fs::write(script_file, script)
            .await
            .map_err(|e| AppError::io(script_file, e))?;

        tracing::info!(path = %script_file.display(), "Import script written");
        Ok(())
    }
}
