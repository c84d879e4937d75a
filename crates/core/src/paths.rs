//! On-disk layout shared between the server and the trainer process.
//!
//! Every file the trainer reads or writes lives directly under one
//! temporary directory. The names are part of the contract with the
//! trainer binary and must not change.

use std::path::{Path, PathBuf};

/// Cancellation sentinel polled by the trainer.
pub const STOP_FILE_NAME: &str = "myStopFile";

/// Output sink the trainer's stdout is redirected into.
pub const OUTPUT_FILE_NAME: &str = "progression";

/// Primary network export written by the trainer.
pub const EXPORT_FILE_NAME: &str = "export.nn";

/// Import script derived from the export for the front-end.
pub const EXPORT_SCRIPT_FILE_NAME: &str = "export.js";

/// Configuration artifact handed to the trainer as its only argument.
pub const CONFIG_FILE_NAME: &str = "config.txt";

/// Marker written into the stop file to request cancellation.
pub const STOP_MARKER: &str = "1";

/// Resolved paths of every file involved in a single training job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub tmp_dir: PathBuf,
    pub stop_file: PathBuf,
    pub output_file: PathBuf,
    pub export_file: PathBuf,
    pub export_script_file: PathBuf,
    pub config_file: PathBuf,
}

impl JobPaths {
    /// Lay out all job files under `tmp_dir`.
    pub fn new(tmp_dir: impl AsRef<Path>) -> Self {
        let tmp_dir = tmp_dir.as_ref().to_path_buf();
        Self {
            stop_file: tmp_dir.join(STOP_FILE_NAME),
            output_file: tmp_dir.join(OUTPUT_FILE_NAME),
            export_file: tmp_dir.join(EXPORT_FILE_NAME),
            export_script_file: tmp_dir.join(EXPORT_SCRIPT_FILE_NAME),
            config_file: tmp_dir.join(CONFIG_FILE_NAME),
            tmp_dir,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
