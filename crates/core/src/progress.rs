//! Trainer output classification.
//!
//! The trainer prints free-form text. Only the last line of its output
//! sink matters: if it is an epoch record it becomes a
//! [`ProgressEvent::Progress`], otherwise the job is reported as still
//! initializing until the first epoch record shows up.
//!
//! Epoch records are split on single spaces and read positionally:
//!
//! ```text
//! Epoch 3 ... ... ... ... ... ... ... ... accuracy:97.5% ... 0.0021
//! 0     1                                 10              11  12
//! ```

use crate::error::CoreError;
use crate::protocol::ProgressEvent;

/// Prefix identifying an epoch record.
pub const EPOCH_PREFIX: &str = "Epoch";

const EPOCH_TOKEN: usize = 1;
const ACCURACY_TOKEN: usize = 10;
const MSE_TOKEN: usize = 12;

/// Values extracted from one epoch record, kept as printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpochRecord {
    pub epoch: String,
    pub accuracy: String,
    pub mse: String,
}

impl From<EpochRecord> for ProgressEvent {
    fn from(record: EpochRecord) -> Self {
        ProgressEvent::Progress {
            epoch: record.epoch,
            accuracy: record.accuracy,
            mse: record.mse,
        }
    }
}

/// Return the last line of the sink contents, trimmed.
///
/// A trailing newline does not start a new line, but a blank last line is
/// returned as an empty string.
pub fn last_line(contents: &str) -> Result<&str, CoreError> {
    contents
        .lines()
        .last()
        .map(str::trim)
        .ok_or(CoreError::EmptySink)
}

pub fn is_epoch_line(line: &str) -> bool {
    line.starts_with(EPOCH_PREFIX)
}

/// Parse an epoch record.
pub fn parse_epoch_line(line: &str) -> Result<EpochRecord, CoreError> {
    let tokens: Vec<&str> = line.split(' ').collect();
    let token = |index: usize| {
        tokens.get(index).copied().ok_or_else(|| {
            CoreError::MalformedProgress(format!(
                "expected at least {} tokens, found {}: {line}",
                index + 1,
                tokens.len()
            ))
        })
    };

    let epoch = token(EPOCH_TOKEN)?;

    let accuracy_field = token(ACCURACY_TOKEN)?;
    let accuracy = accuracy_field.split(':').nth(1).ok_or_else(|| {
        CoreError::MalformedProgress(format!("no ':' in accuracy field {accuracy_field:?}"))
    })?;
    // Drop the unit suffix (`%`).
    let accuracy = match accuracy.char_indices().last() {
        Some((idx, _)) => &accuracy[..idx],
        None => accuracy,
    };

    let mse = token(MSE_TOKEN)?;

    Ok(EpochRecord {
        epoch: epoch.to_string(),
        accuracy: accuracy.to_string(),
        mse: mse.to_string(),
    })
}

/// Per-job classification state.
///
/// Emits [`ProgressEvent::Initialization`] for every sample until the
/// first epoch record is seen, and never again afterwards.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    epoch_seen: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch_seen(&self) -> bool {
        self.epoch_seen
    }

    /// Classify the current last line of the sink.
    ///
    /// Returns `Ok(None)` when there is nothing to report. A malformed
    /// epoch record still counts as "epoch seen".
    pub fn observe(&mut self, line: &str) -> Result<Option<ProgressEvent>, CoreError> {
        if is_epoch_line(line) {
            self.epoch_seen = true;
            return parse_epoch_line(line).map(|record| Some(record.into()));
        }
        if self.epoch_seen {
            Ok(None)
        } else {
            Ok(Some(ProgressEvent::Initialization))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
