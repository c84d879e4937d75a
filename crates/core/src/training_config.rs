//! Trainer configuration artifact.
//!
//! The trainer reads a plain text file with one `key = value` pair per
//! line. [`TrainingConfig`] starts from a fixed default set and lets the
//! observer's overrides replace or extend it. Keys are not validated.

use serde_json::Value;

use crate::paths::JobPaths;
use crate::protocol::{TrainingOverrides, CATEGORY_FIELD};

/// Path the trainer writes the trained network to.
pub const KEY_EXPORT: &str = "export";

/// Activation function specification.
pub const KEY_ACTIVATION: &str = "activation";

/// Epoch cap (`-1` means unbounded).
pub const KEY_MAX_EPOCH: &str = "maxEpoch";

/// Target accuracy in percent at which training stops.
pub const KEY_ACCURACY: &str = "accuracy";

/// Path of the cancellation sentinel the trainer polls.
pub const KEY_STOP_FILE: &str = "stopFile";

pub const DEFAULT_ACTIVATION: &str = "Sigmoid(1)";
pub const DEFAULT_MAX_EPOCH: &str = "-1";
pub const DEFAULT_ACCURACY: &str = "100.0";

/// Ordered set of trainer options.
///
/// Insertion order is preserved so the artifact lists defaults first,
/// followed by any option only the observer supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingConfig {
    entries: Vec<(String, String)>,
}

impl TrainingConfig {
    /// The default option set for a job laid out as `paths`.
    pub fn defaults(paths: &JobPaths) -> Self {
        Self {
            entries: vec![
                (
                    KEY_EXPORT.to_string(),
                    paths.export_file.display().to_string(),
                ),
                (KEY_ACTIVATION.to_string(), DEFAULT_ACTIVATION.to_string()),
                (KEY_MAX_EPOCH.to_string(), DEFAULT_MAX_EPOCH.to_string()),
                (KEY_ACCURACY.to_string(), DEFAULT_ACCURACY.to_string()),
                (
                    KEY_STOP_FILE.to_string(),
                    paths.stop_file.display().to_string(),
                ),
            ],
        }
    }

    /// Defaults for `paths` with `overrides` merged on top.
    pub fn from_overrides(paths: &JobPaths, overrides: &TrainingOverrides) -> Self {
        let mut config = Self::defaults(paths);
        for (key, value) in overrides {
            if key == CATEGORY_FIELD {
                continue;
            }
            config.set(key, override_text(value));
        }
        config
    }

    /// Set an option, replacing an existing value in place.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Render the artifact text: one `key = value` line per option.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.entries {
            out.push_str(key);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }
}

/// Strings are written verbatim; other JSON scalars use their JSON text.
fn override_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
