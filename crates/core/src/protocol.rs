//! Observer wire protocol.
//!
//! Every frame is a JSON object carrying a `category` field. The observer
//! sends [`ObserverCommand`]s; the server answers only with
//! [`ProgressEvent`]s. Errors are never forwarded to the observer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Field carrying the message kind in both directions.
pub const CATEGORY_FIELD: &str = "category";

/// Inbound: start a training run, remaining fields are config overrides.
pub const MSG_CATEGORY_START_TRAINING: &str = "startTraining";

/// Inbound: request a cooperative stop of the current run.
pub const MSG_CATEGORY_STOP_TRAINING: &str = "stopTraining";

/// Config overrides supplied by the observer, keyed by option name.
pub type TrainingOverrides = Map<String, Value>;

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// A decoded message from the observer.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverCommand {
    /// Start a run with the given overrides (the `category` key removed).
    StartTraining(TrainingOverrides),
    /// Stop the current run and report completion.
    StopTraining,
    /// A well-formed message whose category this server does not handle.
    Unknown(String),
}

impl ObserverCommand {
    /// Decode a text frame.
    ///
    /// The frame must be a JSON object with a string `category`. Unknown
    /// categories decode to [`ObserverCommand::Unknown`] so the caller can
    /// log and ignore them.
    pub fn parse(text: &str) -> Result<Self, CoreError> {
        let mut fields: Map<String, Value> = serde_json::from_str(text)
            .map_err(|e| CoreError::InvalidMessage(e.to_string()))?;

        let category = match fields.remove(CATEGORY_FIELD) {
            Some(Value::String(category)) => category,
            Some(other) => {
                return Err(CoreError::InvalidMessage(format!(
                    "category must be a string, got {other}"
                )))
            }
            None => {
                return Err(CoreError::InvalidMessage(
                    "missing category field".to_string(),
                ))
            }
        };

        Ok(match category.as_str() {
            MSG_CATEGORY_START_TRAINING => Self::StartTraining(fields),
            MSG_CATEGORY_STOP_TRAINING => Self::StopTraining,
            _ => Self::Unknown(category),
        })
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A progress notification pushed to the observer.
///
/// Epoch, accuracy and MSE travel as the exact text the trainer printed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// The job is running but has not produced an epoch record yet.
    Initialization,
    /// One epoch record from the trainer output.
    Progress {
        epoch: String,
        accuracy: String,
        mse: String,
    },
    /// The job was stopped on the observer's request and has terminated.
    Completed,
}

impl ProgressEvent {
    /// Serialize to the JSON text frame sent over the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
