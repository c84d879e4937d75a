//! Domain logic for the training launcher.
//!
//! Everything here is pure (no async runtime, no sockets) so the server
//! crate and tests can share it: the observer wire protocol, the trainer
//! configuration artifact, progress-line parsing, the job file layout,
//! platform resolution for the trainer binary, and the export transform.

pub mod error;
pub mod export;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod protocol;
pub mod training_config;
pub mod types;
