//! Training job engine.
//!
//! Contains the controller that owns the single job and its lifecycle,
//! the launcher that runs the trainer process, the watcher that turns the
//! trainer's output into progress events, and the shared job state they
//! coordinate through.

pub mod controller;
pub mod job_state;
pub mod launcher;
pub mod watcher;

pub use controller::{ControllerSettings, JobController};
pub use job_state::{JobState, JobStatus};
