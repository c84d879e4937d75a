use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::JobController;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Owner of the training job and, through it, the observer session.
    pub controller: Arc<JobController>,
}
