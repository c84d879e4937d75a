//! WebSocket infrastructure for the observer connection.
//!
//! Provides the single-observer session, heartbeat monitoring, and the
//! HTTP upgrade handler used by the Axum router.

mod handler;
mod heartbeat;
pub mod manager;

pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::{ObserverSession, SendError};
