use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::{ObserverSession, SendError};

/// Interval between heartbeat pings (in seconds).
const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// Spawn a background task that sends periodic Ping frames to the observer.
///
/// The task runs until aborted through the returned `JoinHandle`, which
/// `main` does during shutdown.
pub fn start_heartbeat(observer: Arc<ObserverSession>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEARTBEAT_INTERVAL_SECS));

        loop {
            interval.tick().await;
            match observer.ping().await {
                Ok(()) => tracing::debug!("Observer heartbeat ping"),
                Err(SendError::NoObserver) => {}
                Err(e) => tracing::debug!(error = %e, "Observer heartbeat ping failed"),
            }
        }
    })
}
