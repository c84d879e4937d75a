pub mod health;

use axum::routing::get;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::state::AppState;
use crate::ws;

/// Build the full application router.
///
/// ```text
/// /          WebSocket (observer)
/// /health    GET
/// ```
///
/// The observer socket lives at the root because the bundled front-end
/// connects to `ws://host:port` without a path.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws::ws_handler))
        .merge(health::router())
        // -- Middleware stack (applied bottom-up) --
        // Panic recovery: catch panics and return 500.
        .layer(CatchPanicLayer::new())
        // Structured request/response tracing.
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
