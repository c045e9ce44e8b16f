//! Axum router construction for the hub.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS restricted to the configured dashboard origin.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers;
use crate::state::HubState;
use crate::ws;

/// Build the CORS layer for `origin`; `*` allows any origin.
///
/// An origin that is not a valid header value allows none.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            warn!(origin, "Invalid CORS origin, cross-origin requests disabled: {e}");
            layer
        }
    }
}

/// Build the complete Axum router for the hub.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/events` -- `WebSocket` observer stream
/// - `GET /api/events` -- cached events
/// - `GET /api/status` -- adapter health
/// - `GET /health` -- liveness
pub fn build_router(state: Arc<HubState>, cors_origin: &str) -> Router {
    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/events", get(ws::ws_events))
        // REST API
        .route("/api/events", get(handlers::list_events))
        .route("/api/status", get(handlers::get_status))
        .route("/health", get(handlers::health))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
