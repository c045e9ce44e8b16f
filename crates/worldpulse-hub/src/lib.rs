//! Distribution hub for WorldPulse.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/events`) that sends each observer a
//!   snapshot of the shared cache and then every new batch, via
//!   [`tokio::sync::broadcast`]
//! - **REST endpoints** for the cached events, adapter status, and
//!   liveness
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! [`HubState`] owns the single bounded, deduplicating event cache and is
//! the batch sink of the adapter scheduler. Each batch is merged into the
//! cache and then broadcast unchanged. Observers never block the hub: a
//! slow observer skips ahead instead.
//!
//! [`HubState`]: state::HubState

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use startup::{SpawnedHub, StartupError, spawn_hub};
pub use state::HubState;
