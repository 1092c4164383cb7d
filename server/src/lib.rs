//! Snakeboard Server - remote store for the Snakeboard leaderboard.
//!
//! Holds the append-only `scores` collection in PostgreSQL and serves it
//! over HTTP, with WebSocket snapshots pushed to subscribers on every
//! change.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod websocket;

use crate::db::Pool;
use crate::websocket::ConnectionManager;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub conn_manager: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            conn_manager: ConnectionManager::new_shared(),
        }
    }
}

/// Build the router with tracing and CORS layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(routes::create_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
