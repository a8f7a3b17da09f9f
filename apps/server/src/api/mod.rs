use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::config::Config;
use crate::state::AppState;

mod bonds;
mod sync;
mod transactions;
mod ws;

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let cors = match config.cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            warn!(
                "invalid CORS origin {:?}, allowing any origin",
                config.cors_origin
            );
            CorsLayer::permissive()
        }
    };

    Router::new()
        .route("/", get(root))
        .route("/api/bonds", get(bonds::list_bonds))
        .route("/api/bonds/{isin}", get(bonds::get_bond))
        .route("/api/bonds/{isin}/transactions", get(bonds::bond_transactions))
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/sync", post(sync::trigger_sync))
        .route("/ws", get(ws::ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({ "message": "Bond Dashboard API" }))
}
