use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use bondboard_core::ingest::SyncMode;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SyncParams {
    mode: Option<String>,
}

/// Kicks off a sync in the background. Returns 409 when one is
/// already running.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SyncParams>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let forced = match params.mode.as_deref() {
        None => None,
        Some("FULL") => Some(SyncMode::Full),
        Some("INCREMENTAL") => Some(SyncMode::Incremental),
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "unknown sync mode {other:?}, expected FULL or INCREMENTAL"
            )))
        }
    };

    let guard = state
        .sync_lock
        .clone()
        .try_lock_owned()
        .map_err(|_| ApiError::conflict("sync already running"))?;

    let orchestrator = state.orchestrator.clone();
    tokio::spawn(async move {
        let _guard = guard;
        match orchestrator.run_sync(forced).await {
            Ok(report) => info!("manual sync finished: {}", report.summary()),
            Err(e) => error!("manual sync failed: {e}"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "started" }))))
}
