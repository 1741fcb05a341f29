//! Operator controls for the background dispatcher.
//!
//! Both endpoints are idempotent and answer with the resulting state.

use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use crate::app::AppState;
use crate::http::{check_auth, ApiRejection};

/// POST /dispatcher/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiRejection> {
    check_auth(&state, &headers)?;
    state.dispatcher.start().await;
    info!("dispatcher started via API");
    Ok(Json(json!({ "running": state.dispatcher.is_running().await })))
}

/// POST /dispatcher/stop
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiRejection> {
    check_auth(&state, &headers)?;
    state.dispatcher.stop().await;
    info!("dispatcher stopped via API");
    Ok(Json(json!({ "running": state.dispatcher.is_running().await })))
}
