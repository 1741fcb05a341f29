use axum::{extract::State, http::HeaderMap, Json};
use remindbot_channels::{DialogSubmission, Post};
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{check_auth, service_error, ApiRejection};

/// POST /dialog: submission of the scheduling dialog.
pub async fn dialog_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(submission): Json<DialogSubmission>,
) -> Result<Json<Post>, ApiRejection> {
    check_auth(&state, &headers)?;
    state
        .service
        .submit_dialog(&submission)
        .await
        .map(Json)
        .map_err(service_error)
}
