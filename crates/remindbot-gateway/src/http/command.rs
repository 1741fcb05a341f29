//! Slash command endpoint: POST /command
//!
//! Request:  `CommandRequest` (`team_id`, `channel_id`, `user`, `text`, `trigger_id?`)
//! Response: the reply `Post`, or 204 when a dialog was opened instead.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use remindbot_service::CommandRequest;
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{check_auth, ApiRejection};

pub async fn command_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(cmd): Json<CommandRequest>,
) -> Result<Response, ApiRejection> {
    check_auth(&state, &headers)?;
    Ok(match state.service.execute_command(&cmd).await {
        Some(post) => Json(post).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}
