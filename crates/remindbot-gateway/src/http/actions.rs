//! Button callbacks: POST /actions
//!
//! The platform echoes back the `context` it was given with the control,
//! plus the username of whoever pressed it.

use axum::{
    extract::State,
    http::HeaderMap,
    Json,
};
use remindbot_core::ActionContext;
use remindbot_service::ActionReply;
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{check_auth, service_error, ApiRejection};

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    /// Username of the acting user.
    pub user: String,
    pub context: ActionContext,
}

pub async fn action_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionReply>, ApiRejection> {
    check_auth(&state, &headers)?;
    state
        .service
        .handle_action(&req.context, &req.user)
        .await
        .map(Json)
        .map_err(service_error)
}
