//! HTTP surface the chat platform calls into.
//!
//! Every POST endpoint requires `Authorization: Bearer <gateway.token>` when
//! a token is configured. Errors are `{"error": "...", "code": "..."}`.

pub mod actions;
pub mod command;
pub mod dialog;
pub mod dispatcher;
pub mod health;

use axum::{
    http::{HeaderMap, StatusCode},
    Json,
};
use remindbot_service::ServiceError;
use serde::Serialize;
use tracing::warn;

use crate::app::AppState;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: &'static str,
}

pub type ApiRejection = (StatusCode, Json<ApiError>);

pub(crate) fn service_error(e: ServiceError) -> ApiRejection {
    let status = match &e {
        ServiceError::Parse(_) => StatusCode::BAD_REQUEST,
        ServiceError::Schedule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::TargetNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Platform(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(code = e.code(), "request failed: {e}");
    (
        status,
        Json(ApiError {
            error: e.to_string(),
            code: e.code(),
        }),
    )
}

/// Reject the request unless it carries the configured bearer token.
pub(crate) fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), ApiRejection> {
    let Some(expected) = state.config.gateway.token.as_deref() else {
        return Ok(());
    };
    if extract_bearer(headers) == Some(expected) {
        return Ok(());
    }
    warn!("rejected callback with missing or wrong token");
    Err((
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: "Unauthorized. Set 'Authorization: Bearer <token>' header.".to_string(),
            code: "UNAUTHORIZED",
        }),
    ))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
