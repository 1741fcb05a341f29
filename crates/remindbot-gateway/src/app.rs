use axum::{
    routing::{get, post},
    Router,
};
use remindbot_core::config::RemindbotConfig;
use remindbot_scheduler::Dispatcher;
use remindbot_service::ReminderService;
use std::sync::Arc;

use crate::http;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: RemindbotConfig,
    pub service: ReminderService,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(config: RemindbotConfig, service: ReminderService, dispatcher: Dispatcher) -> Self {
        Self {
            config,
            service,
            dispatcher,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        .route("/command", post(http::command::command_handler))
        .route("/actions", post(http::actions::action_handler))
        .route("/dialog", post(http::dialog::dialog_handler))
        .route("/dispatcher/start", post(http::dispatcher::start_handler))
        .route("/dispatcher/stop", post(http::dispatcher::stop_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
