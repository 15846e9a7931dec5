use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use shared_utils::{extractor::session_middleware, state::AppState};

use crate::handlers;

/// Professional's weekly windows. Every route needs a session.
pub fn schedule_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_working_hours).post(handlers::add_working_hour),
        )
        .route("/{working_hour_id}", delete(handlers::remove_working_hour))
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}
