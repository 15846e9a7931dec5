// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};

use shared_utils::extractor::session_middleware;

use crate::handlers::{self, AppointmentState};

/// Public professional profile availability. No login needed to browse.
pub fn professional_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/{professional_id}/slots", get(handlers::get_professional_slots))
        .route(
            "/{professional_id}/days/{date}",
            get(handlers::get_professional_day),
        )
        .with_state(state)
}

pub fn booking_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", post(handlers::create_booking))
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}

pub fn appointment_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/mine", get(handlers::list_my_appointments))
        .route("/history", get(handlers::get_appointment_history))
        .route(
            "/history/filters/people",
            get(handlers::get_history_people),
        )
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route(
            "/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}

/// Professional dashboard: week grid and manual blocks.
pub fn dashboard_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/week", get(handlers::get_dashboard_week))
        .route("/blocks", post(handlers::create_block))
        .route("/blocks/{block_id}", delete(handlers::remove_block))
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}

pub fn catalog_routes(state: Arc<AppointmentState>) -> Router {
    Router::new()
        .route("/", get(handlers::list_services).post(handlers::create_service))
        .route("/{service_id}", delete(handlers::delete_service))
        .layer(middleware::from_fn(session_middleware))
        .with_state(state)
}
