use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use appointment_cell::handlers::AppointmentState;
use appointment_cell::router::{
    appointment_routes, booking_routes, catalog_routes, dashboard_routes, professional_routes,
};
use schedule_cell::router::schedule_routes;
use shared_utils::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let appointments = Arc::new(AppointmentState::new(state.clone()));

    Router::new()
        .route("/", get(|| async { "ContrataPro booking API is running!" }))
        .route("/health", get(health))
        .nest("/schedule", schedule_routes(state))
        .nest("/professionals", professional_routes(appointments.clone()))
        .nest("/bookings", booking_routes(appointments.clone()))
        .nest("/appointments", appointment_routes(appointments.clone()))
        .nest("/dashboard", dashboard_routes(appointments.clone()))
        .nest("/services", catalog_routes(appointments))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use shared_utils::test_utils::TestConfig;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = TestConfig::default().to_state_at("2026-10-19", 9, 30);
        create_router(Arc::new(state))
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cell_routes_are_mounted() {
        for uri in ["/schedule", "/dashboard/week", "/services", "/appointments/mine"] {
            let response = app()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
