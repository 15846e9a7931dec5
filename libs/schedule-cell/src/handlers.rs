use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;
use shared_utils::{session::Session, state::AppState};

use crate::models::{CreateWorkingHourRequest, ScheduleError};
use crate::services::ScheduleService;

const SCHEDULE_RETURN_TO: &str = "/dashboard?tab=schedule";

fn schedule_error(state: &AppState, err: ScheduleError) -> AppError {
    match err {
        ScheduleError::InvalidDay(_) | ScheduleError::InvalidTime(_) | ScheduleError::InvalidRange => {
            warn!("Rejected working hour: {}", err);
            AppError::ValidationError(err.to_string())
        }
        ScheduleError::Unauthenticated => state.login_required(SCHEDULE_RETURN_TO),
        ScheduleError::Api(api) => state.api_error(api, SCHEDULE_RETURN_TO),
    }
}

#[axum::debug_handler]
pub async fn list_working_hours(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    state.require_token(&session, SCHEDULE_RETURN_TO)?;

    let service = ScheduleService::new(&state.config);
    let hours = service
        .list_mine(&session)
        .await
        .map_err(|e| schedule_error(&state, e))?;

    Ok(Json(json!({
        "working_hours": hours,
        "total": hours.len()
    })))
}

#[axum::debug_handler]
pub async fn add_working_hour(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateWorkingHourRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    state.require_token(&session, SCHEDULE_RETURN_TO)?;

    let service = ScheduleService::new(&state.config);
    let created = service
        .add(&session, request)
        .await
        .map_err(|e| schedule_error(&state, e))?;

    Ok((StatusCode::CREATED, Json(json!(created))))
}

#[axum::debug_handler]
pub async fn remove_working_hour(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path(working_hour_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.require_token(&session, SCHEDULE_RETURN_TO)?;

    let service = ScheduleService::new(&state.config);
    service
        .remove(&session, working_hour_id)
        .await
        .map_err(|e| schedule_error(&state, e))?;

    Ok(StatusCode::NO_CONTENT)
}
