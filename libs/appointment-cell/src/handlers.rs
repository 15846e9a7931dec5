// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use shared_models::error::AppError;
use shared_utils::concurrency::InFlight;
use shared_utils::session::Session;
use shared_utils::state::AppState;
use shared_utils::time::{format_date_br, parse_user_date};

use crate::models::{
    AppointmentError, BlockForm, BookingSelection, CreateServiceRequest, HistoryQuery, Perspective,
    StatusChange,
};
use crate::services::occupancy::{is_day_available, slots_for_date};
use crate::services::{
    AppointmentLifecycleService, BlockService, BookingService, CatalogService, WeekService,
};

/// Router state shared by every appointment route.
pub struct AppointmentState {
    pub app: Arc<AppState>,
    /// Booking submissions running per session token.
    pub submissions: InFlight<String>,
}

impl AppointmentState {
    pub fn new(app: Arc<AppState>) -> Self {
        Self {
            app,
            submissions: InFlight::new(),
        }
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    /// `yyyy-mm-dd` or `dd/mm/yyyy`; today when absent.
    pub date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub professional_id: i64,
    pub service_id: Option<i64>,
    pub date: Option<String>,
    pub hour: Option<u32>,
}

const DASHBOARD_RETURN_TO: &str = "/dashboard";
const SERVICES_RETURN_TO: &str = "/dashboard?tab=services";
const APPOINTMENTS_RETURN_TO: &str = "/appointments";
const HISTORY_RETURN_TO: &str = "/appointments/history";

fn booking_return_to(professional_id: i64) -> String {
    format!("/booking/{}", professional_id)
}

/// Maps cell errors to HTTP errors. Server-provided reasons pass through unchanged.
fn appointment_error(app: &AppState, err: AppointmentError, return_to: &str) -> AppError {
    match err {
        AppointmentError::LoginRequired => app.login_required(return_to),
        AppointmentError::Api(api) => app.api_error(api, return_to),
        AppointmentError::SubmissionInProgress
        | AppointmentError::InvalidStatusTransition { .. }
        | AppointmentError::BlockNotTransitionable => AppError::Conflict(err.to_string()),
        AppointmentError::ProfessionalOnly => AppError::Forbidden(err.to_string()),
        AppointmentError::ServiceNotFound(_) => AppError::NotFound(err.to_string()),
        other => {
            warn!("Rejected before submission: {}", other);
            AppError::ValidationError(other.to_string())
        }
    }
}

fn parse_date_param(input: &str) -> Result<NaiveDate, AppError> {
    parse_user_date(input).ok_or_else(|| {
        AppError::ValidationError(AppointmentError::InvalidDate(input.to_string()).to_string())
    })
}

// ==============================================================================
// PUBLIC AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_professional_slots(
    State(state): State<Arc<AppointmentState>>,
    Path(professional_id): Path<i64>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    let now = app.clock.now();
    let date = match query.date.as_deref() {
        Some(raw) => parse_date_param(raw)?,
        None => now.date_naive(),
    };

    let booking_service = BookingService::new(&app.config);
    let (professional, appointments) = booking_service
        .availability(professional_id, date)
        .await
        .map_err(|e| appointment_error(app, e, &booking_return_to(professional_id)))?;

    let slots = slots_for_date(
        date,
        &professional.working_hours,
        &appointments,
        now,
        Perspective::Client,
    );
    let day_available = is_day_available(date, &professional.working_hours, &appointments, now.date_naive());

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": date,
        "date_display": format_date_br(date),
        "slots": slots,
        "day_available": day_available,
        "services": professional.services,
        "city": professional.city,
        "state": professional.state
    })))
}

#[axum::debug_handler]
pub async fn get_professional_day(
    State(state): State<Arc<AppointmentState>>,
    Path((professional_id, date)): Path<(i64, String)>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    let date = parse_date_param(&date)?;

    let booking_service = BookingService::new(&app.config);
    let (professional, appointments) = booking_service
        .availability(professional_id, date)
        .await
        .map_err(|e| appointment_error(app, e, &booking_return_to(professional_id)))?;

    let available = is_day_available(date, &professional.working_hours, &appointments, app.clock.today());

    Ok(Json(json!({
        "professional_id": professional_id,
        "date": date,
        "available": available
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

/// One submission per session at a time; a second one gets 409 until the first finishes.
#[axum::debug_handler]
pub async fn create_booking(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let app = &state.app;
    let return_to = booking_return_to(request.professional_id);
    let token = app.require_token(&session, &return_to)?;

    let date = request.date.as_deref().map(parse_date_param).transpose()?;
    let selection = BookingSelection {
        service_id: request.service_id,
        date,
        hour: request.hour,
    };

    let _permit = state
        .submissions
        .try_acquire(token)
        .ok_or_else(|| appointment_error(app, AppointmentError::SubmissionInProgress, &return_to))?;

    let booking_service = BookingService::new(&app.config);
    let confirmation = booking_service
        .book(&session, request.professional_id, &selection, app.clock.now())
        .await
        .map_err(|e| appointment_error(app, e, &return_to))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "appointment": confirmation.appointment,
            "whatsapp_link": confirmation.whatsapp_link,
            "message": "Appointment booked"
        })),
    ))
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, APPOINTMENTS_RETURN_TO)?;

    let lifecycle = AppointmentLifecycleService::new(&app.config);
    let appointments = lifecycle
        .list_client_appointments(&session)
        .await
        .map_err(|e| appointment_error(app, e, APPOINTMENTS_RETURN_TO))?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn get_appointment_history(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, HISTORY_RETURN_TO)?;

    let lifecycle = AppointmentLifecycleService::new(&app.config);
    let page = lifecycle
        .history(&session, &query)
        .await
        .map_err(|e| appointment_error(app, e, HISTORY_RETURN_TO))?;

    Ok(Json(json!(page)))
}

#[axum::debug_handler]
pub async fn get_history_people(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, HISTORY_RETURN_TO)?;

    let lifecycle = AppointmentLifecycleService::new(&app.config);
    let people = lifecycle
        .history_people(&session)
        .await
        .map_err(|e| appointment_error(app, e, HISTORY_RETURN_TO))?;

    Ok(Json(json!(people)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    let return_to = format!("/appointment/{}", appointment_id);
    app.require_token(&session, &return_to)?;

    let lifecycle = AppointmentLifecycleService::new(&app.config);
    let appointment = lifecycle
        .get_appointment(&session, appointment_id)
        .await
        .map_err(|e| appointment_error(app, e, &return_to))?;

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn update_appointment_status(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Path(appointment_id): Path<i64>,
    Json(change): Json<StatusChange>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    let return_to = format!("/appointment/{}", appointment_id);
    app.require_token(&session, &return_to)?;

    let lifecycle = AppointmentLifecycleService::new(&app.config);
    let appointment = lifecycle
        .change_status(&session, appointment_id, change)
        .await
        .map_err(|e| appointment_error(app, e, &return_to))?;

    Ok(Json(json!(appointment)))
}

// ==============================================================================
// DASHBOARD HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn get_dashboard_week(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, DASHBOARD_RETURN_TO)?;

    let offset = query.offset.unwrap_or(0);
    let weeks = WeekService::new(&app.config);
    let grid = weeks
        .dashboard_week(&session, offset, app.clock.now())
        .await
        .map_err(|e| appointment_error(app, e, DASHBOARD_RETURN_TO))?;

    Ok(Json(json!({
        "offset": offset,
        "week": grid
    })))
}

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Json(form): Json<BlockForm>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let app = &state.app;
    app.require_token(&session, DASHBOARD_RETURN_TO)?;

    let blocks = BlockService::new(&app.config);
    let outcome = blocks
        .create(&session, &form, app.clock.now())
        .await
        .map_err(|e| appointment_error(app, e, DASHBOARD_RETURN_TO))?;

    Ok((StatusCode::CREATED, Json(json!(outcome))))
}

#[axum::debug_handler]
pub async fn remove_block(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Path(block_id): Path<i64>,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, DASHBOARD_RETURN_TO)?;

    let blocks = BlockService::new(&app.config);
    let outcome = blocks
        .remove(&session, block_id, query.offset.unwrap_or(0), app.clock.now())
        .await
        .map_err(|e| appointment_error(app, e, DASHBOARD_RETURN_TO))?;

    Ok(Json(json!(outcome)))
}

// ==============================================================================
// SERVICE CATALOG HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_services(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
) -> Result<Json<Value>, AppError> {
    let app = &state.app;
    app.require_token(&session, SERVICES_RETURN_TO)?;

    let catalog = CatalogService::new(&app.config);
    let services = catalog
        .list_mine(&session)
        .await
        .map_err(|e| appointment_error(app, e, SERVICES_RETURN_TO))?;

    Ok(Json(json!({
        "services": services,
        "total": services.len()
    })))
}

#[axum::debug_handler]
pub async fn create_service(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Json(request): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let app = &state.app;
    app.require_token(&session, SERVICES_RETURN_TO)?;

    let catalog = CatalogService::new(&app.config);
    let service = catalog
        .create(&session, request)
        .await
        .map_err(|e| appointment_error(app, e, SERVICES_RETURN_TO))?;

    Ok((StatusCode::CREATED, Json(json!(service))))
}

#[axum::debug_handler]
pub async fn delete_service(
    State(state): State<Arc<AppointmentState>>,
    Extension(session): Extension<Session>,
    Path(service_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let app = &state.app;
    app.require_token(&session, SERVICES_RETURN_TO)?;

    let catalog = CatalogService::new(&app.config);
    catalog
        .delete(&session, service_id)
        .await
        .map_err(|e| appointment_error(app, e, SERVICES_RETURN_TO))?;

    Ok(StatusCode::NO_CONTENT)
}
