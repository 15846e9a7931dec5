// libs/appointment-cell/src/services/lifecycle.rs
use reqwest::Method;
use tracing::{debug, info, warn};

use shared_api::{ApiClient, ApiError};
use shared_config::AppConfig;
use shared_utils::session::Session;

use crate::models::{
    Appointment, AppointmentError, AppointmentPage, AppointmentStatus, HistoryPerson,
    HistoryQuery, StatusChange, MIN_REASON_LEN,
};

pub struct AppointmentLifecycleService {
    api: ApiClient,
}

impl AppointmentLifecycleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
        }
    }

    /// Valid next statuses for a given current status
    pub fn valid_transitions(current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::Suspended,
            ],
            // A suspended booking is re-opened by booking again, never reinstated.
            AppointmentStatus::Suspended => vec![AppointmentStatus::Cancelled],
            AppointmentStatus::Completed
            | AppointmentStatus::Cancelled
            | AppointmentStatus::Blocked => vec![],
        }
    }

    /// Checks a status change before it is sent. Returns the change with its
    /// reason trimmed.
    pub fn validate_status_change(
        appointment: &Appointment,
        change: &StatusChange,
        is_professional: bool,
    ) -> Result<StatusChange, AppointmentError> {
        debug!(
            "Validating status change {} -> {} for appointment {}",
            appointment.status, change.status, appointment.id
        );

        if appointment.is_block() {
            return Err(AppointmentError::BlockNotTransitionable);
        }

        if !Self::valid_transitions(appointment.status).contains(&change.status) {
            warn!(
                "Invalid status transition attempted: {} -> {}",
                appointment.status, change.status
            );
            return Err(AppointmentError::InvalidStatusTransition {
                from: appointment.status,
                to: change.status,
            });
        }

        let reason = change
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);

        match change.status {
            AppointmentStatus::Completed if !is_professional => Err(AppointmentError::ProfessionalOnly),
            AppointmentStatus::Cancelled | AppointmentStatus::Suspended => {
                match reason {
                    Some(reason) if reason.chars().count() >= MIN_REASON_LEN => Ok(StatusChange {
                        status: change.status,
                        reason: Some(reason),
                    }),
                    _ => Err(AppointmentError::ReasonRequired),
                }
            }
            _ => Ok(StatusChange {
                status: change.status,
                reason,
            }),
        }
    }

    pub async fn get_appointment(
        &self,
        session: &Session,
        appointment_id: i64,
    ) -> Result<Appointment, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        let path = format!("/appointments/{}", appointment_id);
        let result = self
            .api
            .request::<Appointment>(Method::GET, &path, Some(&token), None)
            .await;
        Ok(session.observe(result)?)
    }

    /// Client-side listing of the caller's own bookings.
    pub async fn list_client_appointments(
        &self,
        session: &Session,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        let result = self
            .api
            .request::<Vec<Appointment>>(Method::GET, "/appointments/client/me", Some(&token), None)
            .await;
        let mut appointments = session.observe(result)?;
        appointments.sort_by_key(|a| (a.date, a.start_time));
        Ok(appointments)
    }

    /// Paginated history of the caller, newest first. Filters are forwarded
    /// as-is; the API scopes them to the caller's role.
    pub async fn history(
        &self,
        session: &Session,
        query: &HistoryQuery,
    ) -> Result<AppointmentPage, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if end < start {
                return Err(AppointmentError::InvalidDateRange { start, end });
            }
        }

        let pairs = query.to_pairs();
        let result = self
            .api
            .request_with_query::<AppointmentPage>(
                Method::GET,
                "/appointments/history",
                &pairs,
                Some(&token),
                None,
            )
            .await;
        let page = session.observe(result)?;

        debug!(
            "History page {}/{} with {} of {} appointments",
            page.page,
            page.pages,
            page.items.len(),
            page.total
        );
        Ok(page)
    }

    /// People the caller has appointments with, for the history filter.
    pub async fn history_people(
        &self,
        session: &Session,
    ) -> Result<Vec<HistoryPerson>, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        let result = self
            .api
            .request::<Vec<HistoryPerson>>(
                Method::GET,
                "/appointments/history/filters/people",
                Some(&token),
                None,
            )
            .await;
        Ok(session.observe(result)?)
    }

    /// Fetches the appointment, validates the transition locally, then
    /// `PATCH /appointments/{id}/status`.
    pub async fn change_status(
        &self,
        session: &Session,
        appointment_id: i64,
        change: StatusChange,
    ) -> Result<Appointment, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;

        let (appointment, user) = futures::try_join!(
            self.get_appointment(session, appointment_id),
            async {
                let result = self.api.current_user(&token).await;
                session.observe(result).map_err(AppointmentError::from)
            }
        )?;

        let change = Self::validate_status_change(&appointment, &change, user.is_professional)?;

        let body = serde_json::to_value(&change).map_err(ApiError::from)?;
        let path = format!("/appointments/{}/status", appointment_id);
        let result = self
            .api
            .request::<Appointment>(Method::PATCH, &path, Some(&token), Some(body))
            .await;
        let updated = session.observe(result)?;

        info!(
            "Appointment {} moved from {} to {}",
            appointment_id, appointment.status, updated.status
        );
        Ok(updated)
    }
}
