// libs/appointment-cell/src/services/week.rs
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::Method;
use tracing::debug;

use schedule_cell::ScheduleService;
use shared_api::ApiClient;
use shared_config::AppConfig;
use shared_utils::session::Session;
use shared_utils::time::{format_wire_date, week_start};

use crate::models::{Appointment, AppointmentError, Perspective, WeekGrid};
use crate::services::occupancy::week_grid;

/// Fetches weekly occupancy. Each call returns a fresh list; nothing is
/// merged into earlier results.
pub struct WeekService {
    api: ApiClient,
    schedule: ScheduleService,
}

impl WeekService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
            schedule: ScheduleService::new(config),
        }
    }

    /// Public week of a professional: only scheduled appointments and blocks,
    /// for `[start_date, start_date + 7)`.
    pub async fn professional_week(
        &self,
        professional_id: i64,
        start_date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Fetching week of professional {} from {}", professional_id, start_date);

        let path = format!("/appointments/professional/{}/week", professional_id);
        let query = [("start_date", format_wire_date(start_date))];
        let appointments = self
            .api
            .request_with_query::<Vec<Appointment>>(Method::GET, &path, &query, None, None)
            .await?;

        Ok(appointments)
    }

    /// The logged-in professional's own week, including cancelled rows and blocks.
    pub async fn my_week(
        &self,
        session: &Session,
        start_date: NaiveDate,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        debug!("Fetching own week from {}", start_date);

        let query = [("start_date", format_wire_date(start_date))];
        let result = self
            .api
            .request_with_query::<Vec<Appointment>>(
                Method::GET,
                "/appointments/me/week",
                &query,
                Some(&token),
                None,
            )
            .await;

        Ok(session.observe(result)?)
    }

    /// Dashboard grid for the week `offset` weeks away from the current one.
    pub async fn dashboard_week(
        &self,
        session: &Session,
        offset: i64,
        now: DateTime<FixedOffset>,
    ) -> Result<WeekGrid, AppointmentError> {
        let start = week_start(now.date_naive(), offset);

        let (appointments, working_hours) = futures::try_join!(
            self.my_week(session, start),
            async {
                self.schedule
                    .list_mine(session)
                    .await
                    .map_err(AppointmentError::from)
            }
        )?;

        Ok(week_grid(
            start,
            &working_hours,
            &appointments,
            now,
            Perspective::Professional,
        ))
    }
}
