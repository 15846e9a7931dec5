use reqwest::Method;
use tracing::{debug, info};

use shared_api::{ApiClient, ApiError};
use shared_config::AppConfig;
use shared_utils::session::Session;

use crate::models::{CreateWorkingHourRequest, ScheduleError, WorkingHour};
use crate::services::hours::sort_working_hours;

/// Working-hour CRUD for the logged-in professional.
pub struct ScheduleService {
    api: ApiClient,
}

impl ScheduleService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
        }
    }

    pub async fn list_mine(&self, session: &Session) -> Result<Vec<WorkingHour>, ScheduleError> {
        let token = session.token().ok_or(ScheduleError::Unauthenticated)?;
        debug!("Fetching own working hours");

        let result = self
            .api
            .request::<Vec<WorkingHour>>(Method::GET, "/schedule/me", Some(&token), None)
            .await;
        let mut hours = session.observe(result)?;

        sort_working_hours(&mut hours);
        Ok(hours)
    }

    pub async fn add(
        &self,
        session: &Session,
        request: CreateWorkingHourRequest,
    ) -> Result<WorkingHour, ScheduleError> {
        let new_hour = request.validate()?;
        let token = session.token().ok_or(ScheduleError::Unauthenticated)?;

        debug!(
            "Adding working hour day={} {}-{}",
            new_hour.day_of_week, new_hour.start_time, new_hour.end_time
        );

        let body = serde_json::to_value(&new_hour).map_err(ApiError::from)?;
        let result = self
            .api
            .request::<WorkingHour>(Method::POST, "/schedule/", Some(&token), Some(body))
            .await;
        let created = session.observe(result)?;

        info!("Working hour {} created", created.id);
        Ok(created)
    }

    /// Windows are never edited in place; callers delete and re-add.
    pub async fn remove(&self, session: &Session, working_hour_id: i64) -> Result<(), ScheduleError> {
        let token = session.token().ok_or(ScheduleError::Unauthenticated)?;
        debug!("Removing working hour {}", working_hour_id);

        let path = format!("/schedule/{}", working_hour_id);
        let result = self
            .api
            .request_no_content(Method::DELETE, &path, Some(&token))
            .await;
        session.observe(result)?;

        info!("Working hour {} removed", working_hour_id);
        Ok(())
    }
}
