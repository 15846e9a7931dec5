// libs/appointment-cell/src/services/blocks.rs
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, info, warn};

use shared_api::{ApiClient, ApiError};
use shared_config::AppConfig;
use shared_utils::session::Session;
use shared_utils::time::{parse_clock_time, parse_user_date, week_start};

use crate::models::{
    Appointment, AppointmentError, BlockForm, NewBlock, WeekGrid, DEFAULT_BLOCK_REASON,
    MIN_REASON_LEN,
};
use crate::services::week::WeekService;

impl BlockForm {
    /// Validates the form against `today`. A blank reason becomes the default one.
    pub fn validate(&self, today: NaiveDate) -> Result<NewBlock, AppointmentError> {
        let date = parse_user_date(&self.date)
            .ok_or_else(|| AppointmentError::InvalidDate(self.date.clone()))?;

        if date < today {
            return Err(AppointmentError::DateInPast(date));
        }

        let start_time = parse_clock_time(&self.start_time)
            .ok_or_else(|| AppointmentError::InvalidTime(self.start_time.clone()))?;
        let end_time = parse_clock_time(&self.end_time)
            .ok_or_else(|| AppointmentError::InvalidTime(self.end_time.clone()))?;

        if end_time <= start_time {
            return Err(AppointmentError::InvalidRange);
        }

        let reason = match self.reason.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_BLOCK_REASON.to_string(),
            Some(r) if r.chars().count() < MIN_REASON_LEN => {
                return Err(AppointmentError::ReasonRequired)
            }
            Some(r) => r.to_string(),
        };

        Ok(NewBlock {
            date,
            start_time,
            end_time,
            reason,
        })
    }
}

/// Result of a block mutation: the server's view of the affected week.
#[derive(Debug, Clone, Serialize)]
pub struct BlockOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Appointment>,
    pub week: WeekGrid,
}

pub struct BlockService {
    api: ApiClient,
    weeks: WeekService,
}

impl BlockService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
            weeks: WeekService::new(config),
        }
    }

    /// Creates the block, then refetches the week that contains it.
    pub async fn create(
        &self,
        session: &Session,
        form: &BlockForm,
        now: DateTime<FixedOffset>,
    ) -> Result<BlockOutcome, AppointmentError> {
        let today = now.date_naive();
        let new_block = form.validate(today).inspect_err(|e| {
            warn!("Rejected block form: {}", e);
        })?;
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;

        debug!(
            "Blocking {} {}-{}",
            new_block.date, new_block.start_time, new_block.end_time
        );

        let body = serde_json::to_value(&new_block).map_err(ApiError::from)?;
        let result = self
            .api
            .request::<Appointment>(Method::POST, "/appointments/block", Some(&token), Some(body))
            .await;
        let block = session.observe(result)?;
        info!("Block {} created on {}", block.id, block.date);

        let offset = week_offset(today, new_block.date);
        let week = self.weeks.dashboard_week(session, offset, now).await?;

        Ok(BlockOutcome {
            block: Some(block),
            week,
        })
    }

    /// Deletes the block and refetches week `offset`; the freed slot is only
    /// shown once the server confirms it.
    pub async fn remove(
        &self,
        session: &Session,
        block_id: i64,
        offset: i64,
        now: DateTime<FixedOffset>,
    ) -> Result<BlockOutcome, AppointmentError> {
        let token = session.token().ok_or(AppointmentError::LoginRequired)?;
        debug!("Removing block {}", block_id);

        let path = format!("/appointments/block/{}", block_id);
        let result = self
            .api
            .request_no_content(Method::DELETE, &path, Some(&token))
            .await;
        session.observe(result)?;
        info!("Block {} removed", block_id);

        let week = self.weeks.dashboard_week(session, offset, now).await?;
        Ok(BlockOutcome { block: None, week })
    }
}

/// Weeks between the current week and the one containing `date`.
pub fn week_offset(today: NaiveDate, date: NaiveDate) -> i64 {
    (week_start(date, 0) - week_start(today, 0)).num_weeks()
}
