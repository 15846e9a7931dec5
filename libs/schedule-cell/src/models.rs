// libs/schedule-cell/src/models.rs
use std::ops::Range;

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_api::ApiError;
use shared_utils::time::{hour_of, parse_clock_time};

/// Recurring weekly availability window of a professional.
///
/// `day_of_week` follows the backend numbering: Monday=0 .. Sunday=6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHour {
    pub id: i64,
    pub professional_id: i64,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl WorkingHour {
    /// Whole hours covered by the window, `start_hour..end_hour`.
    pub fn hours(&self) -> Range<u32> {
        hour_of(self.start_time)..hour_of(self.end_time)
    }

    pub fn covers_hour(&self, hour: u32) -> bool {
        self.hours().contains(&hour)
    }
}

/// Working hour as typed into the schedule form (`HH:MM`, 24h).
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkingHourRequest {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
}

/// Validated body for `POST /schedule/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewWorkingHour {
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl CreateWorkingHourRequest {
    pub fn validate(&self) -> Result<NewWorkingHour, ScheduleError> {
        if self.day_of_week > 6 {
            return Err(ScheduleError::InvalidDay(self.day_of_week));
        }

        let start_time = parse_clock_time(&self.start_time)
            .ok_or_else(|| ScheduleError::InvalidTime(self.start_time.clone()))?;
        let end_time = parse_clock_time(&self.end_time)
            .ok_or_else(|| ScheduleError::InvalidTime(self.end_time.clone()))?;

        if start_time >= end_time {
            return Err(ScheduleError::InvalidRange);
        }

        Ok(NewWorkingHour {
            day_of_week: self.day_of_week,
            start_time,
            end_time,
        })
    }
}

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Day of week must be between 0 (Monday) and 6 (Sunday), got {0}")]
    InvalidDay(u8),

    #[error("Invalid time '{0}': use the 24h format HH:MM (e.g. 08:00, 23:59)")]
    InvalidTime(String),

    #[error("End time must be after start time")]
    InvalidRange,

    #[error("Authentication required")]
    Unauthenticated,

    #[error(transparent)]
    Api(#[from] ApiError),
}
