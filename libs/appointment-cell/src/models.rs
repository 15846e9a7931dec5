// libs/appointment-cell/src/models.rs
use std::fmt;
use std::ops::Range;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use schedule_cell::{ScheduleError, WorkingHour};
use shared_api::ApiError;
use shared_utils::time::hour_of;

pub const DEFAULT_BLOCK_REASON: &str = "Bloqueio manual";
pub const MIN_REASON_LEN: usize = 5;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// Wire shape of an appointment or manual block as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub client_id: i64,
    pub professional_id: i64,
    #[serde(default)]
    pub service_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_manual_block: bool,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_whatsapp: Option<String>,
    #[serde(default)]
    pub client_city: Option<String>,
    #[serde(default)]
    pub professional_name: Option<String>,
    #[serde(default)]
    pub professional_whatsapp: Option<String>,
    #[serde(default)]
    pub professional_category: Option<String>,
    #[serde(default)]
    pub service_title: Option<String>,
    #[serde(default)]
    pub service_duration_type: Option<DurationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub whatsapp_link: Option<String>,
}

impl Appointment {
    /// Whole hours occupied, `[start_hour, end_hour)`.
    pub fn hours(&self) -> Range<u32> {
        hour_of(self.start_time)..hour_of(self.end_time)
    }

    pub fn covers(&self, date: NaiveDate, hour: u32) -> bool {
        self.date == date && self.hours().contains(&hour)
    }

    pub fn is_block(&self) -> bool {
        self.is_manual_block || self.status == AppointmentStatus::Blocked
    }

    /// Only live bookings and blocks take a slot; cancelled, completed and
    /// suspended rows may still show up in `/me/week`.
    pub fn occupies(&self) -> bool {
        self.is_block() || self.status == AppointmentStatus::Scheduled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
    Suspended,
    Blocked,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Suspended => write!(f, "suspended"),
            AppointmentStatus::Blocked => write!(f, "blocked"),
        }
    }
}

// ==============================================================================
// SERVICES AND PROFESSIONAL PROFILE
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationType {
    #[default]
    Hourly,
    Daily,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub professional_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `None` means "price on request".
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_type: DurationType,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub title: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    #[serde(default)]
    pub duration_type: DurationType,
}

/// `GET /users/{id}/public`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfessionalPublic {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub working_hours: Vec<WorkingHour>,
}

impl ProfessionalPublic {
    pub fn service(&self, service_id: i64) -> Option<&Service> {
        self.services.iter().find(|s| s.id == service_id)
    }

    pub fn city(&self) -> Option<&str> {
        self.city.as_deref().filter(|c| !c.trim().is_empty())
    }
}

// ==============================================================================
// DERIVED SLOT VIEWS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Occupied,
    Blocked,
    /// Start hour already elapsed today.
    Past,
    /// Outside every working window.
    Empty,
}

impl SlotStatus {
    pub fn is_selectable(&self) -> bool {
        matches!(self, SlotStatus::Available)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Occupied => write!(f, "occupied"),
            SlotStatus::Blocked => write!(f, "blocked"),
            SlotStatus::Past => write!(f, "past"),
            SlotStatus::Empty => write!(f, "empty"),
        }
    }
}

/// Who is looking at the grid; decides what an occupied slot reveals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Perspective {
    Professional,
    Client,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotView {
    pub date: NaiveDate,
    pub hour: u32,
    /// `HH:00`
    pub time: String,
    pub status: SlotStatus,
    pub label: String,
    pub phone: Option<String>,
    pub appointment_id: Option<i64>,
    /// More than one live appointment claims this hour. The server forbids it,
    /// so a value above 1 means the cached week is inconsistent.
    pub overlapping: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub hours: Vec<u32>,
    pub slots: Vec<SlotView>,
}

/// Seven days starting on Sunday, each with its own bookable hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekGrid {
    pub week_start: NaiveDate,
    pub days: Vec<DaySchedule>,
    /// Union of every day's hours, for laying out rows.
    pub hours: Vec<u32>,
}

impl WeekGrid {
    pub fn slot(&self, date: NaiveDate, hour: u32) -> Option<&SlotView> {
        self.days
            .iter()
            .find(|d| d.date == date)?
            .slots
            .iter()
            .find(|s| s.hour == hour)
    }
}

// ==============================================================================
// BOOKING MODELS
// ==============================================================================

/// What the user picked on the booking page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingSelection {
    pub service_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub hour: Option<u32>,
}

/// Body of `POST /appointments/`. Daily bookings omit the times; the API
/// fills them from the working day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateAppointmentRequest {
    pub professional_id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<NaiveTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<NaiveTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingConfirmation {
    pub appointment: Appointment,
    pub whatsapp_link: Option<String>,
}

// ==============================================================================
// MANUAL BLOCKS AND STATUS CHANGES
// ==============================================================================

/// Block form as typed by the professional.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockForm {
    /// `yyyy-mm-dd` or `dd/mm/yyyy`.
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Body of `POST /appointments/block`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBlock {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

// ==============================================================================
// HISTORY MODELS
// ==============================================================================

pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 10;
pub const MAX_HISTORY_PAGE_SIZE: u32 = 100;

/// Filters for `GET /appointments/history`. `client_id` narrows a professional's
/// history, `professional_id` a client's; the API ignores the one that does not
/// apply to the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub status_filter: Option<AppointmentStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub client_id: Option<i64>,
    pub professional_id: Option<i64>,
}

impl HistoryQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn size(&self) -> u32 {
        self.size
            .unwrap_or(DEFAULT_HISTORY_PAGE_SIZE)
            .clamp(1, MAX_HISTORY_PAGE_SIZE)
    }

    /// Query pairs as the API expects them; unset filters are left out.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page().to_string()),
            ("size", self.size().to_string()),
        ];
        if let Some(status) = self.status_filter {
            pairs.push(("status_filter", status.to_string()));
        }
        if let Some(start) = self.start_date {
            pairs.push(("start_date", start.to_string()));
        }
        if let Some(end) = self.end_date {
            pairs.push(("end_date", end.to_string()));
        }
        if let Some(id) = self.client_id {
            pairs.push(("client_id", id.to_string()));
        }
        if let Some(id) = self.professional_id {
            pairs.push(("professional_id", id.to_string()));
        }
        pairs
    }
}

/// One page of history, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentPage {
    pub items: Vec<Appointment>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub pages: u32,
}

/// Counterpart offered in the history filter: clients for a professional,
/// professionals for a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPerson {
    pub id: i64,
    pub name: String,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppointmentError {
    #[error("Select a service first")]
    ServiceNotSelected,

    #[error("Service {0} is not offered by this professional")]
    ServiceNotFound(i64),

    #[error("Select a date first")]
    DateNotSelected,

    #[error("Choose an available time slot")]
    SlotNotSelected,

    #[error("The {hour:02}:00 slot is not available ({status})")]
    SlotNotAvailable { hour: u32, status: SlotStatus },

    #[error("{0} is not available for a full-day service")]
    DayNotAvailable(NaiveDate),

    #[error("{0} is in the past")]
    DateInPast(NaiveDate),

    #[error("You need to be logged in to book")]
    LoginRequired,

    #[error("Complete your profile with CEP and address before booking")]
    MissingClientCity,

    #[error("This professional only serves {professional_city}")]
    RegionMismatch {
        client_city: String,
        professional_city: String,
    },

    #[error("Invalid date '{0}': use yyyy-mm-dd or dd/mm/yyyy")]
    InvalidDate(String),

    #[error("Invalid time '{0}': use the 24h format HH:MM")]
    InvalidTime(String),

    #[error("End time must be after start time")]
    InvalidRange,

    #[error("End date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("Reason is mandatory and must be at least 5 characters")]
    ReasonRequired,

    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Manual blocks are removed, not transitioned")]
    BlockNotTransitionable,

    #[error("Only professionals can mark an appointment as completed")]
    ProfessionalOnly,

    #[error("Invalid service: {0}")]
    InvalidService(String),

    #[error("A booking is already being submitted")]
    SubmissionInProgress,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<ScheduleError> for AppointmentError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::Api(api) => AppointmentError::Api(api),
            ScheduleError::Unauthenticated => AppointmentError::LoginRequired,
            ScheduleError::InvalidRange => AppointmentError::InvalidRange,
            other => AppointmentError::InvalidTime(other.to_string()),
        }
    }
}

impl AppointmentError {
    /// Errors caught before anything is sent to the API.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            AppointmentError::Api(_)
                | AppointmentError::LoginRequired
                | AppointmentError::SubmissionInProgress
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn appointment(status: &str, is_manual_block: bool) -> Appointment {
        serde_json::from_value(json!({
            "id": 1,
            "client_id": 2,
            "professional_id": 3,
            "date": "2026-10-19",
            "start_time": "09:00:00",
            "end_time": "11:00:00",
            "status": status,
            "is_manual_block": is_manual_block
        }))
        .unwrap()
    }

    #[test]
    fn only_scheduled_and_blocks_occupy() {
        assert!(appointment("scheduled", false).occupies());
        assert!(appointment("blocked", true).occupies());
        assert!(appointment("blocked", false).is_block());
        assert!(!appointment("cancelled", false).occupies());
        assert!(!appointment("completed", false).occupies());
        assert!(!appointment("suspended", false).occupies());
    }

    #[test]
    fn interval_is_half_open() {
        let appt = appointment("scheduled", false);
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        assert!(appt.covers(date, 9));
        assert!(appt.covers(date, 10));
        assert!(!appt.covers(date, 11));
        assert!(!appt.covers(date.succ_opt().unwrap(), 9));
    }

    #[test]
    fn daily_request_omits_times() {
        let request = CreateAppointmentRequest {
            professional_id: 3,
            service_id: 5,
            date: NaiveDate::from_ymd_opt(2026, 10, 26).unwrap(),
            start_time: None,
            end_time: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "professional_id": 3, "service_id": 5, "date": "2026-10-26" })
        );
    }

    #[test]
    fn service_defaults_to_hourly() {
        let service: Service = serde_json::from_value(json!({
            "id": 1, "professional_id": 3, "title": "Visita técnica", "price": null
        }))
        .unwrap();
        assert_eq!(service.duration_type, DurationType::Hourly);
        assert_eq!(service.price, None);
    }

    #[test]
    fn history_query_clamps_paging_and_skips_unset_filters() {
        let query = HistoryQuery {
            page: Some(0),
            size: Some(500),
            professional_id: Some(3),
            ..Default::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page", "1".to_string()),
                ("size", "100".to_string()),
                ("professional_id", "3".to_string()),
            ]
        );
    }
}
