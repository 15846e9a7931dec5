//! Date and time helpers shared by the schedule and appointment cells.
//!
//! All "today" and "past hour" decisions go through a [`Clock`] configured with a single
//! fixed offset, so the grid, the booking validation and the dashboard agree on what day it is.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use regex::Regex;

use shared_config::AppConfig;

pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%d";
pub const WIRE_TIME_FORMAT: &str = "%H:%M:%S";
pub const BR_DATE_FORMAT: &str = "%d/%m/%Y";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.timezone())
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now }
    }

    /// Wall-clock `hour:minute` on `date` in the given offset.
    pub fn at(date: NaiveDate, hour: u32, minute: u32, offset: FixedOffset) -> Option<Self> {
        let naive = date.and_hms_opt(hour, minute, 0)?;
        let now = offset.from_local_datetime(&naive).single()?;
        Some(Self::new(now))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }
}

/// Converts calendar weekday numbering (Sunday=0 .. Saturday=6) to the backend's
/// `day_of_week` numbering (Monday=0 .. Sunday=6).
///
/// This is the only place the conversion happens. Anything that looks up working hours for a
/// date goes through [`backend_weekday`].
pub fn backend_day_index(calendar_index: u32) -> u8 {
    match calendar_index % 7 {
        0 => 6,
        other => (other - 1) as u8,
    }
}

/// Backend `day_of_week` for a calendar date.
pub fn backend_weekday(date: NaiveDate) -> u8 {
    backend_day_index(date.weekday().num_days_from_sunday())
}

/// Sunday starting the week that contains `today`, shifted by `offset` weeks.
pub fn week_start(today: NaiveDate, offset: i64) -> NaiveDate {
    let since_sunday = today.weekday().num_days_from_sunday() as i64;
    today - Duration::days(since_sunday) + Duration::weeks(offset)
}

pub fn week_dates(start: NaiveDate) -> [NaiveDate; 7] {
    std::array::from_fn(|i| start + Duration::days(i as i64))
}

/// Hour-granular position of a time of day; minutes are ignored.
pub fn hour_of(time: NaiveTime) -> u32 {
    time.hour()
}

/// `HH:00:00` for a whole hour, `None` past 23.
pub fn hour_time(hour: u32) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour, 0, 0)
}

pub fn format_wire_date(date: NaiveDate) -> String {
    date.format(WIRE_DATE_FORMAT).to_string()
}

pub fn format_wire_time(time: NaiveTime) -> String {
    time.format(WIRE_TIME_FORMAT).to_string()
}

pub fn format_date_br(date: NaiveDate) -> String {
    date.format(BR_DATE_FORMAT).to_string()
}

/// Parses `dd/mm/yyyy`, rejecting impossible dates such as 31/02.
pub fn parse_date_br(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(input, BR_DATE_FORMAT).ok()
}

/// Accepts either the wire form (`yyyy-mm-dd`) or the Brazilian display form (`dd/mm/yyyy`).
pub fn parse_user_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, WIRE_DATE_FORMAT)
        .ok()
        .or_else(|| parse_date_br(input))
}

fn clock_time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(:([0-5]\d))?$").expect("static pattern compiles")
    })
}

/// Parses 24h `HH:MM` (or `HH:MM:SS`) as typed into schedule and block forms.
pub fn parse_clock_time(input: &str) -> Option<NaiveTime> {
    let captures = clock_time_pattern().captures(input.trim())?;
    let hour = captures.get(1)?.as_str().parse().ok()?;
    let minute = captures.get(2)?.as_str().parse().ok()?;
    let second = captures
        .get(4)
        .and_then(|s| s.as_str().parse().ok())
        .unwrap_or(0);
    NaiveTime::from_hms_opt(hour, minute, second)
}
