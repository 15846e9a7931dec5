// libs/schedule-cell/src/services/hours.rs
//
// Schedule Model: which whole hours of a day are structurally bookable,
// ignoring occupancy.
use std::collections::BTreeSet;

use chrono::NaiveDate;

use shared_utils::time::backend_weekday;

use crate::models::WorkingHour;

/// Sorted, de-duplicated hours covered by every window of `backend_day` (Monday=0).
pub fn hours_for_day(working_hours: &[WorkingHour], backend_day: u8) -> Vec<u32> {
    working_hours
        .iter()
        .filter(|wh| wh.day_of_week == backend_day)
        .flat_map(WorkingHour::hours)
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect()
}

pub fn hours_for_date(working_hours: &[WorkingHour], date: NaiveDate) -> Vec<u32> {
    hours_for_day(working_hours, backend_weekday(date))
}

/// True when at least one window is defined for the weekday of `date`.
pub fn has_working_hours(working_hours: &[WorkingHour], date: NaiveDate) -> bool {
    let day = backend_weekday(date);
    working_hours.iter().any(|wh| wh.day_of_week == day)
}

pub fn covers_hour(working_hours: &[WorkingHour], date: NaiveDate, hour: u32) -> bool {
    let day = backend_weekday(date);
    working_hours
        .iter()
        .any(|wh| wh.day_of_week == day && wh.covers_hour(hour))
}

/// Orders windows by weekday, then start time.
pub fn sort_working_hours(working_hours: &mut [WorkingHour]) {
    working_hours.sort_by_key(|wh| (wh.day_of_week, wh.start_time, wh.end_time));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Duration, NaiveTime};
    use shared_utils::time::backend_day_index;

    fn window(id: i64, day: u8, start: u32, end: u32) -> WorkingHour {
        WorkingHour {
            id,
            professional_id: 1,
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        }
    }

    #[test]
    fn union_of_disjoint_windows() {
        let hours = vec![window(1, 0, 8, 12), window(2, 0, 14, 18)];
        assert_eq!(hours_for_day(&hours, 0), vec![8, 9, 10, 11, 14, 15, 16, 17]);
    }

    #[test]
    fn overlapping_windows_collapse() {
        let hours = vec![window(1, 2, 9, 13), window(2, 2, 11, 15), window(3, 3, 8, 9)];
        assert_eq!(hours_for_day(&hours, 2), vec![9, 10, 11, 12, 13, 14]);
    }

    #[test]
    fn day_without_windows_is_empty() {
        let hours = vec![window(1, 0, 8, 12)];
        assert!(hours_for_day(&hours, 5).is_empty());
        assert!(hours_for_day(&[], 0).is_empty());
    }

    #[test]
    fn every_calendar_weekday_reads_the_converted_index() {
        // One distinct window per backend day, so each date can only see its own.
        let hours: Vec<WorkingHour> = (0..7u8)
            .map(|day| window(day as i64, day, 8 + day as u32, 9 + day as u32))
            .collect();

        // 2026-10-18 is a Sunday.
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        for offset in 0..7 {
            let date = sunday + Duration::days(offset);
            let calendar = date.weekday().num_days_from_sunday();
            let backend = backend_day_index(calendar);
            assert_eq!(hours_for_date(&hours, date), vec![8 + backend as u32]);
        }

        assert_eq!(hours_for_date(&hours, sunday), vec![14]);
        let monday = sunday + Duration::days(1);
        assert_eq!(hours_for_date(&hours, monday), vec![8]);
    }

    #[test]
    fn presence_and_coverage_checks() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let hours = vec![window(1, 0, 8, 12)];

        assert!(has_working_hours(&hours, monday));
        assert!(!has_working_hours(&hours, monday.succ_opt().unwrap()));
        assert!(covers_hour(&hours, monday, 11));
        assert!(!covers_hour(&hours, monday, 12));
    }

    #[test]
    fn sorts_by_day_then_start() {
        let mut hours = vec![window(1, 3, 14, 18), window(2, 0, 14, 18), window(3, 3, 8, 12)];
        sort_working_hours(&mut hours);
        let ids: Vec<i64> = hours.iter().map(|wh| wh.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
