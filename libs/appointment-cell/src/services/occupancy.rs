// libs/appointment-cell/src/services/occupancy.rs
//
// Occupancy Resolver: classifies each structurally bookable hour using the
// fetched week of appointments. Pure; every call recomputes from its inputs.
use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use tracing::warn;

use schedule_cell::{covers_hour, has_working_hours, hours_for_date, WorkingHour};
use shared_utils::time::week_dates;

use crate::models::{
    Appointment, DaySchedule, Perspective, SlotStatus, SlotView, WeekGrid,
};

const LABEL_AVAILABLE: &str = "Disponível";
const LABEL_OCCUPIED: &str = "Ocupado";
const LABEL_BLOCKED: &str = "Bloqueado";
const LABEL_PAST: &str = "Indisponível";

/// Resolves one hour of one date.
///
/// Order: live appointment or block covering the hour, then "already started
/// today", then working windows. Cancelled, completed and suspended rows are
/// ignored.
pub fn resolve_slot(
    date: NaiveDate,
    hour: u32,
    appointments: &[Appointment],
    working_hours: &[WorkingHour],
    now: DateTime<FixedOffset>,
    perspective: Perspective,
) -> SlotView {
    let matches: Vec<&Appointment> = appointments
        .iter()
        .filter(|a| a.occupies() && a.covers(date, hour))
        .collect();

    if matches.len() > 1 {
        let ids: Vec<i64> = matches.iter().map(|a| a.id).collect();
        warn!(
            "Overlapping appointments {:?} on {} at {:02}:00; using the first",
            ids, date, hour
        );
    }

    let mut view = SlotView {
        date,
        hour,
        time: format!("{:02}:00", hour),
        status: SlotStatus::Empty,
        label: String::new(),
        phone: None,
        appointment_id: None,
        overlapping: matches.len(),
    };

    if let Some(appt) = matches.first() {
        view.appointment_id = Some(appt.id);

        if appt.is_block() {
            view.status = SlotStatus::Blocked;
            view.label = LABEL_BLOCKED.to_string();
            return view;
        }

        view.status = SlotStatus::Occupied;
        match perspective {
            Perspective::Professional => {
                view.label = appt
                    .client_name
                    .clone()
                    .unwrap_or_else(|| LABEL_OCCUPIED.to_string());
                view.phone = appt.client_whatsapp.clone();
            }
            Perspective::Client => {
                view.label = appt
                    .professional_name
                    .clone()
                    .unwrap_or_else(|| LABEL_OCCUPIED.to_string());
            }
        }
        return view;
    }

    if is_past_hour(date, hour, now) {
        view.status = SlotStatus::Past;
        view.label = LABEL_PAST.to_string();
        return view;
    }

    if covers_hour(working_hours, date, hour) {
        view.status = SlotStatus::Available;
        view.label = LABEL_AVAILABLE.to_string();
    }

    view
}

/// Strictly earlier dates count as past too; slots there are never offered.
pub fn is_past_hour(date: NaiveDate, hour: u32, now: DateTime<FixedOffset>) -> bool {
    let today = now.date_naive();
    date < today || (date == today && hour <= now.hour())
}

/// Ordered grid of the working hours of `date`. A date without working
/// windows yields no slots at all.
pub fn slots_for_date(
    date: NaiveDate,
    working_hours: &[WorkingHour],
    appointments: &[Appointment],
    now: DateTime<FixedOffset>,
    perspective: Perspective,
) -> Vec<SlotView> {
    hours_for_date(working_hours, date)
        .into_iter()
        .map(|hour| resolve_slot(date, hour, appointments, working_hours, now, perspective))
        .collect()
}

/// Day-level check for daily services: not before today, has a working
/// window, and no live appointment or block at any hour.
pub fn is_day_available(
    date: NaiveDate,
    working_hours: &[WorkingHour],
    appointments: &[Appointment],
    today: NaiveDate,
) -> bool {
    if date < today {
        return false;
    }

    if !has_working_hours(working_hours, date) {
        return false;
    }

    !appointments.iter().any(|a| a.occupies() && a.date == date)
}

pub fn day_schedule(
    date: NaiveDate,
    working_hours: &[WorkingHour],
    appointments: &[Appointment],
    now: DateTime<FixedOffset>,
    perspective: Perspective,
) -> DaySchedule {
    DaySchedule {
        date,
        hours: hours_for_date(working_hours, date),
        slots: slots_for_date(date, working_hours, appointments, now, perspective),
    }
}

/// Sunday-first week starting at `week_start`.
pub fn week_grid(
    week_start: NaiveDate,
    working_hours: &[WorkingHour],
    appointments: &[Appointment],
    now: DateTime<FixedOffset>,
    perspective: Perspective,
) -> WeekGrid {
    let days: Vec<DaySchedule> = week_dates(week_start)
        .into_iter()
        .map(|date| day_schedule(date, working_hours, appointments, now, perspective))
        .collect();

    let hours = days
        .iter()
        .flat_map(|d| d.hours.iter().copied())
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect();

    WeekGrid {
        week_start,
        days,
        hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentStatus;
    use chrono::{Duration, NaiveTime, TimeZone};
    use shared_utils::test_utils::{sao_paulo, test_date};

    // 2026-10-19 is a Monday.
    const MONDAY: &str = "2026-10-19";

    fn at(date: &str, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        sao_paulo()
            .from_local_datetime(&test_date(date).and_hms_opt(hour, minute, 0).unwrap())
            .unwrap()
    }

    fn window(day: u8, start: u32, end: u32) -> WorkingHour {
        WorkingHour {
            id: day as i64 * 10 + start as i64,
            professional_id: 1,
            day_of_week: day,
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
        }
    }

    fn appt(id: i64, date: &str, start: u32, end: u32, status: AppointmentStatus) -> Appointment {
        Appointment {
            id,
            client_id: 50,
            professional_id: 1,
            service_id: Some(1),
            date: test_date(date),
            start_time: NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end, 0, 0).unwrap(),
            status,
            reason: None,
            is_manual_block: false,
            client_name: Some("Maria Souza".into()),
            client_whatsapp: Some("11999990000".into()),
            client_city: None,
            professional_name: Some("João Eletricista".into()),
            professional_whatsapp: None,
            professional_category: None,
            service_title: None,
            service_duration_type: None,
            whatsapp_link: None,
        }
    }

    fn block(id: i64, date: &str, start: u32, end: u32) -> Appointment {
        Appointment {
            is_manual_block: true,
            status: AppointmentStatus::Blocked,
            service_id: None,
            client_name: None,
            client_whatsapp: None,
            ..appt(id, date, start, end, AppointmentStatus::Blocked)
        }
    }

    fn statuses(slots: &[SlotView]) -> Vec<(u32, SlotStatus)> {
        slots.iter().map(|s| (s.hour, s.status)).collect()
    }

    #[test]
    fn free_day_is_all_available() {
        let hours = vec![window(0, 8, 12)];
        let slots = slots_for_date(test_date(MONDAY), &hours, &[], at("2026-10-12", 9, 0), Perspective::Client);
        assert_eq!(
            statuses(&slots),
            vec![
                (8, SlotStatus::Available),
                (9, SlotStatus::Available),
                (10, SlotStatus::Available),
                (11, SlotStatus::Available),
            ]
        );
        assert_eq!(slots[1].time, "09:00");
        assert_eq!(slots[1].label, "Disponível");
    }

    #[test]
    fn past_hours_today_are_never_available() {
        let hours = vec![window(0, 8, 14)];
        let appointments = vec![appt(1, MONDAY, 12, 13, AppointmentStatus::Scheduled)];
        let slots = slots_for_date(
            test_date(MONDAY),
            &hours,
            &appointments,
            at(MONDAY, 10, 0),
            Perspective::Client,
        );

        assert_eq!(
            statuses(&slots),
            vec![
                (8, SlotStatus::Past),
                (9, SlotStatus::Past),
                (10, SlotStatus::Past),
                (11, SlotStatus::Available),
                (12, SlotStatus::Occupied),
                (13, SlotStatus::Available),
            ]
        );
    }

    #[test]
    fn appointment_match_precedes_past_check() {
        let hours = vec![window(0, 8, 12)];
        let appointments = vec![appt(1, MONDAY, 8, 9, AppointmentStatus::Scheduled), block(2, MONDAY, 9, 10)];
        let now = at(MONDAY, 11, 15);

        let slot = resolve_slot(test_date(MONDAY), 8, &appointments, &hours, now, Perspective::Professional);
        assert_eq!(slot.status, SlotStatus::Occupied);
        let slot = resolve_slot(test_date(MONDAY), 9, &appointments, &hours, now, Perspective::Professional);
        assert_eq!(slot.status, SlotStatus::Blocked);
        let slot = resolve_slot(test_date(MONDAY), 10, &appointments, &hours, now, Perspective::Professional);
        assert_eq!(slot.status, SlotStatus::Past);
    }

    #[test]
    fn day_without_windows_has_no_slots() {
        let hours = vec![window(0, 8, 12)];
        let tuesday = test_date(MONDAY) + Duration::days(1);
        assert!(slots_for_date(tuesday, &hours, &[], at("2026-10-12", 9, 0), Perspective::Client).is_empty());
        assert!(slots_for_date(tuesday, &[], &[], at("2026-10-12", 9, 0), Perspective::Client).is_empty());
    }

    #[test]
    fn hours_outside_windows_resolve_empty() {
        let hours = vec![window(0, 8, 12), window(0, 14, 18)];
        let slot = resolve_slot(test_date(MONDAY), 12, &[], &hours, at("2026-10-12", 9, 0), Perspective::Client);
        assert_eq!(slot.status, SlotStatus::Empty);
        assert!(slot.label.is_empty());
        assert!(!slot.status.is_selectable());
    }

    #[test]
    fn block_and_booking_are_distinguishable() {
        let hours = vec![window(0, 8, 12)];
        let booked = vec![appt(1, MONDAY, 9, 10, AppointmentStatus::Scheduled)];
        let blocked = vec![block(2, MONDAY, 9, 10)];
        let now = at("2026-10-12", 9, 0);

        let a = resolve_slot(test_date(MONDAY), 9, &booked, &hours, now, Perspective::Professional);
        let b = resolve_slot(test_date(MONDAY), 9, &blocked, &hours, now, Perspective::Professional);

        assert!(!a.status.is_selectable());
        assert!(!b.status.is_selectable());
        assert_eq!(a.status, SlotStatus::Occupied);
        assert_eq!(a.label, "Maria Souza");
        assert_eq!(a.phone.as_deref(), Some("11999990000"));
        assert_eq!(b.status, SlotStatus::Blocked);
        assert_eq!(b.label, "Bloqueado");
        assert_eq!(b.appointment_id, Some(2));
    }

    #[test]
    fn client_view_never_shows_other_clients() {
        let hours = vec![window(0, 8, 12)];
        let booked = vec![appt(1, MONDAY, 9, 10, AppointmentStatus::Scheduled)];
        let slot = resolve_slot(test_date(MONDAY), 9, &booked, &hours, at("2026-10-12", 9, 0), Perspective::Client);
        assert_eq!(slot.label, "João Eletricista");
        assert_eq!(slot.phone, None);
    }

    #[test]
    fn cancelled_rows_free_the_slot() {
        let hours = vec![window(0, 8, 12)];
        let appointments = vec![
            appt(1, MONDAY, 9, 10, AppointmentStatus::Cancelled),
            appt(2, MONDAY, 10, 11, AppointmentStatus::Suspended),
            appt(3, MONDAY, 11, 12, AppointmentStatus::Completed),
        ];
        let slots = slots_for_date(test_date(MONDAY), &hours, &appointments, at("2026-10-12", 9, 0), Perspective::Client);
        assert!(slots.iter().all(|s| s.status == SlotStatus::Available));
        assert!(is_day_available(test_date(MONDAY), &hours, &appointments, test_date("2026-10-12")));
    }

    #[test]
    fn overlap_is_exposed_and_first_wins() {
        let hours = vec![window(0, 8, 12)];
        let appointments = vec![
            appt(7, MONDAY, 9, 11, AppointmentStatus::Scheduled),
            appt(8, MONDAY, 10, 11, AppointmentStatus::Scheduled),
        ];
        let slot = resolve_slot(test_date(MONDAY), 10, &appointments, &hours, at("2026-10-12", 9, 0), Perspective::Professional);
        assert_eq!(slot.appointment_id, Some(7));
        assert_eq!(slot.overlapping, 2);

        let slot = resolve_slot(test_date(MONDAY), 9, &appointments, &hours, at("2026-10-12", 9, 0), Perspective::Professional);
        assert_eq!(slot.overlapping, 1);
    }

    #[test]
    fn single_booking_blocks_whole_day_for_daily_services() {
        let hours = vec![window(0, 8, 18)];
        let appointments = vec![appt(1, MONDAY, 15, 16, AppointmentStatus::Scheduled)];
        let today = test_date("2026-10-12");
        let now = at("2026-10-12", 9, 0);

        assert!(!is_day_available(test_date(MONDAY), &hours, &appointments, today));

        let slots = slots_for_date(test_date(MONDAY), &hours, &appointments, now, Perspective::Client);
        assert_eq!(slots.iter().filter(|s| s.status == SlotStatus::Available).count(), 9);
    }

    #[test]
    fn day_availability_rules() {
        let hours = vec![window(0, 8, 18)];
        let monday = test_date(MONDAY);

        assert!(is_day_available(monday, &hours, &[], monday));
        assert!(!is_day_available(monday, &hours, &[], monday + Duration::days(1)));
        assert!(!is_day_available(monday + Duration::days(1), &hours, &[], monday));
        assert!(!is_day_available(monday, &hours, &[block(3, MONDAY, 8, 9)], monday));
    }

    #[test]
    fn week_grid_is_sunday_first_with_union_of_hours() {
        let hours = vec![window(0, 8, 12), window(2, 14, 16), window(6, 9, 10)];
        let sunday = test_date("2026-10-18");
        let appointments = vec![appt(1, MONDAY, 9, 10, AppointmentStatus::Scheduled)];

        let grid = week_grid(sunday, &hours, &appointments, at("2026-10-12", 9, 0), Perspective::Professional);

        assert_eq!(grid.days.len(), 7);
        assert_eq!(grid.days[0].date, sunday);
        assert_eq!(grid.days[0].hours, vec![9]);
        assert_eq!(grid.days[1].hours, vec![8, 9, 10, 11]);
        assert_eq!(grid.days[3].hours, vec![14, 15]);
        assert!(grid.days[2].slots.is_empty());
        assert_eq!(grid.hours, vec![8, 9, 10, 11, 14, 15]);
        assert_eq!(grid.slot(test_date(MONDAY), 9).map(|s| s.status), Some(SlotStatus::Occupied));
    }

    #[test]
    fn recomputing_from_same_inputs_is_stable() {
        let hours = vec![window(0, 8, 12)];
        let appointments = vec![appt(1, MONDAY, 9, 10, AppointmentStatus::Scheduled)];
        let now = at("2026-10-12", 9, 0);
        let sunday = test_date("2026-10-18");

        let first = week_grid(sunday, &hours, &appointments, now, Perspective::Professional);
        let second = week_grid(sunday, &hours, &appointments, now, Perspective::Professional);
        assert_eq!(first, second);
    }
}
