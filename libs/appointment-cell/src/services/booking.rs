// libs/appointment-cell/src/services/booking.rs
//
// Booking Transaction: selection -> validated request -> POST /appointments/.
// The server stays the authority on double booking; nothing here holds a slot.
use chrono::{DateTime, FixedOffset, NaiveDate};
use reqwest::Method;
use tracing::{debug, info, warn};

use shared_api::{ApiClient, ApiError};
use shared_config::AppConfig;
use shared_models::auth::CurrentUser;
use shared_utils::session::Session;
use shared_utils::time::hour_time;

use crate::models::{
    Appointment, AppointmentError, BookingConfirmation, BookingSelection,
    CreateAppointmentRequest, DurationType, Perspective, ProfessionalPublic, Service,
    SlotStatus,
};
use crate::services::occupancy::{is_day_available, resolve_slot};
use crate::services::week::WeekService;

/// Everything the pre-submission checks look at, captured at submit time.
#[derive(Debug, Clone, Copy)]
pub struct BookingContext<'a> {
    pub professional: &'a ProfessionalPublic,
    /// `None` when nobody is logged in.
    pub client: Option<&'a CurrentUser>,
    pub appointments: &'a [Appointment],
    pub now: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedBooking {
    pub professional_id: i64,
    pub service: Service,
    pub date: NaiveDate,
    /// Set for hourly services only.
    pub hour: Option<u32>,
}

/// Service, date and (for hourly services) hour are all picked.
pub fn validate_selection<'a>(
    selection: &BookingSelection,
    professional: &'a ProfessionalPublic,
) -> Result<(&'a Service, NaiveDate, Option<u32>), AppointmentError> {
    let service_id = selection.service_id.ok_or(AppointmentError::ServiceNotSelected)?;
    let service = professional
        .service(service_id)
        .ok_or(AppointmentError::ServiceNotFound(service_id))?;

    let date = selection.date.ok_or(AppointmentError::DateNotSelected)?;
    let hour = match service.duration_type {
        DurationType::Hourly => Some(selection.hour.ok_or(AppointmentError::SlotNotSelected)?),
        DurationType::Daily => None,
    };

    Ok((service, date, hour))
}

/// Mirrors the server-side checks so obviously invalid bookings never leave
/// the client.
pub fn validate_booking(
    selection: &BookingSelection,
    ctx: &BookingContext<'_>,
) -> Result<ValidatedBooking, AppointmentError> {
    let (service, date, hour) = validate_selection(selection, ctx.professional)?;

    let client = ctx.client.ok_or(AppointmentError::LoginRequired)?;
    let client_city = client.city().ok_or(AppointmentError::MissingClientCity)?;
    check_region(client_city, ctx.professional)?;

    match hour {
        Some(hour) => {
            let slot = resolve_slot(
                date,
                hour,
                ctx.appointments,
                &ctx.professional.working_hours,
                ctx.now,
                Perspective::Client,
            );
            if slot.status != SlotStatus::Available {
                return Err(AppointmentError::SlotNotAvailable {
                    hour,
                    status: slot.status,
                });
            }
        }
        None => {
            let today = ctx.now.date_naive();
            if !is_day_available(date, &ctx.professional.working_hours, ctx.appointments, today) {
                return Err(AppointmentError::DayNotAvailable(date));
            }
        }
    }

    Ok(ValidatedBooking {
        professional_id: ctx.professional.id,
        service: service.clone(),
        date,
        hour,
    })
}

/// Case-insensitive city equality. The state is not compared.
pub fn check_region(client_city: &str, professional: &ProfessionalPublic) -> Result<(), AppointmentError> {
    let matches = professional
        .city()
        .map(|pro_city| pro_city.trim().to_lowercase() == client_city.trim().to_lowercase())
        .unwrap_or(false);

    if matches {
        return Ok(());
    }

    let professional_city = match (professional.city(), professional.state.as_deref()) {
        (Some(city), Some(state)) => format!("{}, {}", city, state),
        (Some(city), None) => city.to_string(),
        (None, _) => "another region".to_string(),
    };

    Err(AppointmentError::RegionMismatch {
        client_city: client_city.to_string(),
        professional_city,
    })
}

/// Hourly bookings claim `[hour, hour + 1)`; daily bookings send no times.
pub fn build_request(booking: &ValidatedBooking) -> Result<CreateAppointmentRequest, AppointmentError> {
    let (start_time, end_time) = match booking.hour {
        Some(hour) => {
            let start = hour_time(hour).ok_or_else(|| AppointmentError::InvalidTime(format!("{}:00", hour)))?;
            let end = hour_time(hour + 1)
                .ok_or_else(|| AppointmentError::InvalidTime(format!("{}:00", hour + 1)))?;
            (Some(start), Some(end))
        }
        None => (None, None),
    };

    Ok(CreateAppointmentRequest {
        professional_id: booking.professional_id,
        service_id: booking.service.id,
        date: booking.date,
        start_time,
        end_time,
    })
}

pub struct BookingService {
    api: ApiClient,
    weeks: WeekService,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(config),
            weeks: WeekService::new(config),
        }
    }

    pub async fn professional(&self, professional_id: i64) -> Result<ProfessionalPublic, AppointmentError> {
        debug!("Fetching public profile of professional {}", professional_id);
        let path = format!("/users/{}/public", professional_id);
        let profile = self
            .api
            .request::<ProfessionalPublic>(Method::GET, &path, None, None)
            .await?;
        Ok(profile)
    }

    /// Occupancy for the 7 days starting at `date`. A failed fetch degrades to
    /// an empty list so availability falls back to working hours alone; the
    /// server still rejects a taken slot on submit.
    pub async fn occupancy(&self, professional_id: i64, date: NaiveDate) -> Vec<Appointment> {
        match self.weeks.professional_week(professional_id, date).await {
            Ok(appointments) => appointments,
            Err(e) => {
                warn!(
                    "Occupancy for professional {} unavailable ({}); showing working hours only",
                    professional_id, e
                );
                Vec::new()
            }
        }
    }

    /// Profile and occupancy fetched together.
    pub async fn availability(
        &self,
        professional_id: i64,
        date: NaiveDate,
    ) -> Result<(ProfessionalPublic, Vec<Appointment>), AppointmentError> {
        let (professional, appointments) = futures::try_join!(
            self.professional(professional_id),
            async { Ok::<_, AppointmentError>(self.occupancy(professional_id, date).await) }
        )?;
        Ok((professional, appointments))
    }

    pub async fn current_user(&self, session: &Session, token: &str) -> Result<CurrentUser, AppointmentError> {
        let result = self.api.current_user(token).await;
        Ok(session.observe(result)?)
    }

    /// Full transaction against fresh data: profile, caller and occupancy are
    /// fetched in parallel, validated, then submitted once.
    pub async fn book(
        &self,
        session: &Session,
        professional_id: i64,
        selection: &BookingSelection,
        now: DateTime<FixedOffset>,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let token = session.valid_token(now).ok_or(AppointmentError::LoginRequired)?;
        let date = selection.date.ok_or(AppointmentError::DateNotSelected)?;

        let ((professional, appointments), client) = futures::try_join!(
            self.availability(professional_id, date),
            self.current_user(session, &token)
        )?;

        let ctx = BookingContext {
            professional: &professional,
            client: Some(&client),
            appointments: &appointments,
            now,
        };
        let booking = validate_booking(selection, &ctx).inspect_err(|e| {
            warn!("Booking blocked before submission: {}", e);
        })?;

        self.submit(session, &token, &booking).await
    }

    pub async fn submit(
        &self,
        session: &Session,
        token: &str,
        booking: &ValidatedBooking,
    ) -> Result<BookingConfirmation, AppointmentError> {
        let request = build_request(booking)?;
        debug!(
            "Booking service {} with professional {} on {} ({:?})",
            request.service_id, request.professional_id, request.date, booking.hour
        );

        let body = serde_json::to_value(&request).map_err(ApiError::from)?;
        let result = self
            .api
            .request::<Appointment>(Method::POST, "/appointments/", Some(token), Some(body))
            .await;
        let appointment = session.observe(result)?;

        info!(
            "Appointment {} booked on {} {}-{}",
            appointment.id, appointment.date, appointment.start_time, appointment.end_time
        );

        Ok(BookingConfirmation {
            whatsapp_link: appointment.whatsapp_link.clone(),
            appointment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveTime, TimeZone};
    use serde_json::json;
    use shared_utils::test_utils::{sao_paulo, test_date, MockApiResponses};

    const NEXT_MONDAY: &str = "2026-10-26";

    fn professional(city: &str) -> ProfessionalPublic {
        serde_json::from_value(MockApiResponses::professional_public(
            3,
            city,
            "SP",
            vec![
                MockApiResponses::service(1, 3, "Instalação de tomada", "hourly", Some(80.0)),
                MockApiResponses::service(2, 3, "Reforma elétrica", "daily", None),
            ],
            vec![MockApiResponses::working_hour(1, 3, 0, "08:00:00", "12:00:00")],
        ))
        .unwrap()
    }

    fn client(city: Option<&str>) -> CurrentUser {
        serde_json::from_value(MockApiResponses::current_user(100, city)).unwrap()
    }

    fn now(date: &str, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        sao_paulo()
            .from_local_datetime(&test_date(date).and_hms_opt(hour, minute, 0).unwrap())
            .unwrap()
    }

    fn selection(service: Option<i64>, date: &str, hour: Option<u32>) -> BookingSelection {
        BookingSelection {
            service_id: service,
            date: Some(test_date(date)),
            hour,
        }
    }

    fn scheduled(date: &str, start: &str, end: &str) -> Appointment {
        serde_json::from_value(MockApiResponses::appointment(40, 3, date, start, end, "scheduled")).unwrap()
    }

    #[test]
    fn hourly_booking_builds_one_hour_request() {
        let pro = professional("Campinas");
        let user = client(Some("Campinas"));
        let ctx = BookingContext {
            professional: &pro,
            client: Some(&user),
            appointments: &[],
            now: now("2026-10-19", 9, 0),
        };

        let booking = validate_booking(&selection(Some(1), NEXT_MONDAY, Some(9)), &ctx).unwrap();
        let request = build_request(&booking).unwrap();

        assert_eq!(request.start_time, NaiveTime::from_hms_opt(9, 0, 0));
        assert_eq!(request.end_time, NaiveTime::from_hms_opt(10, 0, 0));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "professional_id": 3,
                "service_id": 1,
                "date": NEXT_MONDAY,
                "start_time": "09:00:00",
                "end_time": "10:00:00"
            })
        );
    }

    #[test]
    fn daily_booking_omits_times_and_ignores_hour() {
        let pro = professional("Campinas");
        let user = client(Some("Campinas"));
        let ctx = BookingContext {
            professional: &pro,
            client: Some(&user),
            appointments: &[],
            now: now("2026-10-19", 9, 0),
        };

        let booking = validate_booking(&selection(Some(2), NEXT_MONDAY, Some(9)), &ctx).unwrap();
        assert_eq!(booking.hour, None);

        let body = serde_json::to_value(build_request(&booking).unwrap()).unwrap();
        assert_eq!(body, json!({ "professional_id": 3, "service_id": 2, "date": NEXT_MONDAY }));
    }

    #[test]
    fn selection_is_checked_first() {
        let pro = professional("Campinas");
        let ctx = BookingContext {
            professional: &pro,
            client: None,
            appointments: &[],
            now: now("2026-10-19", 9, 0),
        };

        assert_matches!(
            validate_booking(&selection(None, NEXT_MONDAY, Some(9)), &ctx),
            Err(AppointmentError::ServiceNotSelected)
        );
        assert_matches!(
            validate_booking(&selection(Some(99), NEXT_MONDAY, Some(9)), &ctx),
            Err(AppointmentError::ServiceNotFound(99))
        );
        assert_matches!(
            validate_booking(&selection(Some(1), NEXT_MONDAY, None), &ctx),
            Err(AppointmentError::SlotNotSelected)
        );
        assert_matches!(
            validate_booking(&selection(Some(1), NEXT_MONDAY, Some(9)), &ctx),
            Err(AppointmentError::LoginRequired)
        );
    }

    #[test]
    fn region_gate_is_case_insensitive_and_ignores_state() {
        let pro = professional("Campinas");
        let same = client(Some("CAMPINAS"));
        let other = client(Some("Sumaré"));
        let nowhere = client(None);
        let sel = selection(Some(1), NEXT_MONDAY, Some(9));

        let mut ctx = BookingContext {
            professional: &pro,
            client: Some(&same),
            appointments: &[],
            now: now("2026-10-19", 9, 0),
        };
        assert!(validate_booking(&sel, &ctx).is_ok());

        ctx.client = Some(&other);
        let err = validate_booking(&sel, &ctx).unwrap_err();
        assert_matches!(err, AppointmentError::RegionMismatch { .. });
        assert_eq!(err.to_string(), "This professional only serves Campinas, SP");

        ctx.client = Some(&nowhere);
        assert_matches!(validate_booking(&sel, &ctx), Err(AppointmentError::MissingClientCity));

        let mut lower_state = professional("campinas");
        lower_state.state = Some("sp".to_string());
        ctx.professional = &lower_state;
        ctx.client = Some(&same);
        assert!(validate_booking(&sel, &ctx).is_ok());
    }

    #[test]
    fn stale_or_past_slots_are_refused() {
        let pro = professional("Campinas");
        let user = client(Some("Campinas"));
        let taken = vec![scheduled(NEXT_MONDAY, "09:00:00", "10:00:00")];

        let ctx = BookingContext {
            professional: &pro,
            client: Some(&user),
            appointments: &taken,
            now: now("2026-10-19", 9, 0),
        };
        assert_matches!(
            validate_booking(&selection(Some(1), NEXT_MONDAY, Some(9)), &ctx),
            Err(AppointmentError::SlotNotAvailable { hour: 9, status: SlotStatus::Occupied })
        );
        assert_matches!(
            validate_booking(&selection(Some(1), NEXT_MONDAY, Some(13)), &ctx),
            Err(AppointmentError::SlotNotAvailable { hour: 13, status: SlotStatus::Empty })
        );
        assert_matches!(
            validate_booking(&selection(Some(2), NEXT_MONDAY, None), &ctx),
            Err(AppointmentError::DayNotAvailable(_))
        );

        // Today is Monday 09:30: 08:00 has already started.
        let ctx = BookingContext {
            appointments: &[],
            now: now(NEXT_MONDAY, 9, 30),
            ..ctx
        };
        assert_matches!(
            validate_booking(&selection(Some(1), NEXT_MONDAY, Some(8)), &ctx),
            Err(AppointmentError::SlotNotAvailable { hour: 8, status: SlotStatus::Past })
        );
        assert!(validate_booking(&selection(Some(1), NEXT_MONDAY, Some(10)), &ctx).is_ok());
    }

    #[test]
    fn last_hour_of_day_has_no_end() {
        let booking = ValidatedBooking {
            professional_id: 3,
            service: professional("Campinas").services[0].clone(),
            date: test_date(NEXT_MONDAY),
            hour: Some(23),
        };
        assert_matches!(build_request(&booking), Err(AppointmentError::InvalidTime(_)));
    }
}
