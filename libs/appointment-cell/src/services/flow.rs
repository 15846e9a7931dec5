// libs/appointment-cell/src/services/flow.rs
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use shared_config::AppConfig;
use shared_utils::concurrency::{InFlight, LatestFetch};
use shared_utils::session::Session;
use shared_utils::time::Clock;

use crate::models::{
    Appointment, AppointmentError, BookingConfirmation, BookingSelection, Perspective,
    ProfessionalPublic, SlotStatus, SlotView,
};
use crate::services::booking::{
    validate_booking, validate_selection, BookingContext, BookingService,
};
use crate::services::occupancy::{is_day_available, resolve_slot, slots_for_date};

#[derive(Debug, Default)]
struct FlowState {
    professional: Option<ProfessionalPublic>,
    appointments: Vec<Appointment>,
    loaded_for: Option<NaiveDate>,
    selection: BookingSelection,
}

impl FlowState {
    /// Profile and appointments when the held week covers `date`. Each load
    /// fetches `[loaded_for, loaded_for + 7)`; outside it nothing is known.
    fn snapshot_for(&self, date: NaiveDate) -> Option<(&ProfessionalPublic, &[Appointment])> {
        let start = self.loaded_for?;
        if date < start || date >= start + Duration::days(7) {
            return None;
        }
        let professional = self.professional.as_ref()?;
        Some((professional, &self.appointments))
    }
}

/// Booking page controller for one professional.
///
/// Holds the selection and the last accepted occupancy snapshot. Fetch results
/// that were superseded (or arrive after [`BookingFlow::close`]) are dropped,
/// and only one submission can run at a time. Share it behind an `Arc`; every
/// method takes `&self`. The state lock is never held across an `.await`.
pub struct BookingFlow {
    booking: BookingService,
    session: Session,
    clock: Arc<dyn Clock>,
    professional_id: i64,
    fetches: LatestFetch<NaiveDate>,
    submitting: InFlight<i64>,
    state: Mutex<FlowState>,
}

impl BookingFlow {
    pub fn new(config: &AppConfig, session: Session, clock: Arc<dyn Clock>, professional_id: i64) -> Self {
        Self {
            booking: BookingService::new(config),
            session,
            clock,
            professional_id,
            fetches: LatestFetch::new(),
            submitting: InFlight::new(),
            state: Mutex::new(FlowState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Fetches profile and occupancy for `date`. Returns `false` when a newer
    /// load started meanwhile (or the flow was closed) and the result was discarded.
    pub async fn load(&self, date: NaiveDate) -> Result<bool, AppointmentError> {
        let ticket = self.fetches.begin(date);
        let result = self.booking.availability(self.professional_id, date).await;

        if !self.fetches.is_current(&ticket) {
            return Ok(false);
        }

        let (professional, appointments) = result?;
        debug!(
            "Loaded {} appointments for professional {} from {}",
            appointments.len(),
            self.professional_id,
            date
        );

        let mut state = self.state();
        state.professional = Some(professional);
        state.appointments = appointments;
        state.loaded_for = Some(date);
        Ok(true)
    }

    pub fn select_service(&self, service_id: i64) -> Result<(), AppointmentError> {
        let mut state = self.state();
        if let Some(professional) = &state.professional {
            if professional.service(service_id).is_none() {
                return Err(AppointmentError::ServiceNotFound(service_id));
            }
        }
        state.selection.service_id = Some(service_id);
        state.selection.hour = None;
        Ok(())
    }

    /// Moves to another date and loads its occupancy. The hour selection is cleared.
    pub async fn select_date(&self, date: NaiveDate) -> Result<bool, AppointmentError> {
        {
            let mut state = self.state();
            state.selection.date = Some(date);
            state.selection.hour = None;
        }
        self.load(date).await
    }

    /// Accepts an hour only if it is available in the current snapshot.
    pub fn select_hour(&self, hour: u32) -> Result<(), AppointmentError> {
        let mut state = self.state();
        let date = state.selection.date.ok_or(AppointmentError::DateNotSelected)?;

        let status = match state.snapshot_for(date) {
            Some((professional, appointments)) => {
                resolve_slot(
                    date,
                    hour,
                    appointments,
                    &professional.working_hours,
                    self.clock.now(),
                    Perspective::Client,
                )
                .status
            }
            None => SlotStatus::Empty,
        };

        if !status.is_selectable() {
            return Err(AppointmentError::SlotNotAvailable { hour, status });
        }

        state.selection.hour = Some(hour);
        Ok(())
    }

    pub fn selection(&self) -> BookingSelection {
        self.state().selection.clone()
    }

    /// Date whose occupancy snapshot is currently held.
    pub fn loaded_for(&self) -> Option<NaiveDate> {
        self.state().loaded_for
    }

    pub fn professional(&self) -> Option<ProfessionalPublic> {
        self.state().professional.clone()
    }

    /// Slot grid of the selected date from the latest snapshot. Empty until a
    /// week covering that date has been loaded.
    pub fn slots(&self) -> Vec<SlotView> {
        let state = self.state();
        let Some(date) = state.selection.date else {
            return Vec::new();
        };
        match state.snapshot_for(date) {
            Some((professional, appointments)) => slots_for_date(
                date,
                &professional.working_hours,
                appointments,
                self.clock.now(),
                Perspective::Client,
            ),
            None => Vec::new(),
        }
    }

    pub fn day_available(&self) -> bool {
        let state = self.state();
        let Some(date) = state.selection.date else {
            return false;
        };
        match state.snapshot_for(date) {
            Some((professional, appointments)) => is_day_available(
                date,
                &professional.working_hours,
                appointments,
                self.clock.today(),
            ),
            None => false,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.is_active(&self.professional_id)
    }

    /// Validates against the latest snapshot and submits once.
    ///
    /// A second call while one is running fails with `SubmissionInProgress`.
    /// When the server refuses the booking the occupancy is refetched, the hour
    /// is cleared and the server's reason is returned; nothing is retried. A
    /// selection outside the loaded week is refused without a request.
    pub async fn submit(&self) -> Result<BookingConfirmation, AppointmentError> {
        let _permit = self
            .submitting
            .try_acquire(self.professional_id)
            .ok_or(AppointmentError::SubmissionInProgress)?;

        let now = self.clock.now();
        let (selection, professional, snapshot) = {
            let state = self.state();
            let snapshot = state
                .selection
                .date
                .and_then(|date| state.snapshot_for(date))
                .map(|(_, appointments)| appointments.to_vec());
            (state.selection.clone(), state.professional.clone(), snapshot)
        };

        let service_id = selection.service_id.ok_or(AppointmentError::ServiceNotSelected)?;
        let professional = professional.ok_or(AppointmentError::ServiceNotFound(service_id))?;

        // An incomplete form is refused before any request goes out.
        let (_, date, hour) = validate_selection(&selection, &professional)?;

        // The held week belongs to another date; the selection was never checked against it.
        let appointments = snapshot.ok_or(match hour {
            Some(hour) => AppointmentError::SlotNotAvailable {
                hour,
                status: SlotStatus::Empty,
            },
            None => AppointmentError::DayNotAvailable(date),
        })?;

        let token = self
            .session
            .valid_token(now)
            .ok_or(AppointmentError::LoginRequired)?;
        let client = self.booking.current_user(&self.session, &token).await?;

        let ctx = BookingContext {
            professional: &professional,
            client: Some(&client),
            appointments: &appointments,
            now,
        };
        let booking = validate_booking(&selection, &ctx).inspect_err(|e| {
            warn!("Booking blocked before submission: {}", e);
        })?;

        match self.booking.submit(&self.session, &token, &booking).await {
            Ok(confirmation) => {
                info!("Booking confirmed: appointment {}", confirmation.appointment.id);
                self.settle(booking.date).await;
                Ok(confirmation)
            }
            Err(AppointmentError::Api(err)) if !err.is_unauthorized() && !err.is_transient() => {
                warn!("Booking rejected by server: {}", err);
                self.settle(booking.date).await;
                Err(AppointmentError::Api(err))
            }
            Err(err) => Err(err),
        }
    }

    /// Clears the hour and refetches, unless the user already moved to
    /// another date while the submission was running; their own load wins.
    async fn settle(&self, submitted: NaiveDate) {
        {
            let mut state = self.state();
            if state.selection.date != Some(submitted) {
                debug!("Selection moved away from {}; skipping refetch", submitted);
                return;
            }
            state.selection.hour = None;
        }

        if let Err(e) = self.load(submitted).await {
            warn!("Refetching occupancy for {} failed: {}", submitted, e);
        }
    }

    /// Detaches the flow: in-flight loads become no-ops when they return.
    pub fn close(&self) {
        self.fetches.close();
    }

    pub fn is_closed(&self) -> bool {
        self.fetches.is_closed()
    }
}
