use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use scheduling_cell::services::availability::{candidate_slots, effective_duration};
use shared_database::{ClinicStore, StoreError};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::error::ClinicError;
use shared_models::time::TimeRange;
use shared_utils::AppState;

use crate::models::{AllowedTransitions, NewBooking};
use crate::services::lifecycle::AppointmentLifecycleService;

pub struct AppointmentBookingService {
    store: Arc<dyn ClinicStore>,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentBookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn book(&self, booking: NewBooking) -> Result<Appointment, ClinicError> {
        self.book_on(booking, Utc::now().date_naive()).await
    }

    /// Book with an explicit "today".
    pub async fn book_on(&self, booking: NewBooking, today: NaiveDate) -> Result<Appointment, ClinicError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            booking.patient_id, booking.doctor_id, booking.date, booking.time
        );

        // Step 1: Validate input
        let treatment_name = booking.treatment.trim();
        if treatment_name.is_empty() {
            return Err(ClinicError::Validation("Treatment is required".to_string()));
        }
        if booking.date < today {
            return Err(ClinicError::Validation(format!(
                "Cannot book on {}: the date has passed",
                booking.date
            )));
        }

        // Step 2: Resolve schedule and treatment
        let config = self
            .store
            .get_schedule_config(booking.doctor_id)
            .await?
            .ok_or_else(|| {
                ClinicError::Validation(format!("Doctor {} is not configured", booking.doctor_id))
            })?;
        let treatment = self
            .store
            .find_treatment_by_name(treatment_name)
            .await?
            .ok_or_else(|| ClinicError::not_found("Treatment", treatment_name))?;

        // Step 3: The requested time must be a generated slot start
        let duration = effective_duration(&config, Some(&treatment));
        let is_slot_start = candidate_slots(&config, duration)
            .iter()
            .any(|candidate| candidate.start == booking.time);
        if !is_slot_start {
            return Err(ClinicError::Validation(format!(
                "{} is not a bookable slot for {}",
                booking.time, treatment.name
            )));
        }
        let range = TimeRange::starting_at(booking.time, duration)?;

        // Step 4: Commit through the store's atomic check-and-insert
        let appointment = Appointment::new(
            booking.doctor_id,
            booking.patient_id,
            booking.date,
            range,
            treatment.name,
        );
        match self.store.insert_appointment_if_free(appointment).await {
            Ok(created) => {
                info!("Appointment {} booked", created.id);
                Ok(created)
            }
            Err(StoreError::Conflict(msg)) => {
                warn!(
                    "Slot {} on {} for doctor {} is no longer free: {}",
                    booking.time, booking.date, booking.doctor_id, msg
                );
                Err(ClinicError::Conflict(msg))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, ClinicError> {
        debug!("Fetching appointment {}", appointment_id);
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", appointment_id))
    }

    pub async fn list_doctor_day(&self, doctor_id: Uuid, date: NaiveDate) -> Result<Vec<Appointment>, ClinicError> {
        Ok(self.store.list_doctor_appointments(doctor_id, date).await?)
    }

    pub async fn list_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, ClinicError> {
        Ok(self.store.list_patient_appointments(patient_id).await?)
    }

    pub fn allowed_transitions(&self, status: AppointmentStatus) -> AllowedTransitions {
        AllowedTransitions {
            status,
            allowed: self.lifecycle.get_valid_transitions(status),
        }
    }

    /// Cancelling an already cancelled appointment succeeds without change.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<Appointment, ClinicError> {
        let appointment = self.get(appointment_id).await?;
        if appointment.status == AppointmentStatus::Cancelled {
            debug!("Appointment {} already cancelled", appointment_id);
            return Ok(appointment);
        }

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Cancelled)?;

        match self
            .store
            .transition_appointment(appointment_id, appointment.status, AppointmentStatus::Cancelled)
            .await
        {
            Ok(cancelled) => {
                info!("Appointment {} cancelled", appointment_id);
                Ok(cancelled)
            }
            // Lost a race against another cancel.
            Err(StoreError::StatusMismatch {
                actual: AppointmentStatus::Cancelled,
                ..
            }) => self.get(appointment_id).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Starting an appointment that is already in progress succeeds without change.
    pub async fn start(&self, appointment_id: Uuid) -> Result<Appointment, ClinicError> {
        let appointment = self.get(appointment_id).await?;
        if appointment.status == AppointmentStatus::InProgress {
            debug!("Appointment {} already in progress", appointment_id);
            return Ok(appointment);
        }

        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::InProgress)?;

        match self
            .store
            .transition_appointment(appointment_id, AppointmentStatus::Confirmed, AppointmentStatus::InProgress)
            .await
        {
            Ok(started) => {
                info!("Appointment {} started", appointment_id);
                Ok(started)
            }
            Err(StoreError::StatusMismatch {
                actual: AppointmentStatus::InProgress,
                ..
            }) => self.get(appointment_id).await,
            Err(e) => Err(e.into()),
        }
    }
}
