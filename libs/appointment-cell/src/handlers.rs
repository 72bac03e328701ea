use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::appointment::Appointment;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{BookAppointmentRequest, DoctorDayQuery, NewBooking};
use crate::services::{AppointmentBookingService, AppointmentCompletionService};

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id).map_err(|_| AppError::Auth("Token subject is not a valid user id".to_string()))
}

fn is_front_desk(user: &User) -> bool {
    matches!(user.role(), Role::Admin | Role::Staff)
}

fn require_party(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if is_front_desk(user) || user.is(appointment.patient_id) || user.is(appointment.doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to access this appointment".to_string()))
    }
}

/// Only the treating doctor (or an admin) moves an appointment forward.
fn require_treating_doctor(user: &User, appointment: &Appointment) -> Result<(), AppError> {
    if user.can_manage_doctor(appointment.doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the treating doctor or an admin can do this".to_string(),
        ))
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = match request.patient_id {
        Some(id) => id,
        None => caller_id(&user)?,
    };

    let allowed = match user.role() {
        Role::Admin | Role::Doctor => true,
        _ => user.is(patient_id),
    };
    if !allowed {
        return Err(AppError::Forbidden(
            "Patients can only book appointments for themselves".to_string(),
        ));
    }

    let appointment = AppointmentBookingService::new(&state)
        .book(NewBooking {
            doctor_id: request.doctor_id,
            patient_id,
            date: request.date,
            time: request.time,
            treatment: request.treatment,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment booked successfully"
    })))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state).get(appointment_id).await?;
    require_party(&user, &appointment)?;
    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn get_allowed_transitions(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get(appointment_id).await?;
    require_party(&user, &appointment)?;
    Ok(Json(json!(service.allowed_transitions(appointment.status))))
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get(appointment_id).await?;

    let allowed = user.is_admin() || user.is(appointment.patient_id) || user.is(appointment.doctor_id);
    if !allowed {
        return Err(AppError::Forbidden(
            "Only the patient, the doctor or an admin can cancel".to_string(),
        ));
    }

    let cancelled = service.cancel(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": cancelled,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn start_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentBookingService::new(&state);
    let appointment = service.get(appointment_id).await?;
    require_treating_doctor(&user, &appointment)?;

    let started = service.start(appointment_id).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": started
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentBookingService::new(&state).get(appointment_id).await?;
    require_treating_doctor(&user, &appointment)?;

    let outcome = AppointmentCompletionService::new(&state)
        .complete(appointment_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": outcome.appointment,
        "invoice": outcome.invoice,
        "deducted": outcome.deducted,
        "already_completed": outcome.already_completed
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DoctorDayQuery>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !(user.can_manage_doctor(doctor_id) || is_front_desk(&user)) {
        return Err(AppError::Forbidden(
            "Not authorized to view this doctor's calendar".to_string(),
        ));
    }

    let appointments = AppointmentBookingService::new(&state)
        .list_doctor_day(doctor_id, query.date)
        .await?;
    debug!("Doctor {} has {} appointment(s) on {}", doctor_id, appointments.len(), query.date);

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}

#[axum::debug_handler]
pub async fn list_patient_appointments(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !(user.is(patient_id) || is_front_desk(&user)) {
        return Err(AppError::Forbidden(
            "Not authorized to view these appointments".to_string(),
        ));
    }

    let appointments = AppointmentBookingService::new(&state)
        .list_patient(patient_id)
        .await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len()
    })))
}
