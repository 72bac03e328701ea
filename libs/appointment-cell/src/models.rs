use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::billing::Invoice;
use shared_models::inventory::StockDeduction;
use shared_models::time::SlotTime;

// ==============================================================================
// BOOKING
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    /// Defaults to the caller when omitted.
    pub patient_id: Option<Uuid>,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub treatment: String,
}

/// Booking input once the patient has been resolved.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    pub date: NaiveDate,
    pub time: SlotTime,
    pub treatment: String,
}

#[derive(Debug, Deserialize)]
pub struct DoctorDayQuery {
    pub date: NaiveDate,
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllowedTransitions {
    pub status: AppointmentStatus,
    pub allowed: Vec<AppointmentStatus>,
}

/// Result of `complete`. A retry after success reports the original
/// invoice with `already_completed` set and nothing deducted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionOutcome {
    pub appointment: Appointment,
    pub invoice: Invoice,
    pub deducted: Vec<StockDeduction>,
    pub already_completed: bool,
}
