use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::AppointmentStatus;
use shared_models::billing::InvoiceStatus;
use shared_models::time::SlotTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HospitalInfo {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl From<&AppConfig> for HospitalInfo {
    fn from(config: &AppConfig) -> Self {
        Self {
            name: config.clinic_name.clone(),
            address: config.clinic_address.clone(),
            phone: config.clinic_phone.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceAppointment {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceTreatment {
    pub name: String,
    /// Amount charged, frozen when the invoice was issued.
    pub amount: f64,
}

/// Read-only view printed for the patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceDetail {
    pub invoice_id: Uuid,
    pub status: InvoiceStatus,
    pub issued_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub hospital: HospitalInfo,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub appointment: InvoiceAppointment,
    pub treatment: InvoiceTreatment,
}
