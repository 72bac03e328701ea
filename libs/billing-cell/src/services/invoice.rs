use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::ClinicStore;
use shared_models::appointment::Appointment;
use shared_models::billing::{Invoice, InvoiceStatus};
use shared_models::error::ClinicError;
use shared_models::inventory::Treatment;
use shared_utils::AppState;

use crate::models::{HospitalInfo, InvoiceAppointment, InvoiceDetail, InvoiceTreatment};

pub struct InvoiceGenerator {
    store: Arc<dyn ClinicStore>,
    config: Arc<AppConfig>,
}

impl InvoiceGenerator {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            config: state.config.clone(),
        }
    }

    /// Pending invoice for a completed appointment. The amount is the
    /// treatment's cost right now and never follows later price edits.
    pub fn draft(appointment: &Appointment, treatment: &Treatment, issued_on: NaiveDate) -> Invoice {
        Invoice {
            id: Uuid::new_v4(),
            appointment_id: appointment.id,
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            treatment_name: treatment.name.clone(),
            amount: treatment.cost,
            status: InvoiceStatus::Pending,
            date: issued_on,
            created_at: Utc::now(),
        }
    }

    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<Invoice, ClinicError> {
        debug!("Fetching invoice {}", invoice_id);
        self.store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Invoice", invoice_id))
    }

    pub async fn invoice_for_appointment(&self, appointment_id: Uuid) -> Result<Invoice, ClinicError> {
        self.store
            .find_invoice_for_appointment(appointment_id)
            .await?
            .ok_or_else(|| ClinicError::NotFound(format!("No invoice issued for appointment {}", appointment_id)))
    }

    pub async fn detail(&self, invoice_id: Uuid) -> Result<InvoiceDetail, ClinicError> {
        let invoice = self.get_invoice(invoice_id).await?;
        let appointment = self
            .store
            .get_appointment(invoice.appointment_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", invoice.appointment_id))?;

        Ok(InvoiceDetail {
            invoice_id: invoice.id,
            status: invoice.status,
            issued_on: invoice.date,
            created_at: invoice.created_at,
            hospital: HospitalInfo::from(self.config.as_ref()),
            patient_id: invoice.patient_id,
            doctor_id: invoice.doctor_id,
            appointment: InvoiceAppointment {
                id: appointment.id,
                date: appointment.date,
                start_time: appointment.start_time,
                end_time: appointment.end_time,
                status: appointment.status,
            },
            treatment: InvoiceTreatment {
                name: invoice.treatment_name,
                amount: invoice.amount,
            },
        })
    }

    pub async fn mark_paid(&self, invoice_id: Uuid) -> Result<Invoice, ClinicError> {
        match self
            .store
            .update_invoice_status(invoice_id, InvoiceStatus::Pending, InvoiceStatus::Paid)
            .await
        {
            Ok(invoice) => {
                info!("Invoice {} paid ({:.2})", invoice.id, invoice.amount);
                Ok(invoice)
            }
            Err(e) => {
                warn!("Could not mark invoice {} paid: {}", invoice_id, e);
                Err(e.into())
            }
        }
    }
}
