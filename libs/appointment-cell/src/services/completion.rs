use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use billing_cell::services::InvoiceGenerator;
use inventory_cell::services::stock::aggregate_deductions;
use inventory_cell::services::TreatmentRecipeStore;
use shared_database::{ClinicStore, StoreError};
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::error::ClinicError;
use shared_utils::AppState;

use crate::models::CompletionOutcome;
use crate::services::lifecycle::AppointmentLifecycleService;

/// Finishes an appointment: recipe deduction, status flip and invoice in
/// one store transaction.
pub struct AppointmentCompletionService {
    store: Arc<dyn ClinicStore>,
    recipes: TreatmentRecipeStore,
    lifecycle: AppointmentLifecycleService,
}

impl AppointmentCompletionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
            recipes: TreatmentRecipeStore::new(state),
            lifecycle: AppointmentLifecycleService::new(),
        }
    }

    pub async fn complete(&self, appointment_id: Uuid) -> Result<CompletionOutcome, ClinicError> {
        self.complete_on(appointment_id, Utc::now().date_naive()).await
    }

    /// Complete with an explicit issue date for the invoice.
    pub async fn complete_on(
        &self,
        appointment_id: Uuid,
        issued_on: NaiveDate,
    ) -> Result<CompletionOutcome, ClinicError> {
        info!("Completing appointment {}", appointment_id);

        let appointment = self.load(appointment_id).await?;
        if appointment.status == AppointmentStatus::Completed {
            return self.already_completed(appointment).await;
        }
        self.lifecycle
            .validate_status_transition(appointment.status, AppointmentStatus::Completed)?;

        let treatment = self.recipes.find_treatment(&appointment.treatment_name).await?;
        let lines = self.recipes.resolve(treatment.id).await?;
        let deductions = aggregate_deductions(&lines)?;
        debug!(
            "Appointment {} consumes {} item(s) for {}",
            appointment_id,
            deductions.len(),
            treatment.name
        );

        let draft = InvoiceGenerator::draft(&appointment, &treatment, issued_on);
        match self
            .store
            .complete_appointment(appointment_id, deductions.clone(), draft)
            .await
        {
            Ok(invoice) => {
                info!(
                    "Appointment {} completed, invoice {} issued for {:.2}",
                    appointment_id, invoice.id, invoice.amount
                );
                Ok(CompletionOutcome {
                    appointment: self.load(appointment_id).await?,
                    invoice,
                    deducted: deductions,
                    already_completed: false,
                })
            }
            // A concurrent completion won; report its invoice.
            Err(StoreError::StatusMismatch {
                actual: AppointmentStatus::Completed,
                ..
            }) => {
                let appointment = self.load(appointment_id).await?;
                self.already_completed(appointment).await
            }
            Err(StoreError::InsufficientStock {
                item,
                required,
                available,
            }) => {
                warn!(
                    "Appointment {} stays in progress: {} short ({} of {})",
                    appointment_id, item, available, required
                );
                Err(ClinicError::InsufficientStock {
                    item,
                    required,
                    available,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn load(&self, appointment_id: Uuid) -> Result<Appointment, ClinicError> {
        self.store
            .get_appointment(appointment_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", appointment_id))
    }

    async fn already_completed(&self, appointment: Appointment) -> Result<CompletionOutcome, ClinicError> {
        debug!("Appointment {} already completed", appointment.id);
        let invoice = self
            .store
            .find_invoice_for_appointment(appointment.id)
            .await?
            .ok_or_else(|| {
                error!("Completed appointment {} has no invoice", appointment.id);
                ClinicError::Storage(format!("Completed appointment {} has no invoice", appointment.id))
            })?;

        Ok(CompletionOutcome {
            appointment,
            invoice,
            deducted: Vec::new(),
            already_completed: true,
        })
    }
}
