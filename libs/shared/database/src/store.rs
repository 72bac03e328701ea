use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::billing::{Invoice, InvoiceStatus};
use shared_models::error::ClinicError;
use shared_models::inventory::{
    ImportOutcome, ImportRow, InventoryItem, StockDeduction, Treatment, TreatmentRecipe,
};
use shared_models::schedule::{BlockedInterval, ScheduleConfig};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("insufficient stock for {item}: required {required}, available {available}")]
    InsufficientStock {
        item: String,
        required: i32,
        available: i32,
    },

    /// A compare-and-set on appointment status found a different status.
    /// `next` is the status the caller asked for.
    #[error("appointment status is {actual}, expected {expected} to move to {next}")]
    StatusMismatch {
        expected: AppointmentStatus,
        actual: AppointmentStatus,
        next: AppointmentStatus,
    },

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for ClinicError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Conflict(msg) => ClinicError::Conflict(msg),
            StoreError::NotFound(msg) => ClinicError::NotFound(msg),
            StoreError::InsufficientStock {
                item,
                required,
                available,
            } => ClinicError::InsufficientStock {
                item,
                required,
                available,
            },
            StoreError::StatusMismatch { actual, next, .. } => ClinicError::StateTransition {
                from: actual,
                to: next,
            },
            StoreError::Backend(msg) => ClinicError::Storage(msg),
        }
    }
}

/// Persistence port of the engine.
///
/// Plain reads and writes are self-explanatory. The methods documented as
/// atomic are the engine's commit points: an adapter must perform the
/// check and the write as one indivisible step, so that a caller that lost
/// a race observes `Conflict` (or `StatusMismatch`) instead of a corrupted
/// calendar or a partially deducted recipe.
#[async_trait]
pub trait ClinicStore: Send + Sync {
    // Schedule configuration

    async fn get_schedule_config(&self, doctor_id: Uuid) -> StoreResult<Option<ScheduleConfig>>;

    async fn upsert_schedule_config(&self, config: ScheduleConfig) -> StoreResult<ScheduleConfig>;

    // Appointments

    /// Atomic. Inserts unless the interval overlaps a non-cancelled
    /// appointment or any block of the same doctor and date.
    async fn insert_appointment_if_free(&self, appointment: Appointment) -> StoreResult<Appointment>;

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>>;

    /// All appointments of the doctor on the date, any status, ordered by start.
    async fn list_doctor_appointments(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Appointment>>;

    async fn list_patient_appointments(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>>;

    /// Atomic compare-and-set of the status.
    async fn transition_appointment(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Appointment>;

    /// Atomic. Requires the appointment to be `in_progress`; deducts every
    /// line, flips the status to `completed` and inserts the invoice, or
    /// changes nothing at all.
    async fn complete_appointment(
        &self,
        id: Uuid,
        deductions: Vec<StockDeduction>,
        invoice: Invoice,
    ) -> StoreResult<Invoice>;

    // Blocks

    /// Atomic. Inserts unless the block overlaps a confirmed or in-progress
    /// appointment of the same doctor and date.
    async fn insert_block_if_free(&self, block: BlockedInterval) -> StoreResult<BlockedInterval>;

    async fn get_block(&self, id: Uuid) -> StoreResult<Option<BlockedInterval>>;

    async fn delete_block(&self, id: Uuid) -> StoreResult<BlockedInterval>;

    async fn list_blocks(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<BlockedInterval>>;

    // Treatment catalogue and recipes

    /// Create-or-update by case-insensitive name; an existing id is kept.
    async fn upsert_treatment(&self, treatment: Treatment) -> StoreResult<Treatment>;

    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>>;

    async fn find_treatment_by_name(&self, name: &str) -> StoreResult<Option<Treatment>>;

    async fn list_treatments(&self) -> StoreResult<Vec<Treatment>>;

    async fn upsert_recipe_line(&self, line: TreatmentRecipe) -> StoreResult<TreatmentRecipe>;

    async fn delete_recipe_line(&self, treatment_id: Uuid, item_id: Uuid) -> StoreResult<()>;

    async fn get_recipe(&self, treatment_id: Uuid) -> StoreResult<Vec<TreatmentRecipe>>;

    // Inventory

    async fn insert_item(&self, item: InventoryItem) -> StoreResult<InventoryItem>;

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<InventoryItem>>;

    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>>;

    /// Atomic increment/decrement returning the post-state.
    async fn adjust_item_quantity(&self, id: Uuid, delta: i32) -> StoreResult<InventoryItem>;

    /// Atomic across all lines: either every item is decremented or none.
    async fn deduct_stock(&self, deductions: Vec<StockDeduction>) -> StoreResult<Vec<InventoryItem>>;

    /// Create-or-update by case-insensitive name with "set" semantics.
    async fn import_item(&self, row: ImportRow) -> StoreResult<(InventoryItem, ImportOutcome)>;

    // Invoices

    async fn get_invoice(&self, id: Uuid) -> StoreResult<Option<Invoice>>;

    async fn find_invoice_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Invoice>>;

    async fn update_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
    ) -> StoreResult<Invoice>;
}
