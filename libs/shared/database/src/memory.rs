use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::billing::{Invoice, InvoiceStatus};
use shared_models::inventory::{
    ImportOutcome, ImportRow, InventoryItem, StockDeduction, Treatment, TreatmentRecipe, DEFAULT_UNIT,
};
use shared_models::schedule::{BlockedInterval, ScheduleConfig};

use crate::store::{ClinicStore, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    schedules: HashMap<Uuid, ScheduleConfig>,
    appointments: HashMap<Uuid, Appointment>,
    blocks: HashMap<Uuid, BlockedInterval>,
    treatments: HashMap<Uuid, Treatment>,
    recipes: HashMap<(Uuid, Uuid), TreatmentRecipe>,
    items: HashMap<Uuid, InventoryItem>,
    invoices: HashMap<Uuid, Invoice>,
}

impl Tables {
    fn find_item_by_name(&self, name: &str) -> Option<&InventoryItem> {
        self.items.values().find(|item| item.matches_name(name))
    }

    /// Verifies every line can be satisfied. Lines naming the same item are
    /// summed first so a split recipe cannot sneak past the check.
    fn check_deductions(&self, deductions: &[StockDeduction]) -> StoreResult<Vec<(Uuid, i32)>> {
        let mut totals: Vec<(Uuid, i32)> = Vec::new();
        for line in deductions {
            match totals.iter_mut().find(|(id, _)| *id == line.item_id) {
                Some((_, total)) => {
                    *total = total
                        .checked_add(line.quantity)
                        .ok_or_else(|| StoreError::Backend(format!("deduction total overflows for {}", line.item_name)))?;
                }
                None => totals.push((line.item_id, line.quantity)),
            }
        }

        for (item_id, required) in &totals {
            let item = self
                .items
                .get(item_id)
                .ok_or_else(|| StoreError::NotFound(format!("inventory item {} not found", item_id)))?;
            if item.quantity < *required {
                return Err(StoreError::InsufficientStock {
                    item: item.name.clone(),
                    required: *required,
                    available: item.quantity,
                });
            }
        }

        Ok(totals)
    }

    fn apply_deductions(&mut self, totals: &[(Uuid, i32)]) -> Vec<InventoryItem> {
        let now = Utc::now();
        totals
            .iter()
            .filter_map(|(item_id, quantity)| {
                let item = self.items.get_mut(item_id)?;
                item.quantity -= quantity;
                item.updated_at = now;
                Some(item.clone())
            })
            .collect()
    }

    fn appointments_for(&self, doctor_id: Uuid, date: NaiveDate) -> impl Iterator<Item = &Appointment> {
        self.appointments
            .values()
            .filter(move |apt| apt.doctor_id == doctor_id && apt.date == date)
    }

    fn blocks_for(&self, doctor_id: Uuid, date: NaiveDate) -> impl Iterator<Item = &BlockedInterval> {
        self.blocks
            .values()
            .filter(move |block| block.doctor_id == doctor_id && block.date == date)
    }
}

/// Process-local store. One `RwLock` guards every table, and each atomic
/// primitive holds the write guard across its check and its write.
#[derive(Default)]
pub struct InMemoryClinicStore {
    tables: RwLock<Tables>,
}

impl InMemoryClinicStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClinicStore for InMemoryClinicStore {
    async fn get_schedule_config(&self, doctor_id: Uuid) -> StoreResult<Option<ScheduleConfig>> {
        Ok(self.tables.read().await.schedules.get(&doctor_id).cloned())
    }

    async fn upsert_schedule_config(&self, config: ScheduleConfig) -> StoreResult<ScheduleConfig> {
        let mut tables = self.tables.write().await;
        tables.schedules.insert(config.doctor_id, config.clone());
        Ok(config)
    }

    async fn insert_appointment_if_free(&self, appointment: Appointment) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        let range = appointment.time_range();

        if let Some(existing) = tables
            .appointments_for(appointment.doctor_id, appointment.date)
            .find(|apt| apt.occupies_slot() && apt.time_range().overlaps(&range))
        {
            debug!("Slot {} on {} already held by appointment {}", range.start, appointment.date, existing.id);
            return Err(StoreError::Conflict(format!(
                "{}-{} overlaps appointment {}",
                range.start, range.end, existing.id
            )));
        }

        if let Some(block) = tables
            .blocks_for(appointment.doctor_id, appointment.date)
            .find(|block| block.covers(&range))
        {
            return Err(StoreError::Conflict(format!(
                "{}-{} is blocked ({})",
                range.start, range.end, block.reason
            )));
        }

        tables.appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.tables.read().await.appointments.get(&id).cloned())
    }

    async fn list_doctor_appointments(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables.appointments_for(doctor_id, date).cloned().collect();
        appointments.sort_by_key(|apt| (apt.start_time, apt.created_at));
        Ok(appointments)
    }

    async fn list_patient_appointments(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let tables = self.tables.read().await;
        let mut appointments: Vec<Appointment> = tables
            .appointments
            .values()
            .filter(|apt| apt.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|apt| (apt.date, apt.start_time));
        Ok(appointments)
    }

    async fn transition_appointment(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let mut tables = self.tables.write().await;
        let appointment = tables
            .appointments
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {} not found", id)))?;

        if appointment.status != expected {
            return Err(StoreError::StatusMismatch {
                expected,
                actual: appointment.status,
                next,
            });
        }

        appointment.status = next;
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn complete_appointment(
        &self,
        id: Uuid,
        deductions: Vec<StockDeduction>,
        invoice: Invoice,
    ) -> StoreResult<Invoice> {
        let mut tables = self.tables.write().await;

        let status = tables
            .appointments
            .get(&id)
            .map(|apt| apt.status)
            .ok_or_else(|| StoreError::NotFound(format!("appointment {} not found", id)))?;
        if status != AppointmentStatus::InProgress {
            return Err(StoreError::StatusMismatch {
                expected: AppointmentStatus::InProgress,
                actual: status,
                next: AppointmentStatus::Completed,
            });
        }
        if tables.invoices.values().any(|inv| inv.appointment_id == id) {
            return Err(StoreError::Conflict(format!("appointment {} already invoiced", id)));
        }

        let totals = tables.check_deductions(&deductions)?;

        // Nothing below can fail.
        tables.apply_deductions(&totals);
        if let Some(appointment) = tables.appointments.get_mut(&id) {
            appointment.status = AppointmentStatus::Completed;
            appointment.updated_at = Utc::now();
        }
        tables.invoices.insert(invoice.id, invoice.clone());

        Ok(invoice)
    }

    async fn insert_block_if_free(&self, block: BlockedInterval) -> StoreResult<BlockedInterval> {
        let mut tables = self.tables.write().await;

        if let Some(existing) = tables
            .appointments_for(block.doctor_id, block.date)
            .find(|apt| apt.is_live() && block.covers(&apt.time_range()))
        {
            return Err(StoreError::Conflict(format!(
                "block overlaps {} appointment {} at {}",
                existing.status, existing.id, existing.start_time
            )));
        }

        tables.blocks.insert(block.id, block.clone());
        Ok(block)
    }

    async fn get_block(&self, id: Uuid) -> StoreResult<Option<BlockedInterval>> {
        Ok(self.tables.read().await.blocks.get(&id).cloned())
    }

    async fn delete_block(&self, id: Uuid) -> StoreResult<BlockedInterval> {
        self.tables
            .write()
            .await
            .blocks
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("block {} not found", id)))
    }

    async fn list_blocks(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<BlockedInterval>> {
        let tables = self.tables.read().await;
        let mut blocks: Vec<BlockedInterval> = tables.blocks_for(doctor_id, date).cloned().collect();
        blocks.sort_by_key(|block| block.created_at);
        Ok(blocks)
    }

    async fn upsert_treatment(&self, treatment: Treatment) -> StoreResult<Treatment> {
        let mut tables = self.tables.write().await;
        let existing_id = tables
            .treatments
            .values()
            .find(|t| t.matches_name(&treatment.name))
            .map(|t| t.id);

        let stored = Treatment {
            id: existing_id.unwrap_or(treatment.id),
            updated_at: Utc::now(),
            ..treatment
        };
        tables.treatments.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>> {
        Ok(self.tables.read().await.treatments.get(&id).cloned())
    }

    async fn find_treatment_by_name(&self, name: &str) -> StoreResult<Option<Treatment>> {
        let tables = self.tables.read().await;
        Ok(tables.treatments.values().find(|t| t.matches_name(name)).cloned())
    }

    async fn list_treatments(&self) -> StoreResult<Vec<Treatment>> {
        let tables = self.tables.read().await;
        let mut treatments: Vec<Treatment> = tables.treatments.values().cloned().collect();
        treatments.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(treatments)
    }

    async fn upsert_recipe_line(&self, line: TreatmentRecipe) -> StoreResult<TreatmentRecipe> {
        let mut tables = self.tables.write().await;
        if !tables.treatments.contains_key(&line.treatment_id) {
            return Err(StoreError::NotFound(format!("treatment {} not found", line.treatment_id)));
        }
        if !tables.items.contains_key(&line.item_id) {
            return Err(StoreError::NotFound(format!("inventory item {} not found", line.item_id)));
        }
        tables.recipes.insert((line.treatment_id, line.item_id), line);
        Ok(line)
    }

    async fn delete_recipe_line(&self, treatment_id: Uuid, item_id: Uuid) -> StoreResult<()> {
        self.tables
            .write()
            .await
            .recipes
            .remove(&(treatment_id, item_id))
            .map(|_| ())
            .ok_or_else(|| {
                StoreError::NotFound(format!("treatment {} has no recipe line for item {}", treatment_id, item_id))
            })
    }

    async fn get_recipe(&self, treatment_id: Uuid) -> StoreResult<Vec<TreatmentRecipe>> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .filter(|line| line.treatment_id == treatment_id)
            .copied()
            .collect())
    }

    async fn insert_item(&self, item: InventoryItem) -> StoreResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        if tables.find_item_by_name(&item.name).is_some() {
            return Err(StoreError::Conflict(format!("inventory item '{}' already exists", item.name)));
        }
        tables.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<InventoryItem>> {
        Ok(self.tables.read().await.items.get(&id).cloned())
    }

    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        let tables = self.tables.read().await;
        let mut items: Vec<InventoryItem> = tables.items.values().cloned().collect();
        items.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(items)
    }

    async fn adjust_item_quantity(&self, id: Uuid, delta: i32) -> StoreResult<InventoryItem> {
        let mut tables = self.tables.write().await;
        let item = tables
            .items
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {} not found", id)))?;

        let next = item
            .quantity
            .checked_add(delta)
            .ok_or_else(|| StoreError::Backend("quantity overflow".to_string()))?;
        if next < 0 {
            return Err(StoreError::InsufficientStock {
                item: item.name.clone(),
                required: delta.saturating_neg(),
                available: item.quantity,
            });
        }

        item.quantity = next;
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn deduct_stock(&self, deductions: Vec<StockDeduction>) -> StoreResult<Vec<InventoryItem>> {
        let mut tables = self.tables.write().await;
        let totals = tables.check_deductions(&deductions)?;
        Ok(tables.apply_deductions(&totals))
    }

    async fn import_item(&self, row: ImportRow) -> StoreResult<(InventoryItem, ImportOutcome)> {
        let mut tables = self.tables.write().await;

        let Some(existing_id) = tables.find_item_by_name(&row.name).map(|item| item.id) else {
            let item = InventoryItem::new(
                row.name.trim(),
                row.quantity,
                row.unit.unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                row.min_threshold.unwrap_or(0),
            );
            tables.items.insert(item.id, item.clone());
            return Ok((item, ImportOutcome::Created));
        };
        let item = tables
            .items
            .get_mut(&existing_id)
            .ok_or_else(|| StoreError::NotFound(format!("inventory item {} not found", existing_id)))?;

        let unit = row.unit.unwrap_or_else(|| item.unit.clone());
        let min_threshold = row.min_threshold.unwrap_or(item.min_threshold);
        if item.quantity == row.quantity && item.unit == unit && item.min_threshold == min_threshold {
            return Ok((item.clone(), ImportOutcome::Unchanged));
        }

        item.quantity = row.quantity;
        item.unit = unit;
        item.min_threshold = min_threshold;
        item.updated_at = Utc::now();
        Ok((item.clone(), ImportOutcome::Updated))
    }

    async fn get_invoice(&self, id: Uuid) -> StoreResult<Option<Invoice>> {
        Ok(self.tables.read().await.invoices.get(&id).cloned())
    }

    async fn find_invoice_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Invoice>> {
        let tables = self.tables.read().await;
        Ok(tables
            .invoices
            .values()
            .find(|inv| inv.appointment_id == appointment_id)
            .cloned())
    }

    async fn update_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
    ) -> StoreResult<Invoice> {
        let mut tables = self.tables.write().await;
        let invoice = tables
            .invoices
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("invoice {} not found", id)))?;

        if invoice.status != expected {
            return Err(StoreError::Conflict(format!(
                "invoice {} is {}, expected {}",
                id, invoice.status, expected
            )));
        }

        invoice.status = next;
        Ok(invoice.clone())
    }
}
