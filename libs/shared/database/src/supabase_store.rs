use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::appointment::{Appointment, AppointmentStatus};
use shared_models::billing::{Invoice, InvoiceStatus};
use shared_models::inventory::{
    ImportOutcome, ImportRow, InventoryItem, StockDeduction, Treatment, TreatmentRecipe,
};
use shared_models::schedule::{BlockSpan, BlockedInterval, ScheduleConfig};
use shared_models::time::SlotTime;

use crate::store::{ClinicStore, StoreError, StoreResult};
use crate::supabase::{SupabaseApiError, SupabaseClient};

/// `ClinicStore` backed by Supabase/PostgREST.
///
/// Plain reads and writes go through the REST tables. Every atomic
/// primitive is a Postgres function (see `sql/clinic_engine.sql`) called
/// over `/rest/v1/rpc`, so the check and the write share one transaction.
/// The functions raise `PTxxx` SQLSTATEs, which PostgREST turns into the
/// matching HTTP status:
///
/// * 404: unknown row
/// * 409: overlap or uniqueness violation
/// * 412: status compare-and-set failed, `details` = `{expected, actual, next}`
/// * 422: stock shortfall, `details` = `{item, required, available}`
pub struct SupabaseClinicStore {
    supabase: SupabaseClient,
}

#[derive(Deserialize)]
struct StatusMismatchDetail {
    expected: AppointmentStatus,
    actual: AppointmentStatus,
    next: AppointmentStatus,
}

#[derive(Deserialize)]
struct StockShortfallDetail {
    item: String,
    required: i32,
    available: i32,
}

/// Flat row shape of `blocked_intervals`.
#[derive(Debug, Serialize, Deserialize)]
struct BlockRow {
    id: Uuid,
    doctor_id: Uuid,
    date: NaiveDate,
    whole_day: bool,
    start_time: Option<SlotTime>,
    end_time: Option<SlotTime>,
    reason: String,
    created_at: DateTime<Utc>,
}

impl From<&BlockedInterval> for BlockRow {
    fn from(block: &BlockedInterval) -> Self {
        let (whole_day, start_time, end_time) = match block.span {
            BlockSpan::WholeDay => (true, None, None),
            BlockSpan::Range { start, end } => (false, Some(start), Some(end)),
        };
        Self {
            id: block.id,
            doctor_id: block.doctor_id,
            date: block.date,
            whole_day,
            start_time,
            end_time,
            reason: block.reason.clone(),
            created_at: block.created_at,
        }
    }
}

impl TryFrom<BlockRow> for BlockedInterval {
    type Error = StoreError;

    fn try_from(row: BlockRow) -> Result<Self, Self::Error> {
        let span = match (row.whole_day, row.start_time, row.end_time) {
            (true, _, _) => BlockSpan::WholeDay,
            (false, Some(start), Some(end)) => BlockSpan::Range { start, end },
            _ => {
                return Err(StoreError::Backend(format!(
                    "block {} has neither whole_day nor a time range",
                    row.id
                )))
            }
        };
        Ok(BlockedInterval {
            id: row.id,
            doctor_id: row.doctor_id,
            date: row.date,
            span,
            reason: row.reason,
            created_at: row.created_at,
        })
    }
}

#[derive(Deserialize)]
struct ImportRowResult {
    item: InventoryItem,
    outcome: ImportOutcome,
}

fn map_error(error: anyhow::Error) -> StoreError {
    let Some(api) = error.downcast_ref::<SupabaseApiError>() else {
        return StoreError::Backend(error.to_string());
    };

    let details = api.details.as_deref().unwrap_or_default();
    match api.status {
        404 => StoreError::NotFound(api.message.clone()),
        409 => StoreError::Conflict(api.message.clone()),
        412 => match serde_json::from_str::<StatusMismatchDetail>(details) {
            Ok(detail) => StoreError::StatusMismatch {
                expected: detail.expected,
                actual: detail.actual,
                next: detail.next,
            },
            Err(_) => StoreError::Backend(api.to_string()),
        },
        422 => match serde_json::from_str::<StockShortfallDetail>(details) {
            Ok(detail) => StoreError::InsufficientStock {
                item: detail.item,
                required: detail.required,
                available: detail.available,
            },
            Err(_) => StoreError::Backend(api.to_string()),
        },
        _ => StoreError::Backend(api.to_string()),
    }
}

fn first<T>(rows: Vec<T>) -> Option<T> {
    rows.into_iter().next()
}

impl SupabaseClinicStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub fn with_client(supabase: SupabaseClient) -> Self {
        Self { supabase }
    }

    async fn select<T: serde::de::DeserializeOwned>(&self, path: &str) -> StoreResult<Vec<T>> {
        self.supabase
            .request(Method::GET, path, None)
            .await
            .map_err(map_error)
    }

    async fn write<T: serde::de::DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: reqwest::header::HeaderMap,
    ) -> StoreResult<Vec<T>> {
        self.supabase
            .request_with_headers(method, path, body, Some(headers))
            .await
            .map_err(map_error)
    }

    async fn rpc<T: serde::de::DeserializeOwned>(&self, function: &str, args: Value) -> StoreResult<T> {
        debug!("Calling rpc {}", function);
        self.supabase.rpc(function, args).await.map_err(map_error)
    }
}

#[async_trait]
impl ClinicStore for SupabaseClinicStore {
    async fn get_schedule_config(&self, doctor_id: Uuid) -> StoreResult<Option<ScheduleConfig>> {
        let path = format!("/rest/v1/schedule_configs?doctor_id=eq.{}", doctor_id);
        Ok(first(self.select(&path).await?))
    }

    async fn upsert_schedule_config(&self, config: ScheduleConfig) -> StoreResult<ScheduleConfig> {
        let rows: Vec<ScheduleConfig> = self
            .write(
                Method::POST,
                "/rest/v1/schedule_configs?on_conflict=doctor_id",
                Some(json!(config)),
                SupabaseClient::merge_duplicates(),
            )
            .await?;
        first(rows).ok_or_else(|| StoreError::Backend("schedule upsert returned no row".to_string()))
    }

    async fn insert_appointment_if_free(&self, appointment: Appointment) -> StoreResult<Appointment> {
        self.rpc("book_appointment_slot", json!({ "p_appointment": appointment }))
            .await
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        Ok(first(self.select(&path).await?))
    }

    async fn list_doctor_appointments(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&date=eq.{}&order=start_time.asc,created_at.asc",
            doctor_id, date
        );
        self.select(&path).await
    }

    async fn list_patient_appointments(&self, patient_id: Uuid) -> StoreResult<Vec<Appointment>> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=date.asc,start_time.asc",
            patient_id
        );
        self.select(&path).await
    }

    async fn transition_appointment(
        &self,
        id: Uuid,
        expected: AppointmentStatus,
        next: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        self.rpc(
            "transition_appointment",
            json!({
                "p_id": id,
                "p_expected": expected,
                "p_next": next,
            }),
        )
        .await
    }

    async fn complete_appointment(
        &self,
        id: Uuid,
        deductions: Vec<StockDeduction>,
        invoice: Invoice,
    ) -> StoreResult<Invoice> {
        self.rpc(
            "complete_appointment",
            json!({
                "p_id": id,
                "p_deductions": deductions,
                "p_invoice": invoice,
            }),
        )
        .await
    }

    async fn insert_block_if_free(&self, block: BlockedInterval) -> StoreResult<BlockedInterval> {
        let row: BlockRow = self
            .rpc("insert_block_if_free", json!({ "p_block": BlockRow::from(&block) }))
            .await?;
        row.try_into()
    }

    async fn get_block(&self, id: Uuid) -> StoreResult<Option<BlockedInterval>> {
        let path = format!("/rest/v1/blocked_intervals?id=eq.{}", id);
        let rows: Vec<BlockRow> = self.select(&path).await?;
        first(rows).map(BlockedInterval::try_from).transpose()
    }

    async fn delete_block(&self, id: Uuid) -> StoreResult<BlockedInterval> {
        let path = format!("/rest/v1/blocked_intervals?id=eq.{}", id);
        let rows: Vec<BlockRow> = self
            .write(Method::DELETE, &path, None, SupabaseClient::return_representation())
            .await?;
        first(rows)
            .ok_or_else(|| StoreError::NotFound(format!("block {} not found", id)))?
            .try_into()
    }

    async fn list_blocks(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<BlockedInterval>> {
        let path = format!(
            "/rest/v1/blocked_intervals?doctor_id=eq.{}&date=eq.{}&order=created_at.asc",
            doctor_id, date
        );
        let rows: Vec<BlockRow> = self.select(&path).await?;
        rows.into_iter().map(BlockedInterval::try_from).collect()
    }

    async fn upsert_treatment(&self, treatment: Treatment) -> StoreResult<Treatment> {
        self.rpc(
            "upsert_treatment",
            json!({
                "p_id": treatment.id,
                "p_name": treatment.name.trim(),
                "p_cost": treatment.cost,
                "p_duration_minutes": treatment.duration_minutes,
            }),
        )
        .await
    }

    async fn get_treatment(&self, id: Uuid) -> StoreResult<Option<Treatment>> {
        let path = format!("/rest/v1/treatments?id=eq.{}", id);
        Ok(first(self.select(&path).await?))
    }

    async fn find_treatment_by_name(&self, name: &str) -> StoreResult<Option<Treatment>> {
        // ilike without wildcards is a case-insensitive equality, but a name
        // containing `_` or `%` would widen it, so re-check exactly.
        let path = format!(
            "/rest/v1/treatments?name=ilike.{}",
            urlencoding::encode(name.trim())
        );
        let rows: Vec<Treatment> = self.select(&path).await?;
        Ok(rows.into_iter().find(|t| t.matches_name(name)))
    }

    async fn list_treatments(&self) -> StoreResult<Vec<Treatment>> {
        self.select("/rest/v1/treatments?order=name.asc").await
    }

    async fn upsert_recipe_line(&self, line: TreatmentRecipe) -> StoreResult<TreatmentRecipe> {
        self.rpc(
            "link_treatment_recipe",
            json!({
                "p_treatment_id": line.treatment_id,
                "p_item_id": line.item_id,
                "p_qty_required": line.qty_required,
            }),
        )
        .await
    }

    async fn delete_recipe_line(&self, treatment_id: Uuid, item_id: Uuid) -> StoreResult<()> {
        let path = format!(
            "/rest/v1/treatment_recipes?treatment_id=eq.{}&item_id=eq.{}",
            treatment_id, item_id
        );
        let rows: Vec<TreatmentRecipe> = self
            .write(Method::DELETE, &path, None, SupabaseClient::return_representation())
            .await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(format!(
                "treatment {} has no recipe line for item {}",
                treatment_id, item_id
            )));
        }
        Ok(())
    }

    async fn get_recipe(&self, treatment_id: Uuid) -> StoreResult<Vec<TreatmentRecipe>> {
        let path = format!("/rest/v1/treatment_recipes?treatment_id=eq.{}", treatment_id);
        self.select(&path).await
    }

    async fn insert_item(&self, item: InventoryItem) -> StoreResult<InventoryItem> {
        let rows: Vec<InventoryItem> = self
            .write(
                Method::POST,
                "/rest/v1/inventory_items",
                Some(json!(item)),
                SupabaseClient::return_representation(),
            )
            .await?;
        first(rows).ok_or_else(|| StoreError::Backend("item insert returned no row".to_string()))
    }

    async fn get_item(&self, id: Uuid) -> StoreResult<Option<InventoryItem>> {
        let path = format!("/rest/v1/inventory_items?id=eq.{}", id);
        Ok(first(self.select(&path).await?))
    }

    async fn list_items(&self) -> StoreResult<Vec<InventoryItem>> {
        self.select("/rest/v1/inventory_items?order=name.asc").await
    }

    async fn adjust_item_quantity(&self, id: Uuid, delta: i32) -> StoreResult<InventoryItem> {
        self.rpc("adjust_inventory", json!({ "p_item_id": id, "p_delta": delta }))
            .await
    }

    async fn deduct_stock(&self, deductions: Vec<StockDeduction>) -> StoreResult<Vec<InventoryItem>> {
        if deductions.is_empty() {
            return Ok(vec![]);
        }
        self.rpc("deduct_stock", json!({ "p_deductions": deductions }))
            .await
    }

    async fn import_item(&self, row: ImportRow) -> StoreResult<(InventoryItem, ImportOutcome)> {
        let result: ImportRowResult = self
            .rpc(
                "import_inventory_row",
                json!({
                    "p_name": row.name.trim(),
                    "p_quantity": row.quantity,
                    "p_unit": row.unit,
                    "p_min_threshold": row.min_threshold,
                }),
            )
            .await?;
        Ok((result.item, result.outcome))
    }

    async fn get_invoice(&self, id: Uuid) -> StoreResult<Option<Invoice>> {
        let path = format!("/rest/v1/invoices?id=eq.{}", id);
        Ok(first(self.select(&path).await?))
    }

    async fn find_invoice_for_appointment(&self, appointment_id: Uuid) -> StoreResult<Option<Invoice>> {
        let path = format!("/rest/v1/invoices?appointment_id=eq.{}", appointment_id);
        let mut rows: Vec<Invoice> = self.select(&path).await?;
        if rows.len() > 1 {
            warn!("Appointment {} has {} invoices; returning the first", appointment_id, rows.len());
        }
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn update_invoice_status(
        &self,
        id: Uuid,
        expected: InvoiceStatus,
        next: InvoiceStatus,
    ) -> StoreResult<Invoice> {
        self.rpc(
            "update_invoice_status",
            json!({
                "p_id": id,
                "p_expected": expected,
                "p_next": next,
            }),
        )
        .await
    }
}
