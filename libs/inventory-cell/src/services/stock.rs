use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_database::ClinicStore;
use shared_models::error::ClinicError;
use shared_models::inventory::{InventoryItem, StockDeduction, DEFAULT_UNIT};
use shared_utils::AppState;

use crate::models::{CreateItemRequest, RecipeLine};

/// Collapses recipe lines into one deduction per item.
pub fn aggregate_deductions(lines: &[RecipeLine]) -> Result<Vec<StockDeduction>, ClinicError> {
    let mut deductions: Vec<StockDeduction> = Vec::with_capacity(lines.len());
    for line in lines {
        match deductions.iter_mut().find(|d| d.item_id == line.item_id) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.qty_required)
                    .ok_or_else(|| {
                        ClinicError::Validation(format!("Total quantity of {} is out of range", line.item_name))
                    })?;
            }
            None => deductions.push(StockDeduction {
                item_id: line.item_id,
                item_name: line.item_name.clone(),
                quantity: line.qty_required,
            }),
        }
    }
    Ok(deductions)
}

pub struct InventoryStock {
    store: Arc<dyn ClinicStore>,
}

impl InventoryStock {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: state.store.clone(),
        }
    }

    pub async fn create_item(&self, request: CreateItemRequest) -> Result<InventoryItem, ClinicError> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("Item name is required".to_string()));
        }
        if request.quantity < 0 {
            return Err(ClinicError::Validation("Quantity cannot be negative".to_string()));
        }
        let min_threshold = request.min_threshold.unwrap_or(0);
        if min_threshold < 0 {
            return Err(ClinicError::Validation("Threshold cannot be negative".to_string()));
        }
        let unit = request
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_UNIT);

        let item = self
            .store
            .insert_item(InventoryItem::new(name, request.quantity, unit, min_threshold))
            .await?;
        info!("Created inventory item {} ({} {})", item.name, item.quantity, item.unit);
        Ok(item)
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<InventoryItem, ClinicError> {
        self.store
            .get_item(item_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Inventory item", item_id))
    }

    pub async fn list_items(&self) -> Result<Vec<InventoryItem>, ClinicError> {
        Ok(self.store.list_items().await?)
    }

    pub async fn low_stock_items(&self) -> Result<Vec<InventoryItem>, ClinicError> {
        let items = self.store.list_items().await?;
        Ok(items.into_iter().filter(InventoryItem::is_low_stock).collect())
    }

    /// Applies `delta` atomically and returns the item as stored afterwards.
    pub async fn adjust(&self, item_id: Uuid, delta: i32) -> Result<InventoryItem, ClinicError> {
        if delta == i32::MIN {
            return Err(ClinicError::Validation(format!("Adjustment {} is out of range", delta)));
        }

        match self.store.adjust_item_quantity(item_id, delta).await {
            Ok(item) => {
                info!("Adjusted {} by {} to {}", item.name, delta, item.quantity);
                if item.is_low_stock() {
                    warn!("{} is at or below its threshold ({} <= {})", item.name, item.quantity, item.min_threshold);
                }
                Ok(item)
            }
            Err(e) => {
                warn!("Adjustment of item {} by {} rejected: {}", item_id, delta, e);
                Err(e.into())
            }
        }
    }

    /// Deducts a whole recipe or nothing.
    pub async fn deduct(&self, lines: &[RecipeLine]) -> Result<Vec<InventoryItem>, ClinicError> {
        let deductions = aggregate_deductions(lines)?;
        debug!("Deducting {} item(s)", deductions.len());
        Ok(self.store.deduct_stock(deductions).await?)
    }
}
