use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit recorded for items created without one.
pub const DEFAULT_UNIT: &str = "unit";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit: String,
    pub min_threshold: i32,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(name: impl Into<String>, quantity: i32, unit: impl Into<String>, min_threshold: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            quantity,
            unit: unit.into(),
            min_threshold,
            updated_at: Utc::now(),
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_threshold
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

/// A billable procedure. `cost` is the live price; invoices copy it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub cost: f64,
    pub duration_minutes: Option<u32>,
    pub updated_at: DateTime<Utc>,
}

impl Treatment {
    pub fn new(name: impl Into<String>, cost: f64, duration_minutes: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            cost,
            duration_minutes,
            updated_at: Utc::now(),
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(name.trim())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TreatmentRecipe {
    pub treatment_id: Uuid,
    pub item_id: Uuid,
    pub qty_required: i32,
}

/// One line of a stock deduction, already aggregated per item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockDeduction {
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
}

/// A parsed import row. Optional fields are left untouched on update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportRow {
    pub name: String,
    pub quantity: i32,
    pub unit: Option<String>,
    pub min_threshold: Option<i32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImportOutcome {
    Created,
    Updated,
    Unchanged,
}
