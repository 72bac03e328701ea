use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// STOCK
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub quantity: i32,
    pub unit: Option<String>,
    pub min_threshold: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: i32,
}

// ==============================================================================
// CATALOGUE AND RECIPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertTreatmentRequest {
    pub name: String,
    pub cost: f64,
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCostRequest {
    pub cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRecipeRequest {
    pub qty_required: i32,
}

/// A recipe line joined with the item it consumes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeLine {
    pub item_id: Uuid,
    pub item_name: String,
    pub unit: String,
    pub qty_required: i32,
}

// ==============================================================================
// CSV IMPORT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RejectedRow {
    /// 1-based line number in the uploaded file.
    pub row: u64,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub rejected: Vec<RejectedRow>,
}
