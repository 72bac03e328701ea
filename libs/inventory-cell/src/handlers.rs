use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{
    AdjustStockRequest, CreateItemRequest, LinkRecipeRequest, UpdateCostRequest, UpsertTreatmentRequest,
};
use crate::services::{InventoryImporter, InventoryStock, TreatmentRecipeStore};

fn require_clinical_staff(user: &User) -> Result<(), AppError> {
    if user.is_clinical_staff() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only clinic staff can manage inventory".to_string()))
    }
}

// ==============================================================================
// STOCK
// ==============================================================================

#[axum::debug_handler]
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let items = InventoryStock::new(&state).list_items().await?;

    Ok(Json(json!({
        "items": items,
        "total": items.len(),
    })))
}

#[axum::debug_handler]
pub async fn low_stock_items(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let items = InventoryStock::new(&state).low_stock_items().await?;

    Ok(Json(json!({
        "items": items,
        "total": items.len(),
    })))
}

#[axum::debug_handler]
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateItemRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let item = InventoryStock::new(&state).create_item(request).await?;

    Ok(Json(json!({
        "success": true,
        "item": item,
    })))
}

#[axum::debug_handler]
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let item = InventoryStock::new(&state).get_item(item_id).await?;
    Ok(Json(json!(item)))
}

#[axum::debug_handler]
pub async fn adjust_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<AdjustStockRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let item = InventoryStock::new(&state).adjust(item_id, request.delta).await?;

    Ok(Json(json!({
        "success": true,
        "item": item,
        "low_stock": item.is_low_stock(),
    })))
}

/// Body is the raw CSV text.
#[axum::debug_handler]
pub async fn import_inventory(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    body: String,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("CSV body is empty".to_string()));
    }

    let summary = InventoryImporter::new(&state).import(&body).await?;
    Ok(Json(json!(summary)))
}

// ==============================================================================
// CATALOGUE
// ==============================================================================

#[axum::debug_handler]
pub async fn list_treatments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let treatments = TreatmentRecipeStore::new(&state).list_treatments().await?;

    Ok(Json(json!({
        "treatments": treatments,
        "total": treatments.len(),
    })))
}

#[axum::debug_handler]
pub async fn upsert_treatment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertTreatmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let treatment = TreatmentRecipeStore::new(&state).upsert_treatment(request).await?;

    Ok(Json(json!({
        "success": true,
        "treatment": treatment,
    })))
}

#[axum::debug_handler]
pub async fn get_treatment(
    State(state): State<Arc<AppState>>,
    Path(treatment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let treatment = TreatmentRecipeStore::new(&state).get_treatment(treatment_id).await?;
    Ok(Json(json!(treatment)))
}

#[axum::debug_handler]
pub async fn update_treatment_cost(
    State(state): State<Arc<AppState>>,
    Path(treatment_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateCostRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let treatment = TreatmentRecipeStore::new(&state)
        .update_treatment_cost(treatment_id, request.cost)
        .await?;

    Ok(Json(json!({
        "success": true,
        "treatment": treatment,
    })))
}

// ==============================================================================
// RECIPES
// ==============================================================================

#[axum::debug_handler]
pub async fn get_recipe(
    State(state): State<Arc<AppState>>,
    Path(treatment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let lines = TreatmentRecipeStore::new(&state).resolve(treatment_id).await?;

    Ok(Json(json!({
        "treatment_id": treatment_id,
        "recipe": lines,
    })))
}

#[axum::debug_handler]
pub async fn link_recipe_item(
    State(state): State<Arc<AppState>>,
    Path((treatment_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
    Json(request): Json<LinkRecipeRequest>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    let line = TreatmentRecipeStore::new(&state)
        .link(treatment_id, item_id, request.qty_required)
        .await?;

    Ok(Json(json!({
        "success": true,
        "recipe_line": line,
    })))
}

#[axum::debug_handler]
pub async fn unlink_recipe_item(
    State(state): State<Arc<AppState>>,
    Path((treatment_id, item_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_clinical_staff(&user)?;
    TreatmentRecipeStore::new(&state).unlink(treatment_id, item_id).await?;

    Ok(Json(json!({
        "success": true,
    })))
}
