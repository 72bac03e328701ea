use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{BlockRequest, DateQuery, SlotQuery, UpsertScheduleRequest};
use crate::services::{AvailabilityService, BlockRegistry, ScheduleService};

fn require_doctor_access(user: &User, doctor_id: Uuid) -> Result<(), AppError> {
    if user.can_manage_doctor(doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Only the doctor or an admin can change this schedule".to_string(),
        ))
    }
}

// ==============================================================================
// AVAILABILITY
// ==============================================================================

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let service = AvailabilityService::new(&state);

    let available = service
        .get_available_slots(doctor_id, query.date, query.treatment.as_deref())
        .await?;

    Ok(Json(json!(available)))
}

// ==============================================================================
// SCHEDULE CONFIGURATION
// ==============================================================================

#[axum::debug_handler]
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let config = ScheduleService::new(&state).get_config(doctor_id).await?;
    Ok(Json(json!(config)))
}

#[axum::debug_handler]
pub async fn upsert_schedule(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<UpsertScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor_access(&user, doctor_id)?;

    let config = ScheduleService::new(&state)
        .upsert_config(doctor_id, request)
        .await?;

    Ok(Json(json!({
        "success": true,
        "schedule": config,
    })))
}

// ==============================================================================
// BLOCKS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_block(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Extension(user): Extension<User>,
    Json(request): Json<BlockRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor_access(&user, doctor_id)?;

    let block = BlockRegistry::new(&state).block(doctor_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "block": block,
    })))
}

#[axum::debug_handler]
pub async fn list_blocks(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Value>, AppError> {
    let blocks = BlockRegistry::new(&state)
        .list_blocks(doctor_id, query.date)
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "blocks": blocks,
    })))
}

#[axum::debug_handler]
pub async fn delete_block(
    State(state): State<Arc<AppState>>,
    Path((doctor_id, block_id)): Path<(Uuid, Uuid)>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_doctor_access(&user, doctor_id)?;

    let block = BlockRegistry::new(&state).unblock(doctor_id, block_id).await?;

    Ok(Json(json!({
        "success": true,
        "block": block,
    })))
}
