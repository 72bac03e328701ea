use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::{Role, User};
use shared_models::billing::Invoice;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::services::InvoiceGenerator;

fn is_billing_staff(user: &User) -> bool {
    matches!(user.role(), Role::Admin | Role::Staff)
}

/// Billing staff see every invoice; patients and doctors only their own.
fn require_invoice_access(user: &User, invoice: &Invoice) -> Result<(), AppError> {
    if is_billing_staff(user) || user.is(invoice.patient_id) || user.is(invoice.doctor_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Not authorized to view this invoice".to_string()))
    }
}

#[axum::debug_handler]
pub async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let invoice = InvoiceGenerator::new(&state).get_invoice(invoice_id).await?;
    require_invoice_access(&user, &invoice)?;
    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn get_invoice_detail(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let generator = InvoiceGenerator::new(&state);
    let invoice = generator.get_invoice(invoice_id).await?;
    require_invoice_access(&user, &invoice)?;

    let detail = generator.detail(invoice_id).await?;
    Ok(Json(json!(detail)))
}

#[axum::debug_handler]
pub async fn get_appointment_invoice(
    State(state): State<Arc<AppState>>,
    Path(appointment_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let invoice = InvoiceGenerator::new(&state)
        .invoice_for_appointment(appointment_id)
        .await?;
    require_invoice_access(&user, &invoice)?;
    Ok(Json(json!(invoice)))
}

#[axum::debug_handler]
pub async fn mark_invoice_paid(
    State(state): State<Arc<AppState>>,
    Path(invoice_id): Path<Uuid>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !is_billing_staff(&user) {
        return Err(AppError::Forbidden("Only billing staff can record payments".to_string()));
    }

    let invoice = InvoiceGenerator::new(&state).mark_paid(invoice_id).await?;

    Ok(Json(json!({
        "success": true,
        "invoice": invoice,
    })))
}
