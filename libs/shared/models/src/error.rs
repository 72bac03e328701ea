use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::appointment::AppointmentStatus;

/// Typed failures of the scheduling and resource-consumption engine.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ClinicError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock for {item}: required {required}, available {available}")]
    InsufficientStock {
        item: String,
        required: i32,
        available: i32,
    },

    #[error("Invalid status transition from {from} to {to}")]
    StateTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl ClinicError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        ClinicError::NotFound(format!("{} {} not found", what, id))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{0}")]
    Clinic(ClinicError),
}

impl From<ClinicError> for AppError {
    fn from(error: ClinicError) -> Self {
        match error {
            ClinicError::Validation(msg) => AppError::ValidationError(msg),
            ClinicError::NotFound(msg) => AppError::NotFound(msg),
            ClinicError::Storage(msg) => AppError::Database(msg),
            other => AppError::Clinic(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Clinic(error) = &self {
            // Conflicts, stock shortfalls and illegal transitions carry a
            // structured body so callers can name the deficient item.
            let status = StatusCode::CONFLICT;
            tracing::error!("Error: {}: {}", status, error);
            let body = Json(json!({
                "error": error.to_string(),
                "details": error,
            }));
            return (status, body).into_response();
        }

        let (status, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::Database(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Clinic(error) => (StatusCode::CONFLICT, error.to_string()),
        };

        tracing::error!("Error: {}: {}", status, message);

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
