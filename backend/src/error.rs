//! Error handling for the warehouse ledger server
//!
//! Every error maps to an HTTP status and a JSON body of the form
//! `{ "error": { "code", "message", "field"? } }`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{OrderStatus, ParseStatusError, StockError};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not authorized to perform this operation")]
    NotAuthorized,

    // Validation errors
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    // Ledger errors
    #[error("Not enough stock available: requested {requested}, available {available}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Order cannot be canceled while {0}")]
    NotCancelable(OrderStatus),

    #[error("Product {0} not found")]
    ProductNotFound(Uuid),

    #[error("Order {0} not found")]
    OrderNotFound(Uuid),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<StockError> for AppError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InsufficientStock {
                available,
                requested,
            } => AppError::InsufficientStock {
                available,
                requested,
            },
            StockError::InvalidQuantity(quantity) => AppError::Validation {
                field: "quantity".to_string(),
                message: format!("Quantity must be positive, got {}", quantity),
            },
            StockError::NotCancelable(status) => AppError::NotCancelable(status),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<ParseStatusError> for AppError {
    fn from(err: ParseStatusError) -> Self {
        AppError::InvalidStatus(err.0)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        // Report the alphabetically first failing field so responses are stable
        let field_errors = errors.field_errors();
        let first = field_errors
            .iter()
            .min_by_key(|(field, _)| **field)
            .and_then(|(field, errs)| errs.first().map(|err| (*field, err)));

        match first {
            Some((field, err)) => AppError::Validation {
                field: field.to_string(),
                message: err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid {}", field)),
            },
            None => AppError::Validation {
                field: "input".to_string(),
                message: errors.to_string(),
            },
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

impl AppError {
    /// HTTP status and response body for this error
    pub fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Invalid username or password"),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", msg.clone()),
            ),
            AppError::NotAuthorized => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "NOT_AUTHORIZED",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", msg.clone()),
            ),
            AppError::InsufficientStock { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("INSUFFICIENT_STOCK", self.to_string()),
            ),
            AppError::InvalidStatus(status) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_STATUS".to_string(),
                    message: format!("Invalid status update: {:?}", status),
                    field: Some("status".to_string()),
                },
            ),
            AppError::NotCancelable(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail::new("NOT_CANCELABLE", "This order cannot be canceled"),
            ),
            AppError::ProductNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("PRODUCT_NOT_FOUND", self.to_string()),
            ),
            AppError::OrderNotFound(_) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("ORDER_NOT_FOUND", self.to_string()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected request: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers and services
pub type AppResult<T> = Result<T, AppError>;
