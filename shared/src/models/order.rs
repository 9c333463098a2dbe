//! Order models and status lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "order_status", rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Completed,
    Canceled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [
        OrderStatus::Pending,
        OrderStatus::Completed,
        OrderStatus::Canceled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Canceled => "canceled",
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, OrderStatus::Canceled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// Raised when a status string is not one of the known statuses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid order status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for OrderStatus {
    type Err = ParseStatusError;

    /// Parses a status, ignoring surrounding whitespace and case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// A stock reservation placed by a user against one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub ordered_by: Uuid,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// Order joined with its product and the ordering user, for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct OrderDetail {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
    pub ordered_by: Uuid,
    pub ordered_by_username: String,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
}

/// Input for placing an order
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrderInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
    /// Initial status, pending when omitted
    pub status: Option<OrderStatus>,
}

/// Input for an administrator status change
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusInput {
    pub status: String,
}
