//! Stored report snapshots

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "report_type", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Sales,
    LowStock,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Sales => "sales",
            ReportType::LowStock => "low_stock",
        }
    }
}

impl std::fmt::Display for ReportType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportType::Sales => write!(f, "Sales Report"),
            ReportType::LowStock => write!(f, "Low Stock Report"),
        }
    }
}

/// An immutable report. Sales reports are replaced, never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Report {
    pub id: Uuid,
    pub report_type: ReportType,
    /// Calendar day the report covers
    pub report_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub details: String,
}
