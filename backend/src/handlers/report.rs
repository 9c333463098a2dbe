//! Report handlers: stored reports, on-demand generation and sales export

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use shared::Report;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ReportingService;
use crate::AppState;

#[derive(Deserialize)]
pub struct SalesReportQuery {
    /// Defaults to today (server local time)
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct LowStockQuery {
    pub threshold: Option<i32>,
}

#[derive(Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>, // "json" or "csv"
}

/// List stored reports
pub async fn list_reports(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Report>>> {
    let service = ReportingService::new(state.db);
    let reports = service.list_reports(&current_user.0).await?;
    Ok(Json(reports))
}

/// Get a stored report
pub async fn get_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(report_id): Path<Uuid>,
) -> AppResult<Json<Report>> {
    let service = ReportingService::new(state.db);
    let report = service.get_report(&current_user.0, report_id).await?;
    Ok(Json(report))
}

/// Generate the sales report for a day, replacing any earlier one
pub async fn generate_sales_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<SalesReportQuery>,
) -> AppResult<(StatusCode, Json<Report>)> {
    let date = query.date.unwrap_or_else(|| Local::now().date_naive());

    let service = ReportingService::new(state.db);
    let report = service.generate_sales_report(&current_user.0, date).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Generate a low-stock alert. Responds 204 when every product is sufficiently stocked.
pub async fn generate_low_stock_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Response> {
    let threshold = query
        .threshold
        .unwrap_or(state.config.reports.low_stock_threshold);

    let service = ReportingService::new(state.db);
    let report = service
        .generate_low_stock_alert(&current_user.0, threshold)
        .await?;

    Ok(match report {
        Some(report) => (StatusCode::CREATED, Json(report)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

/// Per-product sales for one day as JSON or CSV
pub async fn get_sales_lines(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(date): Path<NaiveDate>,
    Query(query): Query<ExportQuery>,
) -> AppResult<Response> {
    let service = ReportingService::new(state.db);
    let lines = service.sales_lines(&current_user.0, date).await?;

    if query.format.as_deref() == Some("csv") {
        let csv = ReportingService::export_to_csv(&lines)?;
        let disposition = format!("attachment; filename=\"sales_{}.csv\"", date);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(lines).into_response())
    }
}
