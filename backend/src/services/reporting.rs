//! Report generator: daily sales snapshots and low-stock alerts

use chrono::{Datelike, Local, NaiveDate};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use shared::{
    day_bounds, render_low_stock, Actor, CompletedSale, LowStockEntry, Operation, OrderStatus,
    Report, ReportType, SalesLine, SalesSummary,
};

use crate::error::{AppError, AppResult};
use crate::services::ensure_allowed;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

const REPORT_COLUMNS: &str = "id, report_type, report_date, generated_at, details";

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Generate (or regenerate) the sales report for one day on behalf of a user
    pub async fn generate_sales_report(&self, actor: &Actor, as_of: NaiveDate) -> AppResult<Report> {
        ensure_allowed(actor, Operation::GenerateReports)?;
        self.run_sales_report(as_of).await
    }

    /// Replace the stored sales report for `as_of` with a fresh aggregation.
    ///
    /// Runs without a caller; the scheduler uses this directly.
    pub async fn run_sales_report(&self, as_of: NaiveDate) -> AppResult<Report> {
        let mut tx = self.db.begin().await?;

        lock_report_slot(&mut tx, ReportType::Sales, as_of).await?;

        let superseded = sqlx::query(
            "DELETE FROM reports WHERE report_type = $1 AND report_date = $2",
        )
        .bind(ReportType::Sales)
        .bind(as_of)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let summary = summarize_sales(&mut tx, as_of).await?;
        let report = insert_report(&mut tx, ReportType::Sales, as_of, &summary.render()).await?;

        tx.commit().await?;

        tracing::info!(
            report_id = %report.id,
            date = %as_of,
            products = summary.lines.len(),
            units = summary.total_units(),
            revenue = %summary.total_revenue,
            superseded,
            "Sales report generated"
        );

        Ok(report)
    }

    /// Store a low-stock report if any product is at or below `threshold`
    pub async fn generate_low_stock_alert(
        &self,
        actor: &Actor,
        threshold: i32,
    ) -> AppResult<Option<Report>> {
        ensure_allowed(actor, Operation::GenerateReports)?;

        let entries = sqlx::query_as::<_, LowStockEntry>(
            r#"
            SELECT id AS product_id, name, quantity
            FROM products
            WHERE quantity <= $1
            ORDER BY quantity ASC, name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.db)
        .await?;

        let Some(details) = render_low_stock(&entries) else {
            tracing::info!(threshold, "All products are sufficiently stocked");
            return Ok(None);
        };

        let mut conn = self.db.acquire().await?;
        let report = insert_report(
            &mut conn,
            ReportType::LowStock,
            Local::now().date_naive(),
            &details,
        )
        .await?;

        tracing::info!(
            report_id = %report.id,
            report_type = report.report_type.as_str(),
            threshold,
            products = entries.len(),
            "Low stock alert generated"
        );

        Ok(Some(report))
    }

    /// List stored reports, newest first
    pub async fn list_reports(&self, actor: &Actor) -> AppResult<Vec<Report>> {
        ensure_allowed(actor, Operation::ViewReports)?;

        let query = format!(
            "SELECT {} FROM reports ORDER BY generated_at DESC",
            REPORT_COLUMNS
        );
        let reports = sqlx::query_as::<_, Report>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(reports)
    }

    /// Get a stored report by ID
    pub async fn get_report(&self, actor: &Actor, report_id: Uuid) -> AppResult<Report> {
        ensure_allowed(actor, Operation::ViewReports)?;

        let query = format!("SELECT {} FROM reports WHERE id = $1", REPORT_COLUMNS);
        sqlx::query_as::<_, Report>(&query)
            .bind(report_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Report {}", report_id)))
    }

    /// Per-product sales totals for one day, computed live
    pub async fn sales_lines(&self, actor: &Actor, as_of: NaiveDate) -> AppResult<Vec<SalesLine>> {
        ensure_allowed(actor, Operation::ViewReports)?;

        let mut conn = self.db.acquire().await?;
        let summary = summarize_sales(&mut conn, as_of).await?;

        Ok(summary.lines)
    }

    /// Export records to CSV, one header row from the field names
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;

        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

/// Serialize regeneration of one (type, day) slot until the transaction ends
async fn lock_report_slot(
    conn: &mut PgConnection,
    report_type: ReportType,
    date: NaiveDate,
) -> AppResult<()> {
    let kind: i32 = match report_type {
        ReportType::Sales => 1,
        ReportType::LowStock => 2,
    };

    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(kind)
        .bind(date.num_days_from_ce())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Aggregate completed orders placed on `date` (server local calendar day)
async fn summarize_sales(conn: &mut PgConnection, date: NaiveDate) -> AppResult<SalesSummary> {
    let (start, end) = day_bounds(date, &Local);

    let sales = sqlx::query_as::<_, CompletedSale>(
        r#"
        SELECT o.product_id, p.name AS product_name, o.quantity, p.price AS unit_price
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.status = $1 AND o.ordered_at >= $2 AND o.ordered_at < $3
        "#,
    )
    .bind(OrderStatus::Completed)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    Ok(SalesSummary::aggregate(date, sales))
}

async fn insert_report(
    conn: &mut PgConnection,
    report_type: ReportType,
    report_date: NaiveDate,
    details: &str,
) -> AppResult<Report> {
    let query = format!(
        "INSERT INTO reports (report_type, report_date, details) VALUES ($1, $2, $3) RETURNING {}",
        REPORT_COLUMNS
    );

    let report = sqlx::query_as::<_, Report>(&query)
        .bind(report_type)
        .bind(report_date)
        .bind(details)
        .fetch_one(&mut *conn)
        .await?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_export_sales_lines_to_csv() {
        let product_id = Uuid::nil();
        let lines = vec![SalesLine {
            product_name: "Widget".to_string(),
            total_sold: 2,
            total_price: Decimal::new(400000, 2),
            product_id,
        }];

        let csv = ReportingService::export_to_csv(&lines).unwrap();
        let mut rows = csv.lines();

        assert_eq!(rows.next(), Some("product_name,total_sold,total_price,product_id"));
        assert_eq!(
            rows.next(),
            Some(format!("Widget,2,4000.00,{}", product_id).as_str())
        );
        assert_eq!(rows.next(), None);
    }

    #[test]
    fn test_export_empty_is_empty() {
        let csv = ReportingService::export_to_csv::<SalesLine>(&[]).unwrap();
        assert!(csv.is_empty());
    }
}
