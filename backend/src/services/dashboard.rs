//! Administrator dashboard read model

use chrono::{DateTime, Days, Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use shared::{
    cancel_rate_percent, day_bounds, first_of_month, start_of_day, Actor, DashboardPeriod,
    Operation, OrderFilter, OrderStatus,
};

use crate::error::AppResult;
use crate::services::ensure_allowed;

/// Days covered by the cancel rate
const CANCEL_RATE_WINDOW_DAYS: u64 = 30;

const TOP_PRODUCT_LIMIT: i64 = 5;

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
    low_stock_threshold: i32,
}

/// A product ranked by ordered quantity
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub name: String,
    pub total_quantity: i64,
}

/// Completed orders placed within one timeline bucket
#[derive(Debug, Serialize)]
pub struct TimelinePoint {
    pub label: String,
    pub start: NaiveDate,
    pub completed_orders: i64,
}

/// Dashboard metrics
#[derive(Debug, Serialize)]
pub struct DashboardMetrics {
    pub period: DashboardPeriod,
    pub order_filter: OrderFilter,
    pub total_products: i64,
    pub total_orders: i64,
    pub total_reports: i64,
    pub top_products: Vec<TopProduct>,
    pub order_timeline: Vec<TimelinePoint>,
    pub today_revenue: Decimal,
    pub pending_orders: i64,
    /// Percentage of orders canceled over the last 30 days
    pub canceled_order_rate: Decimal,
    pub low_stock_products: i64,
}

impl DashboardService {
    pub fn new(db: PgPool, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    /// Compute all dashboard metrics as of `today` (server local calendar)
    pub async fn metrics(
        &self,
        actor: &Actor,
        period: DashboardPeriod,
        order_filter: OrderFilter,
        today: NaiveDate,
    ) -> AppResult<DashboardMetrics> {
        ensure_allowed(actor, Operation::ViewDashboard)?;

        let total_products = self.count("SELECT COUNT(*) FROM products").await?;
        let total_orders = self.count("SELECT COUNT(*) FROM orders").await?;
        let total_reports = self.count("SELECT COUNT(*) FROM reports").await?;

        let top_products = self.top_products(order_filter, today).await?;
        let order_timeline = self.order_timeline(period, today).await?;
        let today_revenue = self.revenue_on(today).await?;

        let pending_orders: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE status = $1")
                .bind(OrderStatus::Pending)
                .fetch_one(&self.db)
                .await?;

        let window_start = start_of_day(today - Days::new(CANCEL_RATE_WINDOW_DAYS), &Local);
        let canceled_order_rate = self.cancel_rate_since(window_start).await?;

        let low_stock_products: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE quantity <= $1")
                .bind(self.low_stock_threshold)
                .fetch_one(&self.db)
                .await?;

        Ok(DashboardMetrics {
            period,
            order_filter,
            total_products,
            total_orders,
            total_reports,
            top_products,
            order_timeline,
            today_revenue,
            pending_orders,
            canceled_order_rate,
            low_stock_products,
        })
    }

    async fn count(&self, query: &str) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(query).fetch_one(&self.db).await?;
        Ok(count)
    }

    /// Top products by ordered quantity since the first of the month
    async fn top_products(&self, filter: OrderFilter, today: NaiveDate) -> AppResult<Vec<TopProduct>> {
        let since = start_of_day(first_of_month(today), &Local);
        let (first, second) = match filter {
            OrderFilter::Completed => (OrderStatus::Completed, OrderStatus::Completed),
            OrderFilter::All => (OrderStatus::Completed, OrderStatus::Canceled),
        };

        let products = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT p.id AS product_id, p.name, SUM(o.quantity)::BIGINT AS total_quantity
            FROM orders o
            JOIN products p ON p.id = o.product_id
            WHERE o.status IN ($1, $2) AND o.ordered_at >= $3
            GROUP BY p.id, p.name
            ORDER BY total_quantity DESC, p.name ASC
            LIMIT $4
            "#,
        )
        .bind(first)
        .bind(second)
        .bind(since)
        .bind(TOP_PRODUCT_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    async fn order_timeline(
        &self,
        period: DashboardPeriod,
        today: NaiveDate,
    ) -> AppResult<Vec<TimelinePoint>> {
        let buckets = period.buckets(today);
        let mut points = Vec::with_capacity(buckets.len());

        for bucket in buckets {
            let (start, end) = bucket.bounds(&Local);
            let completed_orders: i64 = sqlx::query_scalar(
                r#"
                SELECT COUNT(*) FROM orders
                WHERE status = $1 AND ordered_at >= $2 AND ordered_at < $3
                "#,
            )
            .bind(OrderStatus::Completed)
            .bind(start)
            .bind(end)
            .fetch_one(&self.db)
            .await?;

            points.push(TimelinePoint {
                label: bucket.label,
                start: bucket.start,
                completed_orders,
            });
        }

        Ok(points)
    }

    /// Revenue from completed orders placed on `date`, at current prices
    async fn revenue_on(&self, date: NaiveDate) -> AppResult<Decimal> {
        let (start, end) = day_bounds(date, &Local);

        let revenue: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(o.quantity * p.price), 0)
            FROM orders o
            JOIN products p ON p.id = o.product_id
            WHERE o.status = $1 AND o.ordered_at >= $2 AND o.ordered_at < $3
            "#,
        )
        .bind(OrderStatus::Completed)
        .bind(start)
        .bind(end)
        .fetch_one(&self.db)
        .await?;

        Ok(revenue)
    }

    async fn cancel_rate_since(&self, since: DateTime<Utc>) -> AppResult<Decimal> {
        let (canceled, total): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = $1), COUNT(*)
            FROM orders
            WHERE ordered_at >= $2
            "#,
        )
        .bind(OrderStatus::Canceled)
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        Ok(cancel_rate_percent(canceled, total))
    }
}
