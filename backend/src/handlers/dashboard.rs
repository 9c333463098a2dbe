//! Dashboard handler

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Local;
use serde::Deserialize;

use shared::{DashboardPeriod, OrderFilter};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::dashboard::DashboardMetrics;
use crate::services::DashboardService;
use crate::AppState;

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    pub period: DashboardPeriod,
    #[serde(default)]
    pub order_filter: OrderFilter,
}

/// Get dashboard metrics
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<DashboardMetrics>> {
    let service = DashboardService::new(state.db, state.config.reports.low_stock_threshold);
    let metrics = service
        .metrics(
            &current_user.0,
            query.period,
            query.order_filter,
            Local::now().date_naive(),
        )
        .await?;
    Ok(Json(metrics))
}
