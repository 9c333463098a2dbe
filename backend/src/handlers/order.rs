//! HTTP handlers for the order ledger

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use shared::{CreateOrderInput, Order, OrderDetail, UpdateOrderStatusInput};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::OrderService;
use crate::AppState;

/// Place an order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    let service = OrderService::new(state.db);
    let order = service.create_order(&current_user.0, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// List every order
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderDetail>>> {
    let service = OrderService::new(state.db);
    let orders = service.list_orders(&current_user.0).await?;
    Ok(Json(orders))
}

/// List the caller's orders
pub async fn list_my_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OrderDetail>>> {
    let service = OrderService::new(state.db);
    let orders = service.list_user_orders(&current_user.0).await?;
    Ok(Json(orders))
}

/// Get an order by ID
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.get_order(&current_user.0, order_id).await?;
    Ok(Json(order))
}

/// Change an order's status
pub async fn update_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service
        .set_order_status(&current_user.0, order_id, &input.status)
        .await?;
    Ok(Json(order))
}

/// Cancel one of the caller's pending orders
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    let service = OrderService::new(state.db);
    let order = service.cancel_order(&current_user.0, order_id).await?;
    Ok(Json(order))
}
