//! Order ledger: the only writer of product stock
//!
//! Every write runs in one transaction that locks the order row (for status
//! changes) and then the product row with `FOR UPDATE`, applies the shared
//! stock transition, and writes product and order together. Any error drops
//! the transaction, so nothing is persisted.

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use shared::{
    apply_order_transition, check_transition, Actor, CreateOrderInput, Operation, Order,
    OrderDetail, OrderStatus, Product, TransitionScope,
};

use crate::error::{AppError, AppResult};
use crate::services::ensure_allowed;

/// Order service implementing the stock-consistent ledger
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

const ORDER_DETAIL_SELECT: &str = r#"
    SELECT o.id, o.product_id, p.name AS product_name, p.price AS unit_price,
           o.quantity, (o.quantity * p.price) AS total_price,
           o.ordered_by, u.username AS ordered_by_username,
           o.status, o.ordered_at
    FROM orders o
    JOIN products p ON p.id = o.product_id
    JOIN users u ON u.id = o.ordered_by
"#;

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Place an order, reserving its quantity against the product's stock
    pub async fn create_order(&self, actor: &Actor, input: CreateOrderInput) -> AppResult<Order> {
        ensure_allowed(actor, Operation::CreateOrder)?;
        input.validate()?;

        let status = input.status.unwrap_or_default();
        if status.is_canceled() {
            return Err(AppError::InvalidStatus(status.as_str().to_string()));
        }
        if status != OrderStatus::Pending {
            ensure_allowed(actor, Operation::UpdateOrderStatus)?;
        }

        let mut tx = self.db.begin().await?;

        let mut product = lock_product(&mut tx, input.product_id).await?;
        let order = Order {
            id: Uuid::new_v4(),
            product_id: product.id,
            quantity: input.quantity,
            ordered_by: actor.user_id,
            status,
            ordered_at: Utc::now(),
        };

        let adjustment = apply_order_transition(None, &order, &mut product)?;
        save_stock(&mut tx, &product).await?;

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (id, product_id, quantity, ordered_by, status, ordered_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, product_id, quantity, ordered_by, status, ordered_at
            "#,
        )
        .bind(order.id)
        .bind(order.product_id)
        .bind(order.quantity)
        .bind(order.ordered_by)
        .bind(order.status)
        .bind(order.ordered_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            product_id = %order.product_id,
            stock_delta = adjustment.delta(),
            remaining = product.quantity,
            "Order placed"
        );

        Ok(order)
    }

    /// Set an order's status (administrators). The status string is parsed
    /// case-insensitively; setting the current status again changes nothing.
    pub async fn set_order_status(
        &self,
        actor: &Actor,
        order_id: Uuid,
        new_status: &str,
    ) -> AppResult<Order> {
        ensure_allowed(actor, Operation::UpdateOrderStatus)?;
        let next: OrderStatus = new_status.parse()?;

        self.transition(order_id, next, None, TransitionScope::AnyOrder)
            .await
    }

    /// Cancel one of the caller's own pending orders, releasing its stock
    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<Order> {
        ensure_allowed(actor, Operation::CancelOwnOrder)?;

        self.transition(
            order_id,
            OrderStatus::Canceled,
            Some(actor.user_id),
            TransitionScope::OwnPendingOrder,
        )
        .await
    }

    async fn transition(
        &self,
        order_id: Uuid,
        next: OrderStatus,
        owner: Option<Uuid>,
        scope: TransitionScope,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let mut order = lock_order(&mut tx, order_id, owner).await?;

        if !check_transition(order.status, next, scope)? {
            tracing::debug!(%order_id, status = next.as_str(), "Order status already set");
            return Ok(order);
        }

        let mut product = lock_product(&mut tx, order.product_id).await?;
        let previous = order.status;
        order.status = next;

        let adjustment = apply_order_transition(Some(previous), &order, &mut product)?;
        if !adjustment.is_none() {
            save_stock(&mut tx, &product).await?;
        }

        let order = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1
            WHERE id = $2
            RETURNING id, product_id, quantity, ordered_by, status, ordered_at
            "#,
        )
        .bind(order.status)
        .bind(order.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            %order_id,
            from = previous.as_str(),
            to = next.as_str(),
            stock_delta = adjustment.delta(),
            "Order status changed"
        );

        Ok(order)
    }

    /// Get one order. Administrators see any order, employees only their own.
    pub async fn get_order(&self, actor: &Actor, order_id: Uuid) -> AppResult<OrderDetail> {
        let owner = if actor.can(Operation::ViewAllOrders) {
            None
        } else {
            ensure_allowed(actor, Operation::ViewOwnOrders)?;
            Some(actor.user_id)
        };

        let query = format!(
            "{} WHERE o.id = $1 AND ($2::uuid IS NULL OR o.ordered_by = $2)",
            ORDER_DETAIL_SELECT
        );

        sqlx::query_as::<_, OrderDetail>(&query)
            .bind(order_id)
            .bind(owner)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::OrderNotFound(order_id))
    }

    /// List all orders, newest first
    pub async fn list_orders(&self, actor: &Actor) -> AppResult<Vec<OrderDetail>> {
        ensure_allowed(actor, Operation::ViewAllOrders)?;

        let query = format!("{} ORDER BY o.ordered_at DESC", ORDER_DETAIL_SELECT);
        let orders = sqlx::query_as::<_, OrderDetail>(&query)
            .fetch_all(&self.db)
            .await?;

        Ok(orders)
    }

    /// List the caller's own orders, newest first
    pub async fn list_user_orders(&self, actor: &Actor) -> AppResult<Vec<OrderDetail>> {
        ensure_allowed(actor, Operation::ViewOwnOrders)?;

        let query = format!(
            "{} WHERE o.ordered_by = $1 ORDER BY o.ordered_at DESC",
            ORDER_DETAIL_SELECT
        );
        let orders = sqlx::query_as::<_, OrderDetail>(&query)
            .bind(actor.user_id)
            .fetch_all(&self.db)
            .await?;

        Ok(orders)
    }
}

/// Read a product and hold its row lock until the transaction ends
async fn lock_product(conn: &mut PgConnection, product_id: Uuid) -> AppResult<Product> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, description, quantity, price, created_at
        FROM products
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(product_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::ProductNotFound(product_id))
}

/// Read an order, optionally restricted to its owner, and lock its row
async fn lock_order(
    conn: &mut PgConnection,
    order_id: Uuid,
    owner: Option<Uuid>,
) -> AppResult<Order> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, product_id, quantity, ordered_by, status, ordered_at
        FROM orders
        WHERE id = $1 AND ($2::uuid IS NULL OR ordered_by = $2)
        FOR UPDATE
        "#,
    )
    .bind(order_id)
    .bind(owner)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(AppError::OrderNotFound(order_id))
}

async fn save_stock(conn: &mut PgConnection, product: &Product) -> AppResult<()> {
    sqlx::query("UPDATE products SET quantity = $1 WHERE id = $2")
        .bind(product.quantity)
        .bind(product.id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
