//! Product store: catalog entries and their quantity on hand

use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use shared::{sanitize_description, Actor, Operation, Product, ProductInput};

use crate::error::{AppError, AppResult};
use crate::services::ensure_allowed;

/// Product service for catalog management
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    /// Create a new ProductService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List all products
    pub async fn list_products(&self, actor: &Actor) -> AppResult<Vec<Product>> {
        ensure_allowed(actor, Operation::ViewProducts)?;

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, quantity, price, created_at
            FROM products
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// List products that can currently be ordered
    pub async fn list_in_stock(&self, actor: &Actor) -> AppResult<Vec<Product>> {
        ensure_allowed(actor, Operation::ViewProducts)?;

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, quantity, price, created_at
            FROM products
            WHERE quantity > 0
            ORDER BY name ASC
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }

    /// Get a product by ID
    pub async fn get_product(&self, actor: &Actor, product_id: Uuid) -> AppResult<Product> {
        ensure_allowed(actor, Operation::ViewProducts)?;

        sqlx::query_as::<_, Product>(
            "SELECT id, name, description, quantity, price, created_at FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::ProductNotFound(product_id))
    }

    /// Add a product to the catalog
    pub async fn create_product(&self, actor: &Actor, input: ProductInput) -> AppResult<Product> {
        ensure_allowed(actor, Operation::ManageProducts)?;
        input.validate()?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (name, description, quantity, price)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, description, quantity, price, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(sanitize_description(&input.description))
        .bind(input.quantity)
        .bind(input.price)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %product.id, quantity = product.quantity, "Product created");

        Ok(product)
    }

    /// Replace a product's details, including a direct stock correction
    pub async fn update_product(
        &self,
        actor: &Actor,
        product_id: Uuid,
        input: ProductInput,
    ) -> AppResult<Product> {
        ensure_allowed(actor, Operation::ManageProducts)?;
        input.validate()?;

        let product = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
            SET name = $1, description = $2, quantity = $3, price = $4
            WHERE id = $5
            RETURNING id, name, description, quantity, price, created_at
            "#,
        )
        .bind(input.name.trim())
        .bind(sanitize_description(&input.description))
        .bind(input.quantity)
        .bind(input.price)
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::ProductNotFound(product_id))?;

        tracing::info!(product_id = %product.id, quantity = product.quantity, "Product updated");

        Ok(product)
    }

    /// Delete a product together with its orders
    pub async fn delete_product(&self, actor: &Actor, product_id: Uuid) -> AppResult<()> {
        ensure_allowed(actor, Operation::ManageProducts)?;

        let mut tx = self.db.begin().await?;

        // Orders first, then the product: the lock order of status changes
        let orders = sqlx::query(
            "SELECT id FROM orders WHERE product_id = $1 ORDER BY id FOR UPDATE",
        )
        .bind(product_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::ProductNotFound(product_id));
        }

        tx.commit().await?;

        tracing::info!(%product_id, orders, "Product deleted");

        Ok(())
    }
}
