//! Postgres-backed transactional store.
//!
//! This module provides the persistent [`Store`] implementation. Atomicity comes
//! from real database transactions, and the conditional writes in the contract
//! map onto single guarded statements (`UPDATE ... WHERE stock >= $n`,
//! `ON CONFLICT DO NOTHING`), so concurrent requests are decided by row locks
//! rather than by anything this process read earlier.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (query canceled) | `57014` | `Timeout` | `statement_timeout` expired inside a transaction |
//! | Database (serialization failure) | `40001` | `Unavailable` | Concurrent transaction won the race; retryable |
//! | Database (deadlock detected) | `40P01` | `Unavailable` | Row locks taken in opposite order; retryable |
//! | PoolTimedOut | N/A | `Timeout` | No connection became free within the budget |
//! | PoolClosed | N/A | `Unavailable` | Pool shut down |
//! | Io | N/A | `Unavailable` | Network failure talking to the server |
//! | Database (other) | Any other | `Backend` | Constraint violations, malformed statements |
//! | Other | N/A | `Backend` | Decode failures and everything else |
//!
//! ## Time Budget
//!
//! `begin()` applies the configured budget with `SET LOCAL statement_timeout`,
//! so a transaction stuck behind row locks is cancelled by the server and
//! surfaces as the retryable `StoreError::Timeout`.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use vexo_cart::CartItem;
use vexo_catalog::{Category, Product};
use vexo_core::{CartItemId, CategoryId, Money, OrderId, ProductId, UserId};
use vexo_fulfillment::{Receipt, Shipment, ShipmentStatus};
use vexo_orders::{Order, OrderItem, OrderStatus};

use super::r#trait::{
    CategoryWrite, SalesSummary, StockChange, Store, StoreError, StoreTxn,
};

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS categories (
        id   UUID PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        description TEXT,
        price       BIGINT NOT NULL CHECK (price >= 0),
        stock       BIGINT NOT NULL CHECK (stock >= 0),
        image_url   TEXT,
        category_id UUID REFERENCES categories(id),
        created_at  TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_products_category ON products (category_id)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_products_stock ON products (stock)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders (
        id         UUID PRIMARY KEY,
        user_id    UUID NOT NULL,
        status     TEXT NOT NULL CHECK (status IN ('pending', 'shipped', 'delivered', 'cancelled')),
        total      BIGINT NOT NULL CHECK (total >= 0),
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_orders_user ON orders (user_id, created_at DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_orders_created ON orders (created_at DESC)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS order_items (
        order_id   UUID NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        line_no    INTEGER NOT NULL CHECK (line_no >= 1),
        product_id UUID NOT NULL,
        quantity   BIGINT NOT NULL CHECK (quantity > 0),
        unit_price BIGINT NOT NULL CHECK (unit_price >= 0),
        PRIMARY KEY (order_id, line_no)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shipments (
        order_id        UUID PRIMARY KEY REFERENCES orders(id),
        carrier         TEXT NOT NULL,
        tracking_number TEXT NOT NULL,
        status          TEXT NOT NULL CHECK (status IN ('label_created', 'in_transit', 'delivered')),
        shipped_at      TIMESTAMPTZ,
        delivered_at    TIMESTAMPTZ,
        created_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS receipts (
        order_id   UUID PRIMARY KEY REFERENCES orders(id),
        pdf_url    TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS cart_items (
        id         UUID PRIMARY KEY,
        user_id    UUID NOT NULL,
        product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
        quantity   BIGINT NOT NULL CHECK (quantity > 0),
        created_at TIMESTAMPTZ NOT NULL,
        UNIQUE (user_id, product_id)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_cart_items_user ON cart_items (user_id, created_at)
    "#,
];

/// Postgres-backed transactional store.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    txn_timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, txn_timeout: Duration) -> Self {
        Self { pool, txn_timeout }
    }

    /// Connect to the database at `database_url`.
    ///
    /// The transaction budget also bounds how long we wait for a pooled
    /// connection, so a saturated pool surfaces as `Timeout` rather than
    /// queueing callers indefinitely.
    pub async fn connect(database_url: &str, txn_timeout: Duration) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .acquire_timeout(txn_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("postgres connect failed: {e}")))?;
        Ok(Self::new(pool, txn_timeout))
    }

    /// Create any missing tables and indexes.
    ///
    /// Statements are `IF NOT EXISTS`, so this is safe to run on every start.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA_STATEMENTS {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    type Txn = PgTxn;

    async fn begin(&self) -> Result<PgTxn, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        // SET LOCAL scopes the timeout to this transaction.
        sqlx::query("SELECT set_config('statement_timeout', $1, true)")
            .bind(self.txn_timeout.as_millis().to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;

        Ok(PgTxn { tx })
    }
}

/// An open Postgres transaction.
///
/// Dropping without `commit()` rolls back through the sqlx transaction guard.
pub struct PgTxn {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTxn for PgTxn {
    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock, image_url, category_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(db_cents(product.price)?)
        .bind(product.stock)
        .bind(&product.image_url)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .bind(product.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_product", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, description, price, stock, image_url, category_id, created_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("product", e))?;

        row.map(|row| product_from_row(&row, "product")).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn update_product(&mut self, product: &Product) -> Result<bool, StoreError> {
        // Stock is deliberately absent; only the ledger methods touch it.
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, description = $3, price = $4, image_url = $5, category_id = $6
            WHERE id = $1
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.description)
        .bind(db_cents(product.price)?)
        .bind(&product.image_url)
        .bind(product.category_id.map(|c| *c.as_uuid()))
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn products_below_stock(&mut self, threshold: i64) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, description, price, stock, image_url, category_id, created_at
            FROM products
            WHERE stock < $1
            ORDER BY stock ASC, name ASC
            "#,
        )
        .bind(threshold)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("products_below_stock", e))?;

        rows.iter()
            .map(|row| product_from_row(row, "products_below_stock"))
            .collect()
    }

    #[instrument(skip(self), fields(product_id = %id, quantity), err)]
    async fn reserve_stock(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockChange, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            RETURNING price, stock
            "#,
        )
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reserve_stock", e))?;

        match row {
            Some(row) => applied_from_row(&row, "reserve_stock"),
            None => self.classify_missed_stock_write(id, "reserve_stock").await,
        }
    }

    #[instrument(skip(self), fields(product_id = %id, quantity), err)]
    async fn release_stock(&mut self, id: ProductId, quantity: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(quantity)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("release_stock", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(product_id = %id, delta), err)]
    async fn adjust_stock(
        &mut self,
        id: ProductId,
        delta: i64,
    ) -> Result<StockChange, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2
            WHERE id = $1 AND stock + $2 >= 0
            RETURNING price, stock
            "#,
        )
        .bind(id.as_uuid())
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("adjust_stock", e))?;

        match row {
            Some(row) => applied_from_row(&row, "adjust_stock"),
            None => self.classify_missed_stock_write(id, "adjust_stock").await,
        }
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&mut self, category: &Category) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO categories (id, name)
            VALUES ($1, $2)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let row = sqlx::query("SELECT id, name FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("category", e))?;

        row.map(|row| category_from_row(&row, "category")).transpose()
    }

    #[instrument(skip(self), err)]
    async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, name FROM categories ORDER BY name ASC")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("categories", e))?;

        rows.iter()
            .map(|row| category_from_row(row, "categories"))
            .collect()
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> Result<CategoryWrite, StoreError> {
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM categories WHERE name = $2 AND id <> $1)")
                .bind(id.as_uuid())
                .bind(name)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("rename_category", e))?;
        if taken {
            return Ok(CategoryWrite::DuplicateName);
        }

        let result = sqlx::query("UPDATE categories SET name = $2 WHERE id = $1")
            .bind(id.as_uuid())
            .bind(name)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("rename_category", e))?;

        if result.rows_affected() == 1 {
            Ok(CategoryWrite::Applied)
        } else {
            Ok(CategoryWrite::NotFound)
        }
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&mut self, id: CategoryId) -> Result<bool, StoreError> {
        sqlx::query("UPDATE products SET category_id = NULL WHERE category_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, order), fields(order_id = %order.id, lines = order.items.len()), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, status, total, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(order.status.as_str())
        .bind(db_cents(order.total)?)
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id.as_uuid())
            .bind(item.line_no as i32)
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(db_cents(item.unit_price)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order", e))?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %id), err)]
    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, status, total, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order_row = decode_row::<OrderRow>(&row, "order")?;

        let item_rows = sqlx::query(
            r#"
            SELECT order_id, line_no, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("order", e))?;

        let mut items = Vec::with_capacity(item_rows.len());
        for row in &item_rows {
            items.push(decode_row::<OrderItemRow>(row, "order")?.into());
        }
        Ok(Some(order_from_parts(order_row, items)?))
    }

    #[instrument(skip(self), fields(owner = ?owner), err)]
    async fn orders(&mut self, owner: Option<UserId>) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, status, total, created_at
            FROM orders
            WHERE ($1::uuid IS NULL OR user_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.map(|u| *u.as_uuid()))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("orders", e))?;

        let mut order_rows = Vec::with_capacity(rows.len());
        for row in &rows {
            order_rows.push(decode_row::<OrderRow>(row, "orders")?);
        }

        let ids: Vec<Uuid> = order_rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query(
            r#"
            SELECT order_id, line_no, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = ANY($1)
            ORDER BY line_no ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("orders", e))?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for row in &item_rows {
            let item = decode_row::<OrderItemRow>(row, "orders")?;
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(item.into());
        }

        let mut listed = Vec::with_capacity(order_rows.len());
        for order_row in order_rows {
            let items = items_by_order.remove(&order_row.id).unwrap_or_default();
            listed.push(order_from_parts(order_row, items)?);
        }
        Ok(listed)
    }

    #[instrument(skip(self), fields(order_id = %id, from_status = from.as_str(), to_status = to.as_str()), err)]
    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE orders SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("transition_order", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn sales_summary(&mut self) -> Result<SalesSummary, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS orders,
                COALESCE(SUM(total), 0)::BIGINT AS revenue,
                COUNT(DISTINCT user_id) AS customers
            FROM orders
            "#,
        )
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("sales_summary", e))?;

        let orders: i64 = row
            .try_get("orders")
            .map_err(|e| map_sqlx_error("sales_summary", e))?;
        let revenue: i64 = row
            .try_get("revenue")
            .map_err(|e| map_sqlx_error("sales_summary", e))?;
        let customers: i64 = row
            .try_get("customers")
            .map_err(|e| map_sqlx_error("sales_summary", e))?;

        Ok(SalesSummary {
            orders: orders as u64,
            revenue: Money::from_cents(revenue as u64),
            customers: customers as u64,
        })
    }

    #[instrument(skip(self, shipment), fields(order_id = %shipment.order_id), err)]
    async fn insert_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO shipments (order_id, carrier, tracking_number, status, shipped_at, delivered_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (order_id) DO NOTHING
            "#,
        )
        .bind(shipment.order_id.as_uuid())
        .bind(&shipment.carrier)
        .bind(&shipment.tracking_number)
        .bind(shipment.status.as_str())
        .bind(shipment.shipped_at)
        .bind(shipment.delivered_at)
        .bind(shipment.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_shipment", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn shipment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Shipment>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT order_id, carrier, tracking_number, status, shipped_at, delivered_at, created_at
            FROM shipments
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("shipment_for_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let shipment_row = decode_row::<ShipmentRow>(&row, "shipment_for_order")?;
        Ok(Some(shipment_row.try_into()?))
    }

    #[instrument(skip(self, shipment), fields(order_id = %shipment.order_id), err)]
    async fn update_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE shipments
            SET carrier = $2, tracking_number = $3, status = $4, shipped_at = $5, delivered_at = $6
            WHERE order_id = $1
            "#,
        )
        .bind(shipment.order_id.as_uuid())
        .bind(&shipment.carrier)
        .bind(&shipment.tracking_number)
        .bind(shipment.status.as_str())
        .bind(shipment.shipped_at)
        .bind(shipment.delivered_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_shipment", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, receipt), fields(order_id = %receipt.order_id), err)]
    async fn upsert_receipt(&mut self, receipt: &Receipt) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO receipts (order_id, pdf_url, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_id) DO UPDATE
            SET pdf_url = EXCLUDED.pdf_url, created_at = EXCLUDED.created_at
            "#,
        )
        .bind(receipt.order_id.as_uuid())
        .bind(&receipt.pdf_url)
        .bind(receipt.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_receipt", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(order_id = %order_id), err)]
    async fn receipt_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Receipt>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT order_id, pdf_url, created_at
            FROM receipts
            WHERE order_id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("receipt_for_order", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(decode_row::<ReceiptRow>(&row, "receipt_for_order")?.into()))
    }

    #[instrument(skip(self, item), fields(user_id = %item.user_id, product_id = %item.product_id), err)]
    async fn add_cart_item(&mut self, item: &CartItem) -> Result<CartItem, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, product_id) DO UPDATE
            SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(item.user_id.as_uuid())
        .bind(item.product_id.as_uuid())
        .bind(item.quantity)
        .bind(item.created_at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("add_cart_item", e))?;

        Ok(decode_row::<CartItemRow>(&row, "add_cart_item")?.into())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn cart_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(CartItem, Product)>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                ci.id AS item_id,
                ci.user_id,
                ci.product_id,
                ci.quantity,
                ci.created_at AS item_created_at,
                p.id,
                p.name,
                p.description,
                p.price,
                p.stock,
                p.image_url,
                p.category_id,
                p.created_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("cart_for_user", e))?;

        let mut joined = Vec::with_capacity(rows.len());
        for row in &rows {
            let item = cart_item_from_join(row, "cart_for_user")?;
            let product = product_from_row(row, "cart_for_user")?;
            joined.push((item, product));
        }
        Ok(joined)
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id), err)]
    async fn set_cart_quantity(
        &mut self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<Option<CartItem>, StoreError> {
        let row = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE id = $2 AND user_id = $1
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("set_cart_quantity", e))?;

        row.map(|row| decode_row::<CartItemRow>(&row, "set_cart_quantity").map(CartItem::from))
            .transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id, item_id = %id), err)]
    async fn remove_cart_item(
        &mut self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM cart_items WHERE id = $2 AND user_id = $1")
            .bind(user_id.as_uuid())
            .bind(id.as_uuid())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("remove_cart_item", e))?;
        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn commit(self) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

impl PgTxn {
    /// A conditional stock write matched no row. Decide whether the product is
    /// missing or merely short on stock.
    async fn classify_missed_stock_write(
        &mut self,
        id: ProductId,
        operation: &'static str,
    ) -> Result<StockChange, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;
        if exists {
            Ok(StockChange::Insufficient)
        } else {
            Ok(StockChange::NotFound)
        }
    }
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => map_db_code(operation, code.as_ref(), db_err.message()),
            None => StoreError::Backend(format!(
                "database error in {}: {}",
                operation,
                db_err.message()
            )),
        },
        sqlx::Error::PoolTimedOut => StoreError::Timeout,
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("io error in {operation}: {e}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}

/// SQLSTATE classification. 57014 is query_canceled, raised when
/// statement_timeout expires. 40001 (serialization_failure) and 40P01
/// (deadlock_detected) mean the transaction lost a concurrency race and was
/// aborted whole, so the caller may safely retry it.
fn map_db_code(operation: &str, code: &str, message: &str) -> StoreError {
    match code {
        "57014" => StoreError::Timeout,
        "40001" | "40P01" => StoreError::Unavailable(format!(
            "transaction aborted by contention in {operation}: {message}"
        )),
        _ => StoreError::Backend(format!("database error in {operation}: {message}")),
    }
}

/// Prices and totals are stored as BIGINT cents.
fn db_cents(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.cents())
        .map_err(|_| StoreError::Backend("amount exceeds storable range".to_string()))
}

fn decode_row<'r, T: FromRow<'r, PgRow>>(row: &'r PgRow, operation: &str) -> Result<T, StoreError> {
    T::from_row(row)
        .map_err(|e| StoreError::Backend(format!("failed to decode row in {operation}: {e}")))
}

fn product_from_row(row: &PgRow, operation: &str) -> Result<Product, StoreError> {
    Ok(decode_row::<ProductRow>(row, operation)?.into())
}

fn category_from_row(row: &PgRow, operation: &str) -> Result<Category, StoreError> {
    Ok(decode_row::<CategoryRow>(row, operation)?.into())
}

fn cart_item_from_join(row: &PgRow, operation: &str) -> Result<CartItem, StoreError> {
    let decode = |e| StoreError::Backend(format!("failed to decode row in {operation}: {e}"));
    Ok(CartItem {
        id: CartItemId::from_uuid(row.try_get("item_id").map_err(decode)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode)?),
        product_id: ProductId::from_uuid(row.try_get("product_id").map_err(decode)?),
        quantity: row.try_get("quantity").map_err(decode)?,
        created_at: row.try_get("item_created_at").map_err(decode)?,
    })
}

fn applied_from_row(row: &PgRow, operation: &str) -> Result<StockChange, StoreError> {
    let decode = |e| StoreError::Backend(format!("failed to decode row in {operation}: {e}"));
    let price: i64 = row.try_get("price").map_err(decode)?;
    let stock: i64 = row.try_get("stock").map_err(decode)?;
    Ok(StockChange::Applied {
        unit_price: Money::from_cents(price as u64),
        stock,
    })
}

fn order_from_parts(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    Ok(Order {
        id: OrderId::from_uuid(row.id),
        user_id: UserId::from_uuid(row.user_id),
        status: parse_order_status(&row.status)?,
        total: Money::from_cents(row.total as u64),
        created_at: row.created_at,
        items,
    })
}

fn parse_order_status(raw: &str) -> Result<OrderStatus, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("unrecognized order status '{raw}' in storage")))
}

fn parse_shipment_status(raw: &str) -> Result<ShipmentStatus, StoreError> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("unrecognized shipment status '{raw}' in storage")))
}

// SQLx row types

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price: i64,
    stock: i64,
    image_url: Option<String>,
    category_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            stock: row.try_get("stock")?,
            image_url: row.try_get("image_url")?,
            category_id: row.try_get("category_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price as u64),
            stock: row.stock,
            image_url: row.image_url,
            category_id: row.category_id.map(CategoryId::from_uuid),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: Uuid,
    name: String,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    status: String,
    total: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for OrderRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            status: row.try_get("status")?,
            total: row.try_get("total")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

#[derive(Debug)]
struct OrderItemRow {
    order_id: Uuid,
    line_no: i32,
    product_id: Uuid,
    quantity: i64,
    unit_price: i64,
}

impl<'r> FromRow<'r, PgRow> for OrderItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(OrderItemRow {
            order_id: row.try_get("order_id")?,
            line_no: row.try_get("line_no")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            unit_price: row.try_get("unit_price")?,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            line_no: row.line_no as u32,
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price as u64),
        }
    }
}

#[derive(Debug)]
struct ShipmentRow {
    order_id: Uuid,
    carrier: String,
    tracking_number: String,
    status: String,
    shipped_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ShipmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ShipmentRow {
            order_id: row.try_get("order_id")?,
            carrier: row.try_get("carrier")?,
            tracking_number: row.try_get("tracking_number")?,
            status: row.try_get("status")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = StoreError;

    fn try_from(row: ShipmentRow) -> Result<Self, StoreError> {
        Ok(Shipment {
            order_id: OrderId::from_uuid(row.order_id),
            carrier: row.carrier,
            tracking_number: row.tracking_number,
            status: parse_shipment_status(&row.status)?,
            shipped_at: row.shipped_at,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct ReceiptRow {
    order_id: Uuid,
    pdf_url: String,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ReceiptRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ReceiptRow {
            order_id: row.try_get("order_id")?,
            pdf_url: row.try_get("pdf_url")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<ReceiptRow> for Receipt {
    fn from(row: ReceiptRow) -> Self {
        Receipt {
            order_id: OrderId::from_uuid(row.order_id),
            pdf_url: row.pdf_url,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct CartItemRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i64,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CartItemRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CartItemRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: CartItemId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            product_id: ProductId::from_uuid(row.product_id),
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_timeouts_map_to_timeout() {
        assert!(matches!(
            map_db_code("reserve_stock", "57014", "canceling statement due to statement timeout"),
            StoreError::Timeout
        ));
    }

    #[test]
    fn contention_aborts_are_retryable() {
        let deadlock = map_db_code("release_stock", "40P01", "deadlock detected");
        assert!(matches!(deadlock, StoreError::Unavailable(_)));
        assert!(deadlock.is_retryable());

        let serialization = map_db_code("commit", "40001", "could not serialize access");
        assert!(serialization.is_retryable());
    }

    #[test]
    fn constraint_violations_stay_non_retryable() {
        let duplicate = map_db_code("insert_order", "23505", "duplicate key value");
        assert!(matches!(duplicate, StoreError::Backend(_)));
        assert!(!duplicate.is_retryable());
    }
}
