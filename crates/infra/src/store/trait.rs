use async_trait::async_trait;
use thiserror::Error;

use vexo_cart::CartItem;
use vexo_catalog::{Category, Product};
use vexo_core::{CartItemId, CategoryId, Money, OrderId, ProductId, UserId};
use vexo_fulfillment::{Receipt, Shipment};
use vexo_orders::{Order, OrderStatus};

/// Storage operation error.
///
/// This enum represents errors raised by the storage layer itself, as opposed to
/// domain errors (validation, invariants). Callers use `is_retryable()` to decide
/// whether a failed request may be safely retried.
///
/// ## Error Categories
///
/// - **Timeout**: A transaction exceeded its time budget. The transaction was
///   rolled back and left no partial writes behind.
/// - **Unavailable**: The backend could not be reached (pool exhausted, closed,
///   network failure).
/// - **Backend**: The backend rejected an operation or returned data the store
///   could not interpret.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transaction timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Whether a caller may retry the failed request.
    ///
    /// Timeouts and availability failures leave the data unchanged, so the same
    /// request can be submitted again. Backend errors are not retried blindly.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Unavailable(_))
    }
}

/// Outcome of a conditional stock mutation.
///
/// Stock changes are applied with a single conditional write, so the outcome is
/// decided by the store, not by a read the caller did earlier. `Applied` carries
/// the unit price observed in the same write, which is what order lines snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// The mutation was applied. `stock` is the level after the change.
    Applied { unit_price: Money, stock: i64 },
    /// The product exists but does not have enough stock for the request.
    Insufficient,
    /// No product with the given id exists.
    NotFound,
}

/// Outcome of a category rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryWrite {
    Applied,
    /// Another category already uses the requested name.
    DuplicateName,
    NotFound,
}

/// Aggregate order figures for the storefront dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SalesSummary {
    /// Orders ever placed, regardless of status.
    pub orders: u64,
    /// Sum of order totals across all orders.
    pub revenue: Money,
    /// Distinct users that have placed at least one order.
    pub customers: u64,
}

/// Transactional storage boundary for the storefront.
///
/// A `Store` hands out transactions; every read and write goes through a
/// [`StoreTxn`]. This keeps multi-step operations (reserve stock for each line,
/// then persist the order) atomic without the store knowing anything about the
/// shape of those operations.
///
/// ## Design Principles
///
/// - **No storage assumptions**: Works with an in-memory implementation
///   (tests/dev) and a PostgreSQL backend (production).
/// - **All-or-nothing**: A transaction that is dropped without `commit()` must
///   leave the store exactly as `begin()` found it.
/// - **Bounded**: `begin()` attaches a time budget. A transaction that cannot
///   make progress within it fails with `StoreError::Timeout` instead of
///   holding its locks indefinitely.
#[async_trait]
pub trait Store: Clone + Send + Sync + 'static {
    type Txn: StoreTxn + Send;

    /// Open a transaction.
    ///
    /// Returns `StoreError::Timeout` if the store cannot grant one within the
    /// configured budget.
    async fn begin(&self) -> Result<Self::Txn, StoreError>;
}

/// A single open transaction.
///
/// All methods observe writes made earlier in the same transaction. Nothing is
/// visible to other transactions until `commit()` returns `Ok`.
///
/// ## Rollback
///
/// Dropping a transaction without committing rolls it back. Error paths simply
/// propagate with `?` and let the drop undo any partial writes.
///
/// ## Conditional Writes
///
/// Mutations that race with other transactions are conditional and report their
/// outcome in the return value instead of relying on a prior read:
///
/// - `reserve_stock` / `adjust_stock` return [`StockChange`]
/// - `transition_order` returns whether the expected current status matched
/// - `insert_shipment` returns whether the order was still unshipped
#[async_trait]
pub trait StoreTxn {
    // --- products ---

    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError>;

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Overwrite the descriptive fields of an existing product.
    ///
    /// Stock is never written through this method. Returns `false` if the
    /// product does not exist.
    async fn update_product(&mut self, product: &Product) -> Result<bool, StoreError>;

    async fn products_below_stock(&mut self, threshold: i64) -> Result<Vec<Product>, StoreError>;

    /// Atomically subtract `quantity` from a product's stock, failing the
    /// subtraction (not the transaction) if stock would go negative.
    ///
    /// `quantity` must be positive; callers validate before reaching the store.
    async fn reserve_stock(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockChange, StoreError>;

    /// Return previously reserved units to a product's stock.
    ///
    /// Returns `false` if the product does not exist.
    async fn release_stock(&mut self, id: ProductId, quantity: i64) -> Result<bool, StoreError>;

    /// Apply a signed stock correction, refusing to cross below zero.
    async fn adjust_stock(&mut self, id: ProductId, delta: i64)
        -> Result<StockChange, StoreError>;

    // --- categories ---

    /// Insert a category. Returns `false` if the name is already taken.
    async fn insert_category(&mut self, category: &Category) -> Result<bool, StoreError>;

    async fn category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    async fn categories(&mut self) -> Result<Vec<Category>, StoreError>;

    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> Result<CategoryWrite, StoreError>;

    /// Delete a category, detaching any products that reference it.
    ///
    /// Returns `false` if the category does not exist.
    async fn delete_category(&mut self, id: CategoryId) -> Result<bool, StoreError>;

    // --- orders ---

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// List orders, newest first. `owner` restricts the list to one user.
    async fn orders(&mut self, owner: Option<UserId>) -> Result<Vec<Order>, StoreError>;

    /// Move an order from `from` to `to` only if it is still in `from`.
    ///
    /// Returns `false` when the order is missing or no longer in `from`; the
    /// caller decides which of those it is by reading the order.
    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError>;

    async fn sales_summary(&mut self) -> Result<SalesSummary, StoreError>;

    // --- shipments ---

    /// Insert a shipment. Returns `false` if the order already has one.
    async fn insert_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError>;

    async fn shipment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Shipment>, StoreError>;

    /// Overwrite an existing shipment. Returns `false` if the order has none.
    async fn update_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError>;

    // --- receipts ---

    /// Insert or replace the receipt for an order.
    ///
    /// An order has at most one receipt; repeating the write with a new URL
    /// replaces the previous one.
    async fn upsert_receipt(&mut self, receipt: &Receipt) -> Result<(), StoreError>;

    async fn receipt_for_order(&mut self, order_id: OrderId)
        -> Result<Option<Receipt>, StoreError>;

    // --- cart ---

    /// Add an item to a user's cart.
    ///
    /// If the user already has a line for the same product, its quantity is
    /// incremented instead of inserting a second line. Returns the stored line.
    async fn add_cart_item(&mut self, item: &CartItem) -> Result<CartItem, StoreError>;

    /// A user's cart lines joined with their products, oldest first.
    async fn cart_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(CartItem, Product)>, StoreError>;

    /// Replace the quantity of one of `user_id`'s cart lines.
    ///
    /// Returns `None` if the line does not exist or belongs to another user.
    async fn set_cart_quantity(
        &mut self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<Option<CartItem>, StoreError>;

    /// Remove one of `user_id`'s cart lines.
    ///
    /// Returns `false` if the line does not exist or belongs to another user.
    async fn remove_cart_item(&mut self, user_id: UserId, id: CartItemId)
        -> Result<bool, StoreError>;

    // --- lifecycle ---

    /// Make every write in this transaction durable and visible.
    async fn commit(self) -> Result<(), StoreError>;
}
