use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use vexo_cart::CartItem;
use vexo_catalog::{Category, Product};
use vexo_core::{CartItemId, CategoryId, Money, OrderId, ProductId, UserId};
use vexo_fulfillment::{Receipt, Shipment};
use vexo_orders::{Order, OrderStatus};

use super::r#trait::{
    CategoryWrite, SalesSummary, StockChange, Store, StoreError, StoreTxn,
};

#[derive(Debug, Default, Clone)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    categories: HashMap<CategoryId, Category>,
    orders: HashMap<OrderId, Order>,
    shipments: HashMap<OrderId, Shipment>,
    receipts: HashMap<OrderId, Receipt>,
    cart_items: HashMap<CartItemId, CartItem>,
}

/// In-memory transactional store.
///
/// Intended for tests/dev. The whole store sits behind one async mutex, so
/// transactions are fully serialized; `begin()` waits for the lock within the
/// configured budget and fails with `StoreError::Timeout` past it. This gives
/// the same externally observable behavior as the PostgreSQL backend (bounded
/// waiting, atomic commit, rollback on drop) without any tuning ambitions.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    txn_timeout: Duration,
}

impl MemoryStore {
    pub fn new(txn_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            txn_timeout,
        }
    }

    /// A store with a generous budget, for tests that never contend.
    pub fn with_default_timeout() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// An open transaction over a [`MemoryStore`].
///
/// Holds the store lock for its whole lifetime. A snapshot of the state taken
/// at `begin()` is written back on drop unless `commit()` ran, which is what
/// makes error paths leave no partial writes behind.
#[derive(Debug)]
pub struct MemoryTxn {
    guard: OwnedMutexGuard<MemoryState>,
    snapshot: Option<MemoryState>,
}

impl Drop for MemoryTxn {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    type Txn = MemoryTxn;

    async fn begin(&self) -> Result<MemoryTxn, StoreError> {
        let guard = tokio::time::timeout(self.txn_timeout, self.state.clone().lock_owned())
            .await
            .map_err(|_| StoreError::Timeout)?;
        let snapshot = Some(guard.clone());
        Ok(MemoryTxn { guard, snapshot })
    }
}

#[async_trait]
impl StoreTxn for MemoryTxn {
    async fn insert_product(&mut self, product: &Product) -> Result<(), StoreError> {
        self.guard.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn product(&mut self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.guard.products.get(&id).cloned())
    }

    async fn update_product(&mut self, product: &Product) -> Result<bool, StoreError> {
        match self.guard.products.get_mut(&product.id) {
            Some(existing) => {
                // Stock stays whatever the ledger last made it.
                let stock = existing.stock;
                *existing = product.clone();
                existing.stock = stock;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn products_below_stock(&mut self, threshold: i64) -> Result<Vec<Product>, StoreError> {
        let mut low: Vec<Product> = self
            .guard
            .products
            .values()
            .filter(|p| p.stock < threshold)
            .cloned()
            .collect();
        low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.name.cmp(&b.name)));
        Ok(low)
    }

    async fn reserve_stock(
        &mut self,
        id: ProductId,
        quantity: i64,
    ) -> Result<StockChange, StoreError> {
        match self.guard.products.get_mut(&id) {
            None => Ok(StockChange::NotFound),
            Some(product) if product.stock < quantity => Ok(StockChange::Insufficient),
            Some(product) => {
                product.stock -= quantity;
                Ok(StockChange::Applied {
                    unit_price: product.price,
                    stock: product.stock,
                })
            }
        }
    }

    async fn release_stock(&mut self, id: ProductId, quantity: i64) -> Result<bool, StoreError> {
        match self.guard.products.get_mut(&id) {
            None => Ok(false),
            Some(product) => {
                product.stock = product
                    .stock
                    .checked_add(quantity)
                    .ok_or_else(|| StoreError::Backend("stock level out of range".to_string()))?;
                Ok(true)
            }
        }
    }

    async fn adjust_stock(
        &mut self,
        id: ProductId,
        delta: i64,
    ) -> Result<StockChange, StoreError> {
        match self.guard.products.get_mut(&id) {
            None => Ok(StockChange::NotFound),
            Some(product) => match product.stock.checked_add(delta) {
                Some(next) if next >= 0 => {
                    product.stock = next;
                    Ok(StockChange::Applied {
                        unit_price: product.price,
                        stock: next,
                    })
                }
                // Below zero or past i64::MAX: no such stock level exists.
                _ => Ok(StockChange::Insufficient),
            },
        }
    }

    async fn insert_category(&mut self, category: &Category) -> Result<bool, StoreError> {
        let taken = self
            .guard
            .categories
            .values()
            .any(|c| c.name == category.name);
        if taken {
            return Ok(false);
        }
        self.guard.categories.insert(category.id, category.clone());
        Ok(true)
    }

    async fn category(&mut self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self.guard.categories.get(&id).cloned())
    }

    async fn categories(&mut self) -> Result<Vec<Category>, StoreError> {
        let mut all: Vec<Category> = self.guard.categories.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn rename_category(
        &mut self,
        id: CategoryId,
        name: &str,
    ) -> Result<CategoryWrite, StoreError> {
        if !self.guard.categories.contains_key(&id) {
            return Ok(CategoryWrite::NotFound);
        }
        let taken = self
            .guard
            .categories
            .values()
            .any(|c| c.id != id && c.name == name);
        if taken {
            return Ok(CategoryWrite::DuplicateName);
        }
        if let Some(category) = self.guard.categories.get_mut(&id) {
            category.name = name.to_string();
        }
        Ok(CategoryWrite::Applied)
    }

    async fn delete_category(&mut self, id: CategoryId) -> Result<bool, StoreError> {
        if self.guard.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for product in self.guard.products.values_mut() {
            if product.category_id == Some(id) {
                product.category_id = None;
            }
        }
        Ok(true)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        self.guard.orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.guard.orders.get(&id).cloned())
    }

    async fn orders(&mut self, owner: Option<UserId>) -> Result<Vec<Order>, StoreError> {
        let mut listed: Vec<Order> = self
            .guard
            .orders
            .values()
            .filter(|o| owner.is_none_or(|u| o.user_id == u))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn transition_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<bool, StoreError> {
        match self.guard.orders.get_mut(&id) {
            Some(order) if order.status == from => {
                order.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn sales_summary(&mut self) -> Result<SalesSummary, StoreError> {
        let mut revenue = Money::ZERO;
        let mut customers = HashSet::new();
        for order in self.guard.orders.values() {
            revenue = revenue
                .checked_add(order.total)
                .ok_or_else(|| StoreError::Backend("revenue sum out of range".to_string()))?;
            customers.insert(order.user_id);
        }
        Ok(SalesSummary {
            orders: self.guard.orders.len() as u64,
            revenue,
            customers: customers.len() as u64,
        })
    }

    async fn insert_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError> {
        if self.guard.shipments.contains_key(&shipment.order_id) {
            return Ok(false);
        }
        self.guard
            .shipments
            .insert(shipment.order_id, shipment.clone());
        Ok(true)
    }

    async fn shipment_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Shipment>, StoreError> {
        Ok(self.guard.shipments.get(&order_id).cloned())
    }

    async fn update_shipment(&mut self, shipment: &Shipment) -> Result<bool, StoreError> {
        match self.guard.shipments.get_mut(&shipment.order_id) {
            Some(existing) => {
                *existing = shipment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_receipt(&mut self, receipt: &Receipt) -> Result<(), StoreError> {
        self.guard.receipts.insert(receipt.order_id, receipt.clone());
        Ok(())
    }

    async fn receipt_for_order(
        &mut self,
        order_id: OrderId,
    ) -> Result<Option<Receipt>, StoreError> {
        Ok(self.guard.receipts.get(&order_id).cloned())
    }

    async fn add_cart_item(&mut self, item: &CartItem) -> Result<CartItem, StoreError> {
        let merged = self
            .guard
            .cart_items
            .values_mut()
            .find(|existing| {
                existing.user_id == item.user_id && existing.product_id == item.product_id
            })
            .map(|existing| {
                existing.quantity += item.quantity;
                existing.clone()
            });
        if let Some(line) = merged {
            return Ok(line);
        }
        self.guard.cart_items.insert(item.id, item.clone());
        Ok(item.clone())
    }

    async fn cart_for_user(
        &mut self,
        user_id: UserId,
    ) -> Result<Vec<(CartItem, Product)>, StoreError> {
        let mut lines: Vec<CartItem> = self
            .guard
            .cart_items
            .values()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        lines.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let mut joined = Vec::with_capacity(lines.len());
        for line in lines {
            let product = self.guard.products.get(&line.product_id).cloned().ok_or_else(|| {
                StoreError::Backend(format!("cart line {} references a missing product", line.id))
            })?;
            joined.push((line, product));
        }
        Ok(joined)
    }

    async fn set_cart_quantity(
        &mut self,
        user_id: UserId,
        id: CartItemId,
        quantity: i64,
    ) -> Result<Option<CartItem>, StoreError> {
        match self.guard.cart_items.get_mut(&id) {
            Some(item) if item.user_id == user_id => {
                item.quantity = quantity;
                Ok(Some(item.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn remove_cart_item(
        &mut self,
        user_id: UserId,
        id: CartItemId,
    ) -> Result<bool, StoreError> {
        match self.guard.cart_items.get(&id) {
            Some(item) if item.user_id == user_id => {
                self.guard.cart_items.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }
}
