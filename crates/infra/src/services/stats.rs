//! Storefront dashboard figures.

use serde::Serialize;
use tracing::instrument;

use vexo_catalog::Product;
use vexo_core::Money;

use crate::store::{Store, StoreTxn};

use super::ServiceResult;

/// Products with less stock than this are flagged on the dashboard.
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// One consistent snapshot of the dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_orders: u64,
    pub total_revenue: Money,
    pub total_customers: u64,
    /// Products under [`LOW_STOCK_THRESHOLD`], lowest stock first.
    pub low_stock: Vec<Product>,
}

/// Serves the admin dashboard.
#[derive(Debug, Clone)]
pub struct StatsService<S: Store> {
    store: S,
}

impl<S: Store> StatsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Order counts, revenue, distinct customers and the low-stock list,
    /// all read inside one transaction.
    #[instrument(skip(self), err)]
    pub async fn overview(&self) -> ServiceResult<StoreStats> {
        let mut txn = self.store.begin().await?;
        let summary = txn.sales_summary().await?;
        let low_stock = txn.products_below_stock(LOW_STOCK_THRESHOLD).await?;
        txn.commit().await?;

        Ok(StoreStats {
            total_orders: summary.orders,
            total_revenue: summary.revenue,
            total_customers: summary.customers,
            low_stock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;
    use vexo_core::{ProductId, UserId};
    use vexo_orders::{Order, OrderStatus};

    async fn seed_product(store: &MemoryStore, name: &str, stock: i64) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            name: name.to_string(),
            description: None,
            price: Money::from_cents(1000),
            stock,
            image_url: None,
            category_id: None,
            created_at: Utc::now(),
        };
        let mut txn = store.begin().await.unwrap();
        txn.insert_product(&product).await.unwrap();
        txn.commit().await.unwrap();
        product.id
    }

    async fn seed_order(store: &MemoryStore, user_id: UserId, cents: u64, status: OrderStatus) {
        let mut order = Order::pending(user_id, vec![], Money::from_cents(cents), Utc::now());
        order.status = status;
        let mut txn = store.begin().await.unwrap();
        txn.insert_order(&order).await.unwrap();
        txn.commit().await.unwrap();
    }

    #[tokio::test]
    async fn an_empty_store_reports_zeroes() {
        let service = StatsService::new(MemoryStore::with_default_timeout());
        let stats = service.overview().await.unwrap();

        assert_eq!(stats.total_orders, 0);
        assert_eq!(stats.total_revenue, Money::ZERO);
        assert_eq!(stats.total_customers, 0);
        assert!(stats.low_stock.is_empty());
    }

    #[tokio::test]
    async fn counts_every_order_and_distinct_customers() {
        let store = MemoryStore::with_default_timeout();
        let repeat_buyer = UserId::new();
        seed_order(&store, repeat_buyer, 1000, OrderStatus::Pending).await;
        seed_order(&store, repeat_buyer, 2500, OrderStatus::Shipped).await;
        seed_order(&store, UserId::new(), 500, OrderStatus::Cancelled).await;

        let stats = StatsService::new(store).overview().await.unwrap();

        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_revenue, Money::from_cents(4000));
        assert_eq!(stats.total_customers, 2);
    }

    #[tokio::test]
    async fn flags_products_below_the_threshold_lowest_first() {
        let store = MemoryStore::with_default_timeout();
        seed_product(&store, "plenty", LOW_STOCK_THRESHOLD).await;
        let middling = seed_product(&store, "middling", 3).await;
        let scarce = seed_product(&store, "scarce", 0).await;

        let stats = StatsService::new(store).overview().await.unwrap();

        let flagged: Vec<ProductId> = stats.low_stock.iter().map(|p| p.id).collect();
        assert_eq!(flagged, vec![scarce, middling]);
    }
}
