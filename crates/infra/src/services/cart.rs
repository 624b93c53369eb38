//! Cart maintenance.
//!
//! The cart is a staging area with no stock semantics: nothing is reserved
//! until the cart's content is submitted as an order.

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use vexo_auth::AuthorizedCaller;
use vexo_cart::{ensure_quantity, CartItem, NewCartItem};
use vexo_catalog::Product;
use vexo_core::{CartItemId, DomainError};

use crate::store::{Store, StoreTxn};

use super::ServiceResult;

/// A cart line joined with the product it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEntry {
    pub item: CartItem,
    pub product: Product,
}

/// Maintains per-user carts.
#[derive(Debug, Clone)]
pub struct CartService<S: Store> {
    store: S,
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Add a product to the caller's cart.
    ///
    /// Adding a product that is already in the cart increments that line.
    #[instrument(skip(self, caller, new), fields(user_id = %caller.user_id, product_id = %new.product_id), err)]
    pub async fn add(&self, caller: &AuthorizedCaller, new: NewCartItem) -> ServiceResult<CartItem> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        if txn.product(new.product_id).await?.is_none() {
            return Err(DomainError::UnknownProduct(new.product_id).into());
        }
        let item = CartItem::create(caller.user_id, new, Utc::now());
        let stored = txn.add_cart_item(&item).await?;
        txn.commit().await?;

        Ok(stored)
    }

    /// The caller's cart, oldest line first.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id), err)]
    pub async fn list(&self, caller: &AuthorizedCaller) -> ServiceResult<Vec<CartEntry>> {
        let mut txn = self.store.begin().await?;
        let lines = txn.cart_for_user(caller.user_id).await?;
        txn.commit().await?;

        Ok(lines
            .into_iter()
            .map(|(item, product)| CartEntry { item, product })
            .collect())
    }

    /// Replace the quantity of one of the caller's cart lines.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id, item_id = %id), err)]
    pub async fn set_quantity(
        &self,
        caller: &AuthorizedCaller,
        id: CartItemId,
        quantity: i64,
    ) -> ServiceResult<CartItem> {
        ensure_quantity(quantity)?;

        let mut txn = self.store.begin().await?;
        let item = txn
            .set_cart_quantity(caller.user_id, id, quantity)
            .await?
            .ok_or_else(DomainError::not_found)?;
        txn.commit().await?;

        Ok(item)
    }

    /// Remove one of the caller's cart lines.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id, item_id = %id), err)]
    pub async fn remove(&self, caller: &AuthorizedCaller, id: CartItemId) -> ServiceResult<()> {
        let mut txn = self.store.begin().await?;
        if !txn.remove_cart_item(caller.user_id, id).await? {
            return Err(DomainError::not_found().into());
        }
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::ServiceError;
    use super::*;
    use crate::store::MemoryStore;
    use vexo_core::{Money, ProductId, UserId};

    async fn seed_product(store: &MemoryStore, cents: u64) -> ProductId {
        let product = Product {
            id: ProductId::new(),
            name: "widget".to_string(),
            description: None,
            price: Money::from_cents(cents),
            stock: 50,
            image_url: None,
            category_id: None,
            created_at: Utc::now(),
        };
        let mut txn = store.begin().await.unwrap();
        txn.insert_product(&product).await.unwrap();
        txn.commit().await.unwrap();
        product.id
    }

    #[tokio::test]
    async fn adding_the_same_product_twice_merges_lines() {
        let store = MemoryStore::with_default_timeout();
        let product_id = seed_product(&store, 500).await;
        let service = CartService::new(store);
        let caller = AuthorizedCaller::customer(UserId::new());

        service
            .add(&caller, NewCartItem { product_id, quantity: 1 })
            .await
            .unwrap();
        let merged = service
            .add(&caller, NewCartItem { product_id, quantity: 2 })
            .await
            .unwrap();
        assert_eq!(merged.quantity, 3);

        let cart = service.list(&caller).await.unwrap();
        assert_eq!(cart.len(), 1);
        assert_eq!(cart[0].item.quantity, 3);
        assert_eq!(cart[0].product.id, product_id);
    }

    #[tokio::test]
    async fn unknown_products_cannot_be_added() {
        let service = CartService::new(MemoryStore::with_default_timeout());
        let caller = AuthorizedCaller::customer(UserId::new());
        let ghost = ProductId::new();

        assert!(matches!(
            service
                .add(&caller, NewCartItem { product_id: ghost, quantity: 1 })
                .await
                .unwrap_err(),
            ServiceError::Domain(DomainError::UnknownProduct(id)) if id == ghost
        ));
    }

    #[tokio::test]
    async fn quantities_must_stay_positive() {
        let store = MemoryStore::with_default_timeout();
        let product_id = seed_product(&store, 500).await;
        let service = CartService::new(store);
        let caller = AuthorizedCaller::customer(UserId::new());

        assert!(matches!(
            service
                .add(&caller, NewCartItem { product_id, quantity: 0 })
                .await
                .unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));

        let item = service
            .add(&caller, NewCartItem { product_id, quantity: 1 })
            .await
            .unwrap();
        assert!(matches!(
            service.set_quantity(&caller, item.id, -1).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));

        let bumped = service.set_quantity(&caller, item.id, 5).await.unwrap();
        assert_eq!(bumped.quantity, 5);
    }

    #[tokio::test]
    async fn carts_are_private_per_user() {
        let store = MemoryStore::with_default_timeout();
        let product_id = seed_product(&store, 500).await;
        let service = CartService::new(store);
        let owner = AuthorizedCaller::customer(UserId::new());
        let stranger = AuthorizedCaller::customer(UserId::new());

        let item = service
            .add(&owner, NewCartItem { product_id, quantity: 2 })
            .await
            .unwrap();

        assert!(service.list(&stranger).await.unwrap().is_empty());
        assert!(matches!(
            service.set_quantity(&stranger, item.id, 1).await.unwrap_err(),
            ServiceError::Domain(DomainError::NotFound)
        ));
        assert!(matches!(
            service.remove(&stranger, item.id).await.unwrap_err(),
            ServiceError::Domain(DomainError::NotFound)
        ));

        // The owner's line is untouched by the failed attempts.
        assert_eq!(service.list(&owner).await.unwrap()[0].item.quantity, 2);
        service.remove(&owner, item.id).await.unwrap();
        assert!(service.list(&owner).await.unwrap().is_empty());
    }
}
