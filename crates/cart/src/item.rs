use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vexo_core::{CartItemId, DomainError, DomainResult, Entity, ProductId, UserId};

/// One product in a user's cart.
///
/// A user has at most one cart line per product; adding the same product again
/// increments the existing line's quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    pub fn create(user_id: UserId, new: NewCartItem, now: DateTime<Utc>) -> Self {
        Self {
            id: CartItemId::new(),
            user_id,
            product_id: new.product_id,
            quantity: new.quantity,
            created_at: now,
        }
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for adding a product to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl NewCartItem {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_quantity(self.quantity)
    }
}

/// Shared quantity rule for adding and for updating a line.
pub fn ensure_quantity(quantity: i64) -> DomainResult<()> {
    if quantity <= 0 {
        return Err(DomainError::validation("quantity must be positive"));
    }
    Ok(())
}
