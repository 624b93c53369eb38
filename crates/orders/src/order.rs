use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vexo_core::{DomainError, DomainResult, Entity, Money, OrderId, ProductId, UserId};

use crate::status::OrderStatus;

/// Requested order line: product and quantity, priced later.
///
/// The unit price is deliberately absent here. It is snapshotted by the
/// inventory ledger at the moment the stock reservation succeeds, so a price
/// change between request and reservation can never skew the total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Persisted order line with its price snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents), captured at reservation
    /// time and never recomputed.
    pub unit_price: Money,
}

/// An order together with its lines.
///
/// Created in `pending` status with all stock already reserved; content is
/// immutable once the status reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Money,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Assemble a freshly placed order from priced items.
    pub fn pending(
        user_id: UserId,
        items: Vec<OrderItem>,
        total: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            user_id,
            status: OrderStatus::Pending,
            total,
            created_at: now,
            items,
        }
    }

    pub fn is_cancelable(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Validate requested lines before any storage work happens.
pub fn validate_lines(lines: &[OrderLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("order must have at least one line"));
    }
    for (idx, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(DomainError::validation(format!(
                "line {}: quantity must be positive",
                idx + 1
            )));
        }
    }
    Ok(())
}

/// Sum of `unit_price * quantity` over all items, in checked fixed-point
/// arithmetic. Overflow is reported as a validation failure, never a wrap.
pub fn order_total(items: &[OrderItem]) -> DomainResult<Money> {
    let mut total = Money::ZERO;
    for item in items {
        let line_total = item
            .unit_price
            .checked_mul(item.quantity as u64)
            .ok_or_else(|| DomainError::validation("order total out of range"))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| DomainError::validation("order total out of range"))?;
    }
    Ok(total)
}
