//! Receipt issuing and lookup.

use chrono::Utc;
use tracing::instrument;

use vexo_auth::AuthorizedCaller;
use vexo_core::{DomainError, OrderId};
use vexo_fulfillment::{NewReceipt, Receipt};

use crate::store::{Store, StoreTxn};

use super::ServiceResult;

/// Issues receipts and serves them back to order owners.
#[derive(Debug, Clone)]
pub struct ReceiptService<S: Store> {
    store: S,
}

impl<S: Store> ReceiptService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Attach a receipt document to an order.
    ///
    /// Issuing is idempotent per order: a repeat replaces the stored URL and
    /// refreshes the issue time instead of failing or duplicating.
    #[instrument(skip(self, new), fields(order_id = %order_id), err)]
    pub async fn upsert(&self, order_id: OrderId, new: NewReceipt) -> ServiceResult<Receipt> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        if txn.order(order_id).await?.is_none() {
            return Err(DomainError::not_found().into());
        }
        let receipt = Receipt {
            order_id,
            pdf_url: new.pdf_url,
            created_at: Utc::now(),
        };
        txn.upsert_receipt(&receipt).await?;
        txn.commit().await?;

        Ok(receipt)
    }

    /// The receipt of an order the caller may act on.
    #[instrument(skip(self, caller), fields(order_id = %order_id, user_id = %caller.user_id), err)]
    pub async fn get(&self, caller: &AuthorizedCaller, order_id: OrderId) -> ServiceResult<Receipt> {
        let mut txn = self.store.begin().await?;
        let order = txn.order(order_id).await?.ok_or_else(DomainError::not_found)?;
        if !caller.may_act_on(order.user_id) {
            return Err(DomainError::not_found().into());
        }
        let receipt = txn
            .receipt_for_order(order_id)
            .await?
            .ok_or_else(DomainError::not_found)?;
        txn.commit().await?;

        Ok(receipt)
    }
}
