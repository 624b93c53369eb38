//! Order placement and lifecycle.

use chrono::Utc;
use serde::Serialize;
use tracing::instrument;

use vexo_auth::AuthorizedCaller;
use vexo_core::{DomainError, OrderId};
use vexo_fulfillment::{Receipt, Shipment};
use vexo_orders::{order_total, validate_lines, Order, OrderItem, OrderLine, OrderStatus};

use crate::ledger;
use crate::store::{Store, StoreTxn};

use super::ServiceResult;

/// An order with whatever fulfillment state exists for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderDetails {
    pub order: Order,
    pub shipment: Option<Shipment>,
    pub receipt: Option<Receipt>,
}

/// Places orders and walks them through their lifecycle.
#[derive(Debug, Clone)]
pub struct OrderService<S: Store> {
    store: S,
}

impl<S: Store> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Place an order for the calling user.
    ///
    /// Every line is reserved through the ledger inside one transaction, so
    /// either all lines get their stock or none do. The total is computed from
    /// the unit prices the reservations snapshotted, not from a separate
    /// catalog read.
    #[instrument(skip(self, caller, lines), fields(user_id = %caller.user_id, lines = lines.len()), err)]
    pub async fn create(
        &self,
        caller: &AuthorizedCaller,
        lines: Vec<OrderLine>,
    ) -> ServiceResult<Order> {
        validate_lines(&lines)?;

        let mut txn = self.store.begin().await?;

        let mut items = Vec::with_capacity(lines.len());
        for (idx, line) in lines.iter().enumerate() {
            let unit_price = ledger::reserve(&mut txn, line.product_id, line.quantity).await?;
            items.push(OrderItem {
                line_no: idx as u32 + 1,
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            });
        }

        let total = order_total(&items)?;
        let order = Order::pending(caller.user_id, items, total, Utc::now());
        txn.insert_order(&order).await?;
        txn.commit().await?;

        Ok(order)
    }

    /// Orders visible to the caller, newest first.
    ///
    /// Admins see every order; customers see their own.
    #[instrument(skip(self, caller), fields(user_id = %caller.user_id), err)]
    pub async fn list(&self, caller: &AuthorizedCaller) -> ServiceResult<Vec<Order>> {
        let owner = if caller.is_admin() {
            None
        } else {
            Some(caller.user_id)
        };
        let mut txn = self.store.begin().await?;
        let orders = txn.orders(owner).await?;
        txn.commit().await?;
        Ok(orders)
    }

    /// One order with its shipment and receipt, if any.
    ///
    /// An order the caller may not act on answers `NotFound`, the same as an
    /// order that does not exist.
    #[instrument(skip(self, caller), fields(order_id = %id, user_id = %caller.user_id), err)]
    pub async fn get(&self, caller: &AuthorizedCaller, id: OrderId) -> ServiceResult<OrderDetails> {
        let mut txn = self.store.begin().await?;

        let order = txn.order(id).await?.ok_or_else(DomainError::not_found)?;
        if !caller.may_act_on(order.user_id) {
            return Err(DomainError::not_found().into());
        }
        let shipment = txn.shipment_for_order(id).await?;
        let receipt = txn.receipt_for_order(id).await?;
        txn.commit().await?;

        Ok(OrderDetails {
            order,
            shipment,
            receipt,
        })
    }

    /// Cancel a pending order and return its reserved stock.
    ///
    /// Only `pending` orders can be cancelled. The status change is a
    /// conditional write; if the order moved on concurrently, the whole
    /// operation fails with a conflict and no stock is released.
    #[instrument(skip(self, caller), fields(order_id = %id, user_id = %caller.user_id), err)]
    pub async fn cancel(&self, caller: &AuthorizedCaller, id: OrderId) -> ServiceResult<Order> {
        let mut txn = self.store.begin().await?;

        let order = txn.order(id).await?.ok_or_else(DomainError::not_found)?;
        if !caller.may_act_on(order.user_id) {
            return Err(DomainError::not_found().into());
        }
        if !order.is_cancelable() {
            return Err(DomainError::conflict("order is not cancelable").into());
        }
        if !txn
            .transition_order(id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await?
        {
            return Err(DomainError::conflict("order is not cancelable").into());
        }
        for item in &order.items {
            ledger::release(&mut txn, item.product_id, item.quantity).await?;
        }
        txn.commit().await?;

        Ok(Order {
            status: OrderStatus::Cancelled,
            ..order
        })
    }
}
