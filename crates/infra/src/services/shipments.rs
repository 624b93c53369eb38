//! Shipment coordination.
//!
//! Creating a shipment is the one place where fulfillment reaches back into
//! the order lifecycle: the order moves `pending` to `shipped` in the same
//! transaction that records the shipment. After that the two run separately.
//! Carrier progress updates, including `delivered`, never write the order;
//! marking an order delivered is its own explicit transition.

use chrono::Utc;
use tracing::instrument;

use vexo_core::{DomainError, OrderId};
use vexo_fulfillment::{NewShipment, Shipment, ShipmentPatch};
use vexo_orders::OrderStatus;

use crate::store::{Store, StoreTxn};

use super::ServiceResult;

/// Creates shipments and records carrier progress.
#[derive(Debug, Clone)]
pub struct ShipmentService<S: Store> {
    store: S,
}

impl<S: Store> ShipmentService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Ship an order: record the shipment and mark the order `shipped`.
    ///
    /// Fails with a conflict if the order already has a shipment or is not
    /// `pending` anymore. Both writes are conditional and share one
    /// transaction, so a conflict leaves neither behind.
    #[instrument(skip(self, new), fields(order_id = %order_id), err)]
    pub async fn create(&self, order_id: OrderId, new: NewShipment) -> ServiceResult<Shipment> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        let order = txn.order(order_id).await?.ok_or_else(DomainError::not_found)?;

        let shipment = Shipment::create(order_id, new, Utc::now());
        if !txn.insert_shipment(&shipment).await? {
            return Err(DomainError::conflict("order already has a shipment").into());
        }
        if !txn
            .transition_order(order_id, OrderStatus::Pending, OrderStatus::Shipped)
            .await?
        {
            return Err(DomainError::conflict(format!(
                "order is {} and cannot be shipped",
                order.status
            ))
            .into());
        }
        txn.commit().await?;

        Ok(shipment)
    }

    /// Record carrier progress on an existing shipment.
    ///
    /// The order is not touched, whatever the new shipment status is.
    #[instrument(skip(self, patch), fields(order_id = %order_id), err)]
    pub async fn update(&self, order_id: OrderId, patch: ShipmentPatch) -> ServiceResult<Shipment> {
        patch.validate()?;

        let mut txn = self.store.begin().await?;
        let mut shipment = txn
            .shipment_for_order(order_id)
            .await?
            .ok_or_else(DomainError::not_found)?;
        patch.apply(&mut shipment);
        if !txn.update_shipment(&shipment).await? {
            return Err(DomainError::not_found().into());
        }
        txn.commit().await?;

        Ok(shipment)
    }
}

#[cfg(test)]
mod tests {
    use super::super::ServiceError;
    use super::*;
    use crate::store::MemoryStore;
    use vexo_core::{Money, UserId};
    use vexo_fulfillment::ShipmentStatus;
    use vexo_orders::Order;

    async fn seed_order(store: &MemoryStore, status: OrderStatus) -> OrderId {
        let mut order = Order::pending(UserId::new(), vec![], Money::from_cents(900), Utc::now());
        order.status = status;
        let mut txn = store.begin().await.unwrap();
        txn.insert_order(&order).await.unwrap();
        txn.commit().await.unwrap();
        order.id
    }

    async fn order_status(store: &MemoryStore, id: OrderId) -> OrderStatus {
        let mut txn = store.begin().await.unwrap();
        let status = txn.order(id).await.unwrap().unwrap().status;
        txn.commit().await.unwrap();
        status
    }

    fn test_new() -> NewShipment {
        NewShipment {
            carrier: "dhl".to_string(),
            tracking_number: "JD014600003GB".to_string(),
        }
    }

    #[tokio::test]
    async fn shipping_a_pending_order_records_the_shipment_and_marks_it_shipped() {
        let store = MemoryStore::with_default_timeout();
        let order_id = seed_order(&store, OrderStatus::Pending).await;
        let service = ShipmentService::new(store.clone());

        let shipment = service.create(order_id, test_new()).await.unwrap();

        assert_eq!(shipment.status, ShipmentStatus::LabelCreated);
        assert_eq!(order_status(&store, order_id).await, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn an_order_gets_at_most_one_shipment() {
        let store = MemoryStore::with_default_timeout();
        let order_id = seed_order(&store, OrderStatus::Pending).await;
        let service = ShipmentService::new(store.clone());

        service.create(order_id, test_new()).await.unwrap();
        let err = service.create(order_id, test_new()).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Conflict(_))
        ));
        assert_eq!(order_status(&store, order_id).await, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn a_cancelled_order_cannot_be_shipped_and_no_shipment_survives() {
        let store = MemoryStore::with_default_timeout();
        let order_id = seed_order(&store, OrderStatus::Cancelled).await;
        let service = ShipmentService::new(store.clone());

        let err = service.create(order_id, test_new()).await.unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Domain(DomainError::Conflict(_))
        ));

        // The shipment insert from the failed attempt must have rolled back.
        let mut txn = store.begin().await.unwrap();
        assert!(txn.shipment_for_order(order_id).await.unwrap().is_none());
        drop(txn);
        assert_eq!(order_status(&store, order_id).await, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn shipping_an_unknown_order_is_not_found() {
        let store = MemoryStore::with_default_timeout();
        let service = ShipmentService::new(store);

        assert!(matches!(
            service.create(OrderId::new(), test_new()).await.unwrap_err(),
            ServiceError::Domain(DomainError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delivery_updates_touch_the_shipment_but_never_the_order() {
        let store = MemoryStore::with_default_timeout();
        let order_id = seed_order(&store, OrderStatus::Pending).await;
        let service = ShipmentService::new(store.clone());
        service.create(order_id, test_new()).await.unwrap();

        let delivered_at = Utc::now();
        let shipment = service
            .update(
                order_id,
                ShipmentPatch {
                    status: Some(ShipmentStatus::Delivered),
                    delivered_at: Some(delivered_at),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(shipment.status, ShipmentStatus::Delivered);
        assert_eq!(shipment.delivered_at, Some(delivered_at));
        // The order stays shipped until its own transition is driven.
        assert_eq!(order_status(&store, order_id).await, OrderStatus::Shipped);
    }

    #[tokio::test]
    async fn updating_a_missing_shipment_is_not_found_and_empty_patches_are_rejected() {
        let store = MemoryStore::with_default_timeout();
        let order_id = seed_order(&store, OrderStatus::Pending).await;
        let service = ShipmentService::new(store.clone());

        assert!(matches!(
            service
                .update(
                    order_id,
                    ShipmentPatch {
                        status: Some(ShipmentStatus::InTransit),
                        ..Default::default()
                    }
                )
                .await
                .unwrap_err(),
            ServiceError::Domain(DomainError::NotFound)
        ));

        service.create(order_id, test_new()).await.unwrap();
        assert!(matches!(
            service.update(order_id, ShipmentPatch::default()).await.unwrap_err(),
            ServiceError::Domain(DomainError::Validation(_))
        ));
    }
}
