//! Use-case services over a [`Store`](crate::store::Store).
//!
//! Each service owns one slice of the storefront (orders, shipments, catalog,
//! carts, receipts, dashboard figures) and is generic over the store, so the
//! same logic runs against the in-memory backend in tests and Postgres in
//! production. Services receive an already authenticated
//! [`AuthorizedCaller`](vexo_auth::AuthorizedCaller) and enforce ownership and
//! role rules themselves; the HTTP layer never pre-filters on their behalf.

mod cart;
mod catalog;
mod orders;
mod receipts;
mod shipments;
mod stats;

pub use cart::{CartEntry, CartService};
pub use catalog::CatalogService;
pub use orders::{OrderDetails, OrderService};
pub use receipts::ReceiptService;
pub use shipments::ShipmentService;
pub use stats::{StatsService, StoreStats, LOW_STOCK_THRESHOLD};

use thiserror::Error;

use vexo_core::DomainError;

use crate::ledger::LedgerError;
use crate::store::StoreError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service-level error: either the domain refused, or storage failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for ServiceError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::UnknownProduct(id) => ServiceError::Domain(DomainError::UnknownProduct(id)),
            LedgerError::InsufficientStock(id) => {
                ServiceError::Domain(DomainError::InsufficientStock(id))
            }
            LedgerError::Validation(msg) => ServiceError::Domain(DomainError::Validation(msg)),
            LedgerError::Store(e) => ServiceError::Store(e),
        }
    }
}
