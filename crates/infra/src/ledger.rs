//! Stock ledger operations.
//!
//! Every change to a product's stock level goes through this module, inside a
//! transaction owned by the caller. That is what lets order placement reserve
//! several lines and persist the order as one atomic unit: the ledger never
//! begins or commits transactions itself.
//!
//! Reservation is conditional at the store. There is no read-check-write
//! window: the store subtracts only where enough stock remains, and reports
//! which way the write went. Two requests racing for the last unit are
//! serialized by the store, and exactly one of them gets it.

use thiserror::Error;
use tracing::instrument;

use vexo_core::{Money, ProductId};

use crate::store::{StockChange, StoreError, StoreTxn};

/// Stock ledger operation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    #[error("insufficient stock for product {0}")]
    InsufficientStock(ProductId),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Reserve `quantity` units of a product.
///
/// Returns the unit price observed by the same write that subtracted the
/// stock. Order lines snapshot this price, so a later catalog price change
/// never alters an already placed order.
#[instrument(skip(txn), fields(product_id = %product_id, quantity), err)]
pub async fn reserve<T: StoreTxn + Send>(
    txn: &mut T,
    product_id: ProductId,
    quantity: i64,
) -> Result<Money, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    match txn.reserve_stock(product_id, quantity).await? {
        StockChange::Applied { unit_price, .. } => Ok(unit_price),
        StockChange::Insufficient => Err(LedgerError::InsufficientStock(product_id)),
        StockChange::NotFound => Err(LedgerError::UnknownProduct(product_id)),
    }
}

/// Return previously reserved units to a product's stock.
#[instrument(skip(txn), fields(product_id = %product_id, quantity), err)]
pub async fn release<T: StoreTxn + Send>(
    txn: &mut T,
    product_id: ProductId,
    quantity: i64,
) -> Result<(), LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::Validation(
            "quantity must be positive".to_string(),
        ));
    }
    if txn.release_stock(product_id, quantity).await? {
        Ok(())
    } else {
        Err(LedgerError::UnknownProduct(product_id))
    }
}

/// Largest stock movement a single correction may apply.
///
/// Also keeps `stock + delta` far from the integer edge, so the stores can
/// evaluate the conditional update without wrapping.
pub const MAX_ADJUSTMENT: i64 = 1_000_000;

/// Apply a signed stock correction and return the resulting level.
///
/// Corrections may add or remove stock but may not cross below zero, and a
/// zero delta is rejected rather than silently applied.
#[instrument(skip(txn), fields(product_id = %product_id, delta), err)]
pub async fn adjust<T: StoreTxn + Send>(
    txn: &mut T,
    product_id: ProductId,
    delta: i64,
) -> Result<i64, LedgerError> {
    if delta == 0 {
        return Err(LedgerError::Validation("delta cannot be zero".to_string()));
    }
    if delta.unsigned_abs() > MAX_ADJUSTMENT as u64 {
        return Err(LedgerError::Validation(format!(
            "delta magnitude cannot exceed {MAX_ADJUSTMENT}"
        )));
    }
    match txn.adjust_stock(product_id, delta).await? {
        StockChange::Applied { stock, .. } => Ok(stock),
        StockChange::Insufficient => Err(LedgerError::InsufficientStock(product_id)),
        StockChange::NotFound => Err(LedgerError::UnknownProduct(product_id)),
    }
}
