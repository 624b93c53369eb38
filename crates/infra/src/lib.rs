//! Infrastructure layer: transactional storage, stock ledger, use-case services.

pub mod ledger;
pub mod services;
pub mod store;

pub use ledger::LedgerError;
pub use services::{
    CartEntry, CartService, CatalogService, OrderDetails, OrderService, ReceiptService,
    ServiceError, ServiceResult, ShipmentService, StatsService, StoreStats, LOW_STOCK_THRESHOLD,
};
pub use store::{MemoryStore, PgStore, StockChange, Store, StoreError, StoreTxn};
