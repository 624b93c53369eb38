//! Transactional storage boundary.
//!
//! This module defines an infrastructure-facing abstraction for reading and
//! writing storefront state inside bounded, all-or-nothing transactions,
//! without making any storage assumptions.

pub mod memory;
pub mod postgres;
pub mod r#trait;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use r#trait::{CategoryWrite, SalesSummary, StockChange, Store, StoreError, StoreTxn};
