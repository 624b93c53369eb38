//! `vexo-catalog` — product and category domain types.
//!
//! Pure types and validation only. Stock arithmetic never happens here: all
//! stock movement goes through the inventory ledger so it stays atomic with
//! the orders that cause it.

pub mod category;
pub mod product;

pub use category::{Category, NewCategory};
pub use product::{NewProduct, Product, ProductPatch};
