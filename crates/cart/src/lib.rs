//! `vexo-cart` — per-user cart lines.
//!
//! A cart is a shopping intent, not a reservation: it never touches stock.
//! Stock is only reserved when the cart's content is placed as an order.

pub mod item;

pub use item::{ensure_quantity, CartItem, NewCartItem};
