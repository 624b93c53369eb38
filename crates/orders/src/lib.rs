//! `vexo-orders` — the order aggregate and its lifecycle rules.
//!
//! Pure domain: line validation, total computation, and the status state
//! machine. Persisting an order and reserving its stock atomically is the
//! storage layer's job; the rule table here decides which transitions that
//! layer is allowed to apply.

pub mod order;
pub mod status;

pub use order::{order_total, validate_lines, Order, OrderItem, OrderLine};
pub use status::OrderStatus;
