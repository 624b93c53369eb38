//! `vexo-fulfillment` — shipment and receipt domain types.
//!
//! Both are keyed by the order they belong to (one shipment, one receipt per
//! order). Creating a shipment is what moves an order to `shipped`; nothing a
//! shipment does afterwards ever writes back into the order's status.

pub mod receipt;
pub mod shipment;

pub use receipt::{NewReceipt, Receipt};
pub use shipment::{NewShipment, Shipment, ShipmentPatch, ShipmentStatus};
