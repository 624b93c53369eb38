//! Request DTOs.
//!
//! Every body is parsed into one of these before it reaches a service, and
//! unknown fields are rejected rather than passed through. Responses
//! serialize the domain types directly.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use vexo_cart::NewCartItem;
use vexo_catalog::{NewCategory, NewProduct, ProductPatch};
use vexo_core::{CategoryId, Money, ProductId};
use vexo_fulfillment::{NewReceipt, NewShipment, ShipmentPatch, ShipmentStatus};
use vexo_orders::OrderLine;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl From<OrderLineRequest> for OrderLine {
    fn from(req: OrderLineRequest) -> Self {
        OrderLine {
            product_id: req.product_id,
            quantity: req.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateShipmentRequest {
    pub carrier: String,
    pub tracking_number: String,
}

impl From<CreateShipmentRequest> for NewShipment {
    fn from(req: CreateShipmentRequest) -> Self {
        NewShipment {
            carrier: req.carrier,
            tracking_number: req.tracking_number,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateShipmentRequest {
    pub status: Option<ShipmentStatus>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<UpdateShipmentRequest> for ShipmentPatch {
    fn from(req: UpdateShipmentRequest) -> Self {
        ShipmentPatch {
            status: req.status,
            shipped_at: req.shipped_at,
            delivered_at: req.delivered_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertReceiptRequest {
    pub pdf_url: String,
}

impl From<UpsertReceiptRequest> for NewReceipt {
    fn from(req: UpsertReceiptRequest) -> Self {
        NewReceipt {
            pdf_url: req.pdf_url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Unit price in smallest currency unit (e.g., cents).
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(req: CreateProductRequest) -> Self {
        NewProduct {
            name: req.name,
            description: req.description,
            price: req.price,
            stock: req.stock,
            image_url: req.image_url,
            category_id: req.category_id,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl From<UpdateProductRequest> for ProductPatch {
    fn from(req: UpdateProductRequest) -> Self {
        ProductPatch {
            name: req.name,
            description: req.description,
            price: req.price,
            image_url: req.image_url,
            category_id: req.category_id,
        }
    }
}

/// Signed stock correction; there is deliberately no absolute-stock write.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustStockRequest {
    pub delta: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryRequest {
    pub name: String,
}

impl From<CategoryRequest> for NewCategory {
    fn from(req: CategoryRequest) -> Self {
        NewCategory { name: req.name }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCartItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl From<AddCartItemRequest> for NewCartItem {
    fn from(req: AddCartItemRequest) -> Self {
        NewCartItem {
            product_id: req.product_id,
            quantity: req.quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetCartQuantityRequest {
    pub quantity: i64,
}
