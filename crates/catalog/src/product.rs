use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vexo_core::{CategoryId, DomainError, DomainResult, Entity, Money, ProductId};

/// A sellable product.
///
/// `stock` is the single source of truth for availability: an in-flight order
/// is represented by the decrement itself, not by a separate reservation
/// record. The storage layer guarantees `stock >= 0` under any interleaving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Unit price in smallest currency unit (e.g., cents).
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Materialize a validated [`NewProduct`] into a product entity.
    pub fn create(new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            price: new.price,
            stock: new.stock,
            image_url: new.image_url,
            category_id: new.category_id,
            created_at: now,
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub stock: i64,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl NewProduct {
    pub fn validate(&self) -> DomainResult<()> {
        ensure_name(&self.name)?;
        if self.price.is_zero() {
            return Err(DomainError::validation("price must be positive"));
        }
        if self.stock < 0 {
            return Err(DomainError::validation("stock cannot be negative"));
        }
        if let Some(url) = &self.image_url {
            ensure_http_url(url, "image_url")?;
        }
        Ok(())
    }
}

/// Partial update of product attributes.
///
/// Deliberately has no `stock` field: stock changes are deltas applied through
/// the inventory ledger so they compose with concurrent reservations instead
/// of overwriting them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub image_url: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.category_id.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = &self.name {
            ensure_name(name)?;
        }
        if let Some(price) = &self.price {
            if price.is_zero() {
                return Err(DomainError::validation("price must be positive"));
            }
        }
        if let Some(url) = &self.image_url {
            ensure_http_url(url, "image_url")?;
        }
        Ok(())
    }

    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(url) = &self.image_url {
            product.image_url = Some(url.clone());
        }
        if let Some(category_id) = self.category_id {
            product.category_id = Some(category_id);
        }
    }
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}

pub(crate) fn ensure_http_url(url: &str, field: &str) -> DomainResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(DomainError::validation(format!(
            "{field} must be an http(s) URL"
        )))
    }
}
