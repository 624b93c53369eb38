//! Catalog administration: products, categories, stock corrections.

use chrono::Utc;
use tracing::instrument;

use vexo_catalog::{Category, NewCategory, NewProduct, Product, ProductPatch};
use vexo_core::{CategoryId, DomainError, ProductId};

use crate::ledger;
use crate::store::{CategoryWrite, Store, StoreTxn};

use super::ServiceResult;

/// Maintains the product catalog.
///
/// Stock never moves through the product writes here. [`adjust_stock`] routes
/// corrections through the ledger so they compose with in-flight reservations
/// instead of overwriting them.
///
/// [`adjust_stock`]: CatalogService::adjust_stock
#[derive(Debug, Clone)]
pub struct CatalogService<S: Store> {
    store: S,
}

impl<S: Store> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create_product(&self, new: NewProduct) -> ServiceResult<Product> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        if let Some(category_id) = new.category_id {
            if txn.category(category_id).await?.is_none() {
                return Err(DomainError::validation("unknown category").into());
            }
        }
        let product = Product::create(new, Utc::now());
        txn.insert_product(&product).await?;
        txn.commit().await?;

        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    pub async fn product(&self, id: ProductId) -> ServiceResult<Product> {
        let mut txn = self.store.begin().await?;
        let product = txn.product(id).await?.ok_or_else(DomainError::not_found)?;
        txn.commit().await?;
        Ok(product)
    }

    /// Update a product's descriptive fields.
    ///
    /// The patch carries no stock; see [`adjust_stock`](CatalogService::adjust_stock).
    #[instrument(skip(self, patch), fields(product_id = %id), err)]
    pub async fn update_product(&self, id: ProductId, patch: ProductPatch) -> ServiceResult<Product> {
        patch.validate()?;

        let mut txn = self.store.begin().await?;
        let mut product = txn.product(id).await?.ok_or_else(DomainError::not_found)?;
        if let Some(category_id) = patch.category_id {
            if txn.category(category_id).await?.is_none() {
                return Err(DomainError::validation("unknown category").into());
            }
        }
        patch.apply(&mut product);
        if !txn.update_product(&product).await? {
            return Err(DomainError::not_found().into());
        }
        txn.commit().await?;

        Ok(product)
    }

    /// Apply a signed stock correction and return the updated product.
    #[instrument(skip(self), fields(product_id = %id, delta), err)]
    pub async fn adjust_stock(&self, id: ProductId, delta: i64) -> ServiceResult<Product> {
        let mut txn = self.store.begin().await?;
        ledger::adjust(&mut txn, id, delta).await?;
        let product = txn.product(id).await?.ok_or_else(DomainError::not_found)?;
        txn.commit().await?;
        Ok(product)
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    pub async fn create_category(&self, new: NewCategory) -> ServiceResult<Category> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        let category = Category::create(new);
        if !txn.insert_category(&category).await? {
            return Err(DomainError::conflict("category name already exists").into());
        }
        txn.commit().await?;

        Ok(category)
    }

    #[instrument(skip(self), err)]
    pub async fn categories(&self) -> ServiceResult<Vec<Category>> {
        let mut txn = self.store.begin().await?;
        let categories = txn.categories().await?;
        txn.commit().await?;
        Ok(categories)
    }

    #[instrument(skip(self, new), fields(category_id = %id), err)]
    pub async fn rename_category(&self, id: CategoryId, new: NewCategory) -> ServiceResult<Category> {
        new.validate()?;

        let mut txn = self.store.begin().await?;
        match txn.rename_category(id, &new.name).await? {
            CategoryWrite::Applied => {}
            CategoryWrite::DuplicateName => {
                return Err(DomainError::conflict("category name already exists").into());
            }
            CategoryWrite::NotFound => return Err(DomainError::not_found().into()),
        }
        txn.commit().await?;

        Ok(Category { id, name: new.name })
    }

    /// Delete a category. Products referencing it are detached, not deleted.
    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> ServiceResult<()> {
        let mut txn = self.store.begin().await?;
        if !txn.delete_category(id).await? {
            return Err(DomainError::not_found().into());
        }
        txn.commit().await?;
        Ok(())
    }
}
