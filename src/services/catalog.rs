use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{product, Product, ProductModel, ProductStatus};
use crate::errors::ServiceError;

/// Effective unit price: the discount price when one is set, the list price
/// otherwise. This rule is the single authority for order totals.
pub fn effective_unit_price(product: &ProductModel) -> Decimal {
    if product.discount_price > Decimal::ZERO {
        product.discount_price
    } else {
        product.price
    }
}

/// Read-only catalog access.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    pub async fn get_product(&self, product_id: Uuid) -> Result<ProductModel, ServiceError> {
        Product::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    /// Active products, stable order for storefront listings.
    pub async fn list_products(&self) -> Result<Vec<ProductModel>, ServiceError> {
        Ok(Product::find()
            .filter(product::Column::Status.eq(ProductStatus::Active))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await?)
    }
}
