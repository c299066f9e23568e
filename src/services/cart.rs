use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{cart_item, CartItem, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

/// Cart line joined with the product fields the storefront displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product_name: String,
    pub product_price: Decimal,
    pub product_discount_price: Decimal,
    pub product_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Upper bound on the quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 10_000;

fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity > MAX_LINE_QUANTITY {
        return Err(ServiceError::ValidationError(format!(
            "Quantity must not exceed {}",
            MAX_LINE_QUANTITY
        )));
    }
    Ok(())
}

/// Per-customer cart lines: upsert on add, delete on set-quantity ≤ 0.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the cart, incrementing quantity if the line exists.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        customer_id: Uuid,
        input: AddToCartInput,
    ) -> Result<Vec<CartLine>, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }
        validate_quantity(input.quantity)?;

        let txn = self.db.begin().await?;

        Product::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Product {} not found", input.product_id))
            })?;

        let existing = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let now = Utc::now();
        if let Some(line) = existing {
            let quantity = line
                .quantity
                .checked_add(input.quantity)
                .ok_or_else(|| {
                    ServiceError::ValidationError("Quantity out of range".to_string())
                })?;
            validate_quantity(quantity)?;
            let mut line: cart_item::ActiveModel = line.into();
            line.quantity = Set(quantity);
            line.updated_at = Set(now);
            line.update(&txn).await?;
        } else {
            let line = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                customer_id: Set(customer_id),
                product_id: Set(input.product_id),
                quantity: Set(input.quantity),
                created_at: Set(now),
                updated_at: Set(now),
            };
            line.insert(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                customer_id,
                product_id: input.product_id,
            })
            .await;

        info!(%customer_id, product_id = %input.product_id, quantity = input.quantity, "added item to cart");
        self.get_cart(customer_id).await
    }

    /// Sets the quantity of a cart line; zero or below removes it.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<Vec<CartLine>, ServiceError> {
        if quantity <= 0 {
            return self.remove_item(customer_id, product_id).await;
        }
        validate_quantity(quantity)?;

        let line = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Cart item for product {} not found", product_id))
            })?;

        let mut line: cart_item::ActiveModel = line.into();
        line.quantity = Set(quantity);
        line.updated_at = Set(Utc::now());
        line.update(&*self.db).await?;

        self.get_cart(customer_id).await
    }

    /// Removes one product's line from the cart.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<CartLine>, ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(&*self.db)
            .await?;

        self.get_cart(customer_id).await
    }

    /// Deletes every cart line for the customer.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self, customer_id: Uuid) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&*self.db)
            .await?;

        self.event_sender
            .send_or_log(Event::CartCleared(customer_id))
            .await;

        info!(%customer_id, "cleared cart");
        Ok(())
    }

    /// Returns the customer's lines joined with product display fields.
    pub async fn get_cart(&self, customer_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        rows.into_iter()
            .map(|(line, product)| {
                let product = product.ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "cart line {} references missing product {}",
                        line.id, line.product_id
                    ))
                })?;
                Ok(CartLine {
                    id: line.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product_name: product.name,
                    product_price: product.price,
                    product_discount_price: product.discount_price,
                    product_image: product.image_url,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_to_cart_input_defaults_quantity_to_one() {
        let json = r#"{"product_id": "550e8400-e29b-41d4-a716-446655440000"}"#;
        let input: AddToCartInput = serde_json::from_str(json).expect("deserialize");
        assert_eq!(input.quantity, 1);
    }

    #[test]
    fn quantity_cap_enforced() {
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn add_to_cart_input_accepts_explicit_quantity() {
        let json = r#"{"product_id": "550e8400-e29b-41d4-a716-446655440000", "quantity": 4}"#;
        let input: AddToCartInput = serde_json::from_str(json).expect("deserialize");
        assert_eq!(input.quantity, 4);
    }
}
