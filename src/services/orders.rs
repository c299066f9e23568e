use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{
    order, order_item, Order, OrderItem, OrderItemModel, OrderModel, OrderStatus, PaymentMethod,
    PaymentStatus,
};
use crate::errors::ServiceError;

/// Order header as the orchestrator wants it written.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub customer_id: Uuid,
    pub total_amount: Decimal,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub shipping_address: Option<serde_json::Value>,
    pub razorpay_order_id: Option<String>,
}

/// Price-at-sale snapshot for one order line.
#[derive(Debug, Clone)]
pub struct OrderLineDraft {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl OrderLineDraft {
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Durable storage for orders and their line snapshots. Pure persistence
/// boundary; pricing and state decisions live in the checkout orchestrator.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Inserts an order header on the given connection, which may be a
    /// caller-owned transaction.
    pub async fn insert_order<C: ConnectionTrait>(
        &self,
        conn: &C,
        draft: OrderDraft,
    ) -> Result<OrderModel, ServiceError> {
        let now = Utc::now();
        let model = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(draft.customer_id),
            total_amount: Set(draft.total_amount),
            currency: Set(draft.currency),
            payment_method: Set(draft.payment_method),
            payment_status: Set(draft.payment_status),
            order_status: Set(draft.order_status),
            shipping_address: Set(draft.shipping_address),
            razorpay_order_id: Set(draft.razorpay_order_id),
            razorpay_payment_id: Set(None),
            razorpay_signature: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        Ok(model.insert(conn).await?)
    }

    /// Inserts the immutable line snapshots for an order.
    pub async fn insert_order_items<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_id: Uuid,
        lines: &[OrderLineDraft],
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        let models = lines.iter().map(|line| order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line.line_total()),
            created_at: Set(now),
        });

        OrderItem::insert_many(models).exec(conn).await?;
        Ok(())
    }

    /// Overwrites payment state after a verified callback. Re-applying the
    /// same update is safe; the target values are identical.
    pub async fn update_order_payment<C: ConnectionTrait>(
        &self,
        conn: &C,
        order: OrderModel,
        payment_status: PaymentStatus,
        order_status: OrderStatus,
        payment_ref: &str,
        signature: &str,
    ) -> Result<OrderModel, ServiceError> {
        let order_id = order.id;
        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(payment_status);
        active.order_status = Set(order_status);
        active.razorpay_payment_id = Set(Some(payment_ref.to_string()));
        active.razorpay_signature = Set(Some(signature.to_string()));
        active.updated_at = Set(Utc::now());

        let updated = active.update(conn).await?;
        info!(%order_id, ?payment_status, ?order_status, "updated order payment state");
        Ok(updated)
    }

    pub async fn get_order_for_customer(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<OrderModel, ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        // Orders are visible to their owner only
        if order.customer_id != customer_id {
            return Err(ServiceError::NotFound(format!(
                "Order {} not found",
                order_id
            )));
        }

        Ok(order)
    }

    /// Order with its line snapshots.
    #[instrument(skip(self))]
    pub async fn get_order_with_items(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<(OrderModel, Vec<OrderItemModel>), ServiceError> {
        let order = self.get_order_for_customer(order_id, customer_id).await?;

        let items = OrderItem::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?;

        Ok((order, items))
    }

    /// Customer's orders, newest first.
    #[instrument(skip(self))]
    pub async fn get_orders_for_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
