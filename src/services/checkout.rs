use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{cart_item, CartItem, OrderStatus, PaymentMethod, PaymentStatus, Product};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::payments::{PaymentGateway, SignatureVerifier};
use crate::services::catalog::effective_unit_price;
use crate::services::orders::{OrderDraft, OrderLineDraft, OrderService};

#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub shipping_address: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentInput {
    pub order_id: Uuid,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// What the client needs after order creation. COD orders are final on the
/// spot; online orders hand back the gateway parameters for the hosted
/// payment UI.
#[derive(Debug, Serialize)]
#[serde(tag = "payment_method")]
pub enum CheckoutOutcome {
    #[serde(rename = "COD")]
    Cod { order_id: Uuid },
    #[serde(rename = "ONLINE")]
    Online {
        order_id: Uuid,
        razorpay_order_id: String,
        /// Amount in currency minor units, as the gateway expects it.
        amount: i64,
        currency: String,
        key_id: String,
    },
}

/// Orchestrates cart → order → payment. Server-side prices only: quantities
/// come from stored cart lines, unit prices from the catalog, never from the
/// request body.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    orders: OrderService,
    gateway: Arc<dyn PaymentGateway>,
    verifier: SignatureVerifier,
    event_sender: EventSender,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        orders: OrderService,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        event_sender: EventSender,
        currency: String,
    ) -> Self {
        Self {
            db,
            orders,
            gateway,
            verifier,
            event_sender,
            currency,
        }
    }

    #[instrument(skip(self, input), fields(payment_method = ?input.payment_method))]
    pub async fn create_order(
        &self,
        customer_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<CheckoutOutcome, ServiceError> {
        match input.payment_method {
            PaymentMethod::Cod => self.create_cod_order(customer_id, input).await,
            PaymentMethod::Online => self.create_online_order(customer_id, input).await,
        }
    }

    /// COD orders are confirmed immediately and clear the cart in the same
    /// transaction that writes the order, so a crash between the two cannot
    /// leave a confirmed order with a live cart or vice versa.
    ///
    /// Under read-committed isolation two concurrent checkouts for the same
    /// customer can still both read the cart before either clears it and
    /// place duplicate orders. A per-customer advisory lock taken inside the
    /// transaction would close that window.
    async fn create_cod_order(
        &self,
        customer_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let txn = self.db.begin().await?;

        let (lines, total) = self.load_priced_cart(&txn, customer_id).await?;

        let order = self
            .orders
            .insert_order(
                &txn,
                OrderDraft {
                    customer_id,
                    total_amount: total,
                    currency: self.currency.clone(),
                    payment_method: PaymentMethod::Cod,
                    payment_status: PaymentStatus::Pending,
                    order_status: OrderStatus::Confirmed,
                    shipping_address: input.shipping_address,
                    razorpay_order_id: None,
                },
            )
            .await?;
        self.orders
            .insert_order_items(&txn, order.id, &lines)
            .await?;

        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;
        self.event_sender
            .send_or_log(Event::CartCleared(customer_id))
            .await;

        info!(order_id = %order.id, %customer_id, %total, "created COD order");
        Ok(CheckoutOutcome::Cod { order_id: order.id })
    }

    /// Online orders call the gateway before touching the orders table, so a
    /// gateway failure writes nothing. The cart survives until the payment is
    /// verified.
    async fn create_online_order(
        &self,
        customer_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let (lines, total) = self.load_priced_cart(&*self.db, customer_id).await?;
        let amount = to_minor_units(total)?;

        let receipt = format!("rcpt_{}", Uuid::new_v4().simple());
        let gateway_order = self
            .gateway
            .create_gateway_order(amount, &self.currency, &receipt)
            .await?;

        let txn = self.db.begin().await?;
        let order = self
            .orders
            .insert_order(
                &txn,
                OrderDraft {
                    customer_id,
                    total_amount: total,
                    currency: self.currency.clone(),
                    payment_method: PaymentMethod::Online,
                    payment_status: PaymentStatus::Pending,
                    order_status: OrderStatus::Pending,
                    shipping_address: input.shipping_address,
                    razorpay_order_id: Some(gateway_order.id.clone()),
                },
            )
            .await?;
        self.orders
            .insert_order_items(&txn, order.id, &lines)
            .await?;
        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::OrderCreated(order.id))
            .await;

        info!(
            order_id = %order.id,
            gateway_order_id = %gateway_order.id,
            amount,
            "created online order awaiting payment"
        );
        Ok(CheckoutOutcome::Online {
            order_id: order.id,
            razorpay_order_id: gateway_order.id,
            amount,
            currency: self.currency.clone(),
            key_id: self.gateway.key_id().to_string(),
        })
    }

    /// Confirms an online order after the client returns from the gateway.
    /// The signature is the sole proof of payment; no state changes happen
    /// before it checks out. Re-submitting a verified callback is a no-op.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn verify_payment(
        &self,
        customer_id: Uuid,
        input: VerifyPaymentInput,
    ) -> Result<(), ServiceError> {
        let order = self
            .orders
            .get_order_for_customer(input.order_id, customer_id)
            .await?;

        let stored_ref = order.razorpay_order_id.as_deref().ok_or_else(|| {
            ServiceError::InvalidOperation(
                "Order was not placed through the payment gateway".to_string(),
            )
        })?;
        if stored_ref != input.razorpay_order_id {
            warn!(order_id = %order.id, "gateway order reference mismatch");
            return Err(ServiceError::InvalidOperation(
                "Payment does not match this order".to_string(),
            ));
        }

        if !self.verifier.verify(
            &input.razorpay_order_id,
            &input.razorpay_payment_id,
            &input.razorpay_signature,
        ) {
            warn!(order_id = %order.id, "payment signature rejected");
            return Err(ServiceError::InvalidSignature);
        }

        if order.payment_status == PaymentStatus::Paid {
            info!(order_id = %order.id, "order already paid, verification is a no-op");
            return Ok(());
        }

        let order_id = order.id;
        let txn = self.db.begin().await?;
        self.orders
            .update_order_payment(
                &txn,
                order,
                PaymentStatus::Paid,
                OrderStatus::Confirmed,
                &input.razorpay_payment_id,
                &input.razorpay_signature,
            )
            .await?;
        CartItem::delete_many()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderPaid(order_id)).await;
        self.event_sender
            .send_or_log(Event::CartCleared(customer_id))
            .await;

        info!(%order_id, "payment verified, order confirmed");
        Ok(())
    }

    /// Loads the cart priced from the catalog and sums the total. Empty carts
    /// cannot check out.
    async fn load_priced_cart<C: ConnectionTrait>(
        &self,
        conn: &C,
        customer_id: Uuid,
    ) -> Result<(Vec<OrderLineDraft>, Decimal), ServiceError> {
        let rows = CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .find_also_related(Product)
            .all(conn)
            .await?;

        if rows.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let mut lines = Vec::with_capacity(rows.len());
        let mut total = Decimal::ZERO;
        for (line, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "cart line {} references missing product {}",
                    line.id, line.product_id
                ))
            })?;
            let unit_price = effective_unit_price(&product);
            total += unit_price * Decimal::from(line.quantity);
            lines.push(OrderLineDraft {
                product_id: line.product_id,
                quantity: line.quantity,
                unit_price,
            });
        }

        Ok((lines, total))
    }
}

/// Converts a decimal amount to currency minor units (e.g. rupees → paise).
/// Midpoints round away from zero.
fn to_minor_units(total: Decimal) -> Result<i64, ServiceError> {
    (total * Decimal::from(100))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| {
            ServiceError::InternalError(format!("order total {} out of range", total))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn minor_units_whole_amount() {
        assert_eq!(to_minor_units(dec!(130)).unwrap(), 13000);
    }

    #[test]
    fn minor_units_fractional_amount() {
        assert_eq!(to_minor_units(dec!(19.99)).unwrap(), 1999);
    }

    #[test]
    fn minor_units_rounds_sub_cent_residue() {
        assert_eq!(to_minor_units(dec!(10.005)).unwrap(), 1001);
        assert_eq!(to_minor_units(dec!(10.004)).unwrap(), 1000);
    }

    #[test]
    fn cart_total_is_sum_of_quantity_times_effective_price() {
        // 2 x 50 + 1 x 30 = 130
        let lines = vec![
            OrderLineDraft {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: dec!(50),
            },
            OrderLineDraft {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: dec!(30),
            },
        ];
        let total: Decimal = lines.iter().map(|l| l.line_total()).sum();
        assert_eq!(total, dec!(130));
        assert_eq!(to_minor_units(total).unwrap(), 13000);
    }
}
