use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::{message_response, success_response, JsonBody};
use crate::services::checkout::{CheckoutOutcome, CreateOrderInput, VerifyPaymentInput};
use crate::AppState;

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<CreateOrderInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let outcome = state
        .services
        .checkout
        .create_order(user.customer_id, input)
        .await?;

    let body = match outcome {
        CheckoutOutcome::Cod { order_id } => json!({
            "success": true,
            "payment_method": "COD",
            "order_id": order_id,
            "message": "Order placed successfully",
        }),
        CheckoutOutcome::Online {
            order_id,
            razorpay_order_id,
            amount,
            currency,
            key_id,
        } => json!({
            "success": true,
            "payment_method": "ONLINE",
            "order_id": order_id,
            "razorpay_order_id": razorpay_order_id,
            "amount": amount,
            "currency": currency,
            "key_id": key_id,
        }),
    };

    Ok(Json(body))
}

pub async fn verify_payment(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<VerifyPaymentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    state
        .services
        .checkout
        .verify_payment(user.customer_id, input)
        .await?;

    Ok(message_response("Payment verified successfully"))
}

pub async fn my_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let orders = state
        .services
        .orders
        .get_orders_for_customer(user.customer_id)
        .await?;
    Ok(success_response(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let (order, items) = state
        .services
        .orders
        .get_order_with_items(order_id, user.customer_id)
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "order": order,
            "items": items,
        },
    })))
}
