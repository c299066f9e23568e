use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::ServiceError;
use crate::handlers::{success_response, JsonBody};
use crate::services::cart::AddToCartInput;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateCartInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartInput {
    pub product_id: Uuid,
}

pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.get_cart(user.customer_id).await?;
    Ok(success_response(cart))
}

pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<AddToCartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state.services.cart.add_item(user.customer_id, input).await?;
    Ok(success_response(cart))
}

pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<UpdateCartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .cart
        .update_item(user.customer_id, input.product_id, input.quantity)
        .await?;
    Ok(success_response(cart))
}

pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    JsonBody(input): JsonBody<RemoveFromCartInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let cart = state
        .services
        .cart
        .remove_item(user.customer_id, input.product_id)
        .await?;
    Ok(success_response(cart))
}

pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.cart.clear_cart(user.customer_id).await?;
    let cart = state.services.cart.get_cart(user.customer_id).await?;
    Ok(success_response(cart))
}
