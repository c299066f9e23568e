mod common;

use axum::http::StatusCode;
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

use common::{json_body, spawn_app};

#[tokio::test]
async fn adding_same_product_twice_increments_quantity() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);

    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;

    let response = app
        .post_json(
            "/api/cart/add",
            Some(&token),
            json!({"product_id": shirt, "quantity": 2}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .post_json("/api/cart/add", Some(&token), json!({"product_id": shirt}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let lines = body["data"].as_array().expect("cart lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 3);
    assert_eq!(lines[0]["product_name"], "Shirt");
}

#[tokio::test]
async fn adding_unknown_product_is_not_found() {
    let app = spawn_app().await;
    let token = app.token_for(Uuid::new_v4());

    let response = app
        .post_json(
            "/api/cart/add",
            Some(&token),
            json!({"product_id": Uuid::new_v4()}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn zero_quantity_add_is_rejected() {
    let app = spawn_app().await;
    let token = app.token_for(Uuid::new_v4());
    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;

    let response = app
        .post_json(
            "/api/cart/add",
            Some(&token),
            json!({"product_id": shirt, "quantity": 0}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn quantity_above_cap_is_rejected() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);
    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;

    let response = app
        .post_json(
            "/api/cart/add",
            Some(&token),
            json!({"product_id": shirt, "quantity": i32::MAX}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.cart_rows(customer_id).await.is_empty());
}

#[tokio::test]
async fn repeated_adds_cannot_push_quantity_past_cap() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);
    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;

    let response = app
        .post_json(
            "/api/cart/add",
            Some(&token),
            json!({"product_id": shirt, "quantity": 10_000}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Would overflow the cap on the existing line
    let response = app
        .post_json("/api/cart/add", Some(&token), json!({"product_id": shirt}))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let rows = app.cart_rows(customer_id).await;
    assert_eq!(rows[0].quantity, 10_000);
}

#[tokio::test]
async fn clear_empties_the_cart() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);

    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;
    app.seed_cart_item(customer_id, shirt, 2).await;

    let response = app
        .post_json("/api/cart/clear", Some(&token), json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"].as_array().expect("cart lines").is_empty());
    assert!(app.cart_rows(customer_id).await.is_empty());
}

#[tokio::test]
async fn updating_to_zero_removes_the_line() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);

    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;
    app.seed_cart_item(customer_id, shirt, 2).await;

    let response = app
        .post_json(
            "/api/cart/update",
            Some(&token),
            json!({"product_id": shirt, "quantity": 0}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"].as_array().expect("cart lines").is_empty());
    assert!(app.cart_rows(customer_id).await.is_empty());
}

#[tokio::test]
async fn carts_are_isolated_per_customer() {
    let app = spawn_app().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let shirt = app.seed_product("Shirt", dec!(50), dec!(0)).await;
    app.seed_cart_item(alice, shirt, 1).await;

    let response = app.get("/api/cart", Some(&app.token_for(bob))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["data"].as_array().expect("cart lines").is_empty());
}

#[tokio::test]
async fn cart_line_carries_discount_price() {
    let app = spawn_app().await;
    let customer_id = Uuid::new_v4();
    let token = app.token_for(customer_id);

    let sale = app.seed_product("Sale item", dec!(100), dec!(60)).await;
    app.seed_cart_item(customer_id, sale, 1).await;

    let response = app.get("/api/cart", Some(&token)).await;
    let body = json_body(response).await;
    let lines = body["data"].as_array().expect("cart lines");
    assert_eq!(decimal_field(&lines[0]["product_price"]), dec!(100));
    assert_eq!(decimal_field(&lines[0]["product_discount_price"]), dec!(60));
}

fn decimal_field(value: &serde_json::Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .expect("decimal serialized as string")
        .parse()
        .expect("parse decimal")
}

#[tokio::test]
async fn cart_requires_authentication() {
    let app = spawn_app().await;
    let response = app.get("/api/cart", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn products_are_public() {
    let app = spawn_app().await;
    app.seed_product("Shirt", dec!(50), dec!(0)).await;

    let response = app.get("/api/products", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().expect("products").len(), 1);
}
