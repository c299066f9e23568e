#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectOptions, Database, EntityTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::MockServer;

use storefront_api::auth::TokenVerifier;
use storefront_api::config::AppConfig;
use storefront_api::db::DbPool;
use storefront_api::entities::{cart_item, order, product, CartItem, Order, ProductStatus};
use storefront_api::events::EventSender;
use storefront_api::migrator::Migrator;
use storefront_api::payments::{RazorpayGateway, SignatureVerifier};
use storefront_api::services::AppServices;
use storefront_api::{app_router, AppState};

pub const TEST_JWT_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_GATEWAY_SECRET: &str = "rzp_test_secret";

/// In-process application over in-memory SQLite, with the payment gateway
/// pointed at a local mock server.
pub struct TestApp {
    pub router: Router,
    pub db: Arc<DbPool>,
    pub gateway_server: MockServer,
    pub token_verifier: TokenVerifier,
    pub signer: SignatureVerifier,
}

pub async fn spawn_app() -> TestApp {
    let gateway_server = MockServer::start().await;
    let config = test_config(&gateway_server.uri());

    // A single pooled connection keeps every query on the same in-memory db
    let mut options = ConnectOptions::new(config.database_url.clone());
    options.max_connections(1).sqlx_logging(false);
    let db = Arc::new(Database::connect(options).await.expect("connect sqlite"));
    Migrator::up(&*db, None).await.expect("run migrations");

    let (event_tx, mut event_rx) = mpsc::channel(64);
    tokio::spawn(async move { while event_rx.recv().await.is_some() {} });
    let event_sender = EventSender::new(event_tx);

    let gateway = Arc::new(RazorpayGateway::new(&config).expect("gateway client"));
    let signer = SignatureVerifier::new(config.razorpay_key_secret.clone());
    let token_verifier = TokenVerifier::from_config(&config);

    let services = AppServices::new(
        db.clone(),
        event_sender,
        gateway,
        signer.clone(),
        config.currency.clone(),
    );

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        services,
        token_verifier: token_verifier.clone(),
    };

    TestApp {
        router: app_router(state),
        db,
        gateway_server,
        token_verifier,
        signer,
    }
}

fn test_config(gateway_base_url: &str) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        auth_issuer: "storefront-api".to_string(),
        auth_audience: "storefront".to_string(),
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "warn".to_string(),
        log_json: false,
        auto_migrate: false,
        cors_allowed_origins: None,
        db_max_connections: 1,
        db_min_connections: 1,
        db_connect_timeout_secs: 5,
        db_idle_timeout_secs: 60,
        db_acquire_timeout_secs: 5,
        request_timeout_secs: 5,
        razorpay_key_id: "rzp_test_key".to_string(),
        razorpay_key_secret: TEST_GATEWAY_SECRET.to_string(),
        razorpay_base_url: gateway_base_url.to_string(),
        razorpay_timeout_secs: 5,
        currency: "INR".to_string(),
    }
}

impl TestApp {
    pub fn token_for(&self, customer_id: Uuid) -> String {
        self.token_verifier
            .issue_token(customer_id, Duration::hours(1))
            .expect("issue token")
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, discount_price: Decimal) -> Uuid {
        let now = Utc::now();
        let id = Uuid::new_v4();
        product::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            description: Set(None),
            image_url: Set(None),
            price: Set(price),
            discount_price: Set(discount_price),
            status: Set(ProductStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed product");
        id
    }

    pub async fn seed_cart_item(&self, customer_id: Uuid, product_id: Uuid, quantity: i32) {
        let now = Utc::now();
        cart_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            customer_id: Set(customer_id),
            product_id: Set(product_id),
            quantity: Set(quantity),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed cart item");
    }

    pub async fn cart_rows(&self, customer_id: Uuid) -> Vec<cart_item::Model> {
        CartItem::find()
            .filter(cart_item::Column::CustomerId.eq(customer_id))
            .all(&*self.db)
            .await
            .expect("query cart")
    }

    pub async fn order_rows(&self, customer_id: Uuid) -> Vec<order::Model> {
        Order::find()
            .filter(order::Column::CustomerId.eq(customer_id))
            .all(&*self.db)
            .await
            .expect("query orders")
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    pub async fn post_json(
        &self,
        path: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.router
            .clone()
            .oneshot(builder.body(Body::from(body.to_string())).expect("request"))
            .await
            .expect("response")
    }
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}

pub fn assert_status(response: &Response<Body>, expected: StatusCode) {
    assert_eq!(response.status(), expected);
}
