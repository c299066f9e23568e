pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod payments;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{FromRef, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

use crate::auth::TokenVerifier;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::services::AppServices;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: Arc<AppConfig>,
    pub services: AppServices,
    pub token_verifier: TokenVerifier,
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.token_verifier.clone()
    }
}

/// Full application router: storefront API under `/api`, liveness at
/// `/health`.
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let timeout = TimeoutLayer::new(Duration::from_secs(state.config.request_timeout_secs));

    let product_routes = Router::new()
        .route("/", get(handlers::products::list_products))
        .route("/:id", get(handlers::products::get_product));

    let cart_routes = Router::new()
        .route("/", get(handlers::carts::get_cart))
        .route("/add", post(handlers::carts::add_to_cart))
        .route("/update", post(handlers::carts::update_cart_item))
        .route("/remove", post(handlers::carts::remove_from_cart))
        .route("/clear", post(handlers::carts::clear_cart));

    let order_routes = Router::new()
        .route("/create", post(handlers::orders::create_order))
        .route("/verify", post(handlers::orders::verify_payment))
        .route("/my-orders", get(handlers::orders::my_orders))
        .route("/:id", get(handlers::orders::get_order));

    let api = Router::new()
        .nest("/products", product_routes)
        .nest("/cart", cart_routes)
        .nest("/orders", order_routes);

    Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(timeout)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    let raw = match config.cors_allowed_origins.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw,
        // No configured origins: permissive, matching a development setup
        _ => return layer.allow_origin(Any),
    };

    if raw.split(',').any(|o| o.trim() == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin, "ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Liveness probe with a database ping.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({"status": "healthy", "database": "connected"})),
        ),
        Err(e) => {
            warn!(error = %e, "health check database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"status": "unhealthy", "database": "unreachable"})),
            )
        }
    }
}
