use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::errors::ServiceError;

/// Opaque payment intent created on the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
}

/// Trust boundary to the external payment processor. The adapter performs no
/// retries; retrying a whole checkout with a fresh receipt token is the
/// caller's business.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment intent for `amount` in currency minor units,
    /// tagged with a unique `receipt` token.
    async fn create_gateway_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError>;

    /// Publishable key id handed to clients to open the hosted payment UI.
    fn key_id(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

/// HTTP client for the Razorpay Orders API.
pub struct RazorpayGateway {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.razorpay_timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            base_url: cfg.razorpay_base_url.trim_end_matches('/').to_string(),
            key_id: cfg.razorpay_key_id.clone(),
            key_secret: cfg.razorpay_key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self))]
    async fn create_gateway_order(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, ServiceError> {
        let url = format!("{}/v1/orders", self.base_url);
        let body = CreateOrderBody {
            amount,
            currency,
            receipt,
        };

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "gateway request failed");
                ServiceError::PaymentGateway(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!(%status, detail, "gateway rejected order creation");
            return Err(ServiceError::PaymentGateway(format!(
                "gateway returned {}",
                status
            )));
        }

        let order: GatewayOrder = response.json().await.map_err(|e| {
            error!(error = %e, "gateway response was not valid JSON");
            ServiceError::PaymentGateway(e.to_string())
        })?;

        info!(gateway_order_id = %order.id, "created gateway order");
        Ok(order)
    }

    fn key_id(&self) -> &str {
        &self.key_id
    }
}
