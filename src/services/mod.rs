pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::payments::{PaymentGateway, SignatureVerifier};

/// Aggregates the services the HTTP handlers depend on.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: catalog::CatalogService,
    pub cart: cart::CartService,
    pub orders: orders::OrderService,
    pub checkout: checkout::CheckoutService,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: EventSender,
        gateway: Arc<dyn PaymentGateway>,
        verifier: SignatureVerifier,
        currency: String,
    ) -> Self {
        let catalog = catalog::CatalogService::new(db.clone());
        let cart = cart::CartService::new(db.clone(), event_sender.clone());
        let orders = orders::OrderService::new(db.clone());
        let checkout = checkout::CheckoutService::new(
            db,
            orders.clone(),
            gateway,
            verifier,
            event_sender,
            currency,
        );

        Self {
            catalog,
            cart,
            orders,
            checkout,
        }
    }
}
