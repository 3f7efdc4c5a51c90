pub mod addresses;
pub mod carts;
pub mod catalog;
pub mod checkout;
pub mod common;
pub mod payment_webhooks;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::payments::PaymentGateway;
use std::sync::Arc;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub cart: Arc<crate::services::carts::CartService>,
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub addresses: Arc<crate::services::addresses::AddressService>,
}

impl AppServices {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
        config: Arc<AppConfig>,
    ) -> Self {
        let cart = Arc::new(crate::services::carts::CartService::new(
            db.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db.clone(),
            cart.clone(),
            gateway,
            event_sender.clone(),
            config,
        ));
        let addresses = Arc::new(crate::services::addresses::AddressService::new(
            db,
            event_sender,
        ));

        Self {
            cart,
            checkout,
            addresses,
        }
    }
}
