use async_trait::async_trait;

use crate::errors::ServiceError;

pub mod stripe;

pub use stripe::StripeGateway;

/// Recurrence of a checkout session line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurringInterval {
    Month,
    Year,
}

impl RecurringInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// One recurring line of an external checkout session. `unit_amount_minor`
/// is the per-period charge in minor currency units, already rounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineItem {
    pub name: String,
    pub description: String,
    pub unit_amount_minor: i64,
    pub interval: RecurringInterval,
    pub quantity: i64,
}

/// Request to open a hosted recurring checkout flow.
#[derive(Debug, Clone)]
pub struct CreateSessionRequest {
    pub currency: String,
    pub line_items: Vec<SessionLineItem>,
    pub success_url: String,
    pub cancel_url: String,
    /// Opaque correlation data echoed back by the provider.
    pub metadata: Vec<(String, String)>,
}

/// Handle to a created external checkout session.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub id: String,
    pub redirect_url: String,
}

/// Minimal contract to the external payment provider. Webhook signature
/// verification and event mapping live at the HTTP boundary, not here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_recurring_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<GatewaySession, ServiceError>;
}
