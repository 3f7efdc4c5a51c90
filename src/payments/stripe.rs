use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, instrument};

use super::{CreateSessionRequest, GatewaySession, PaymentGateway};
use crate::errors::ServiceError;

/// Stripe Checkout implementation of [`PaymentGateway`], speaking the REST
/// API directly (form-encoded, subscription mode). The base URL is
/// configurable so tests can point it at a local stub.
#[derive(Debug, Clone)]
pub struct StripeGateway {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    error_type: String,
}

impl StripeGateway {
    pub fn new(secret_key: String, api_base: String, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key,
        }
    }

    fn sessions_url(&self) -> String {
        format!("{}/v1/checkout/sessions", self.api_base)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(lines = request.line_items.len()))]
    async fn create_recurring_checkout_session(
        &self,
        request: CreateSessionRequest,
    ) -> Result<GatewaySession, ServiceError> {
        let mut params: Vec<(String, String)> = vec![
            ("mode".into(), "subscription".into()),
            (
                "success_url".into(),
                format!("{}?session_id={{CHECKOUT_SESSION_ID}}", request.success_url),
            ),
            ("cancel_url".into(), request.cancel_url),
        ];

        for (i, line) in request.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            params.push((
                format!("{}[price_data][currency]", prefix),
                request.currency.clone(),
            ));
            params.push((
                format!("{}[price_data][product_data][name]", prefix),
                line.name.clone(),
            ));
            params.push((
                format!("{}[price_data][product_data][description]", prefix),
                line.description.clone(),
            ));
            params.push((
                format!("{}[price_data][unit_amount]", prefix),
                line.unit_amount_minor.to_string(),
            ));
            params.push((
                format!("{}[price_data][recurring][interval]", prefix),
                line.interval.as_str().to_string(),
            ));
            params.push((format!("{}[quantity]", prefix), line.quantity.to_string()));
        }

        for (key, value) in &request.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        let response = self
            .http
            .post(self.sessions_url())
            .bearer_auth(&self.secret_key)
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!("Stripe checkout session request failed: {}", e);
                ServiceError::ExternalServiceError(format!("stripe request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<StripeErrorResponse>().await {
                Ok(body) => format!("{} ({})", body.error.message, body.error.error_type),
                Err(_) => "unreadable error body".to_string(),
            };
            error!("Stripe checkout session creation failed ({}): {}", status, message);
            return Err(ServiceError::ExternalServiceError(format!(
                "stripe returned {}: {}",
                status, message
            )));
        }

        let session: CheckoutSessionResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("invalid stripe response: {}", e))
        })?;

        Ok(GatewaySession {
            id: session.id,
            redirect_url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::{RecurringInterval, SessionLineItem};

    #[test]
    fn sessions_url_tolerates_trailing_slash() {
        let gw = StripeGateway::new(
            "sk_test_x".into(),
            "https://api.stripe.com/".into(),
            Duration::from_secs(5),
        );
        assert_eq!(gw.sessions_url(), "https://api.stripe.com/v1/checkout/sessions");
    }

    #[tokio::test]
    async fn unreachable_api_fails_closed() {
        let gw = StripeGateway::new(
            "sk_test_x".into(),
            // Reserved TEST-NET address, nothing listens there
            "http://192.0.2.1:1".into(),
            Duration::from_millis(200),
        );

        let result = gw
            .create_recurring_checkout_session(CreateSessionRequest {
                currency: "eur".into(),
                line_items: vec![SessionLineItem {
                    name: "Node Starter".into(),
                    description: "plan - monthly billing".into(),
                    unit_amount_minor: 990,
                    interval: RecurringInterval::Month,
                    quantity: 1,
                }],
                success_url: "https://shop.example/checkout/success".into(),
                cancel_url: "https://shop.example/cart".into(),
                metadata: vec![("cart_session_id".into(), "sess".into())],
            })
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::ExternalServiceError(_))
        ));
    }
}
