use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::handlers::common::SessionId;
use crate::{errors::ServiceError, AppState};

/// Response for the checkout endpoint: where to send the customer next.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub url: String,
}

/// Convert the session cart into a hosted payment session.
///
/// Creates a recurring checkout session at the payment provider, snapshots
/// the cart into a pending order, and returns the provider redirect URL.
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    responses(
        (status = 200, description = "Redirect URL for the hosted checkout", body = CheckoutResponse),
        (status = 400, description = "Empty cart or missing session id", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider unreachable", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<Json<CheckoutResponse>, ServiceError> {
    let url = state
        .services
        .checkout
        .create_checkout_session(&session_id)
        .await?;

    Ok(Json(CheckoutResponse { url }))
}
