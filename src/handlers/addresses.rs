use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::handlers::common::validate_input;
use crate::{
    auth::AuthenticatedUser, entities::customer_address, errors::ServiceError,
    services::addresses::AddressInput, AppState,
};

/// Creates the router for the saved-address endpoints. All routes require a
/// bearer token from the external auth provider.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_addresses).post(create_address))
        .route("/:id", put(update_address).delete(delete_address))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddressRequest {
    pub label: Option<String>,
    #[validate(length(min = 1))]
    pub line1: String,
    pub line2: Option<String>,
    #[validate(length(min = 1))]
    pub city: String,
    #[validate(length(min = 1))]
    pub postal_code: String,
    pub state: Option<String>,
    /// ISO 3166-1 alpha-2
    #[validate(length(equal = 2))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

impl From<AddressRequest> for AddressInput {
    fn from(req: AddressRequest) -> Self {
        Self {
            label: req.label,
            line1: req.line1,
            line2: req.line2,
            city: req.city,
            postal_code: req.postal_code,
            state: req.state,
            country: req.country,
            is_default: req.is_default,
        }
    }
}

/// List the authenticated user's saved addresses
#[utoipa::path(
    get,
    path = "/api/v1/account/addresses",
    responses(
        (status = 200, description = "Addresses, default first"),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn list_addresses(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<customer_address::Model>>, ServiceError> {
    let addresses = state.services.addresses.list_addresses(&user.user_id).await?;
    Ok(Json(addresses))
}

/// Save a new address
#[utoipa::path(
    post,
    path = "/api/v1/account/addresses",
    request_body = AddressRequest,
    responses(
        (status = 201, description = "Created address"),
        (status = 400, description = "Invalid address", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn create_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<AddressRequest>,
) -> Result<(StatusCode, Json<customer_address::Model>), ServiceError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .create_address(&user.user_id, payload.into())
        .await?;

    Ok((StatusCode::CREATED, Json(address)))
}

/// Replace a saved address
#[utoipa::path(
    put,
    path = "/api/v1/account/addresses/{id}",
    request_body = AddressRequest,
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 200, description = "Updated address"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn update_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddressRequest>,
) -> Result<Json<customer_address::Model>, ServiceError> {
    validate_input(&payload)?;

    let address = state
        .services
        .addresses
        .update_address(id, &user.user_id, payload.into())
        .await?;

    Ok(Json(address))
}

/// Delete a saved address
#[utoipa::path(
    delete,
    path = "/api/v1/account/addresses/{id}",
    params(("id" = Uuid, Path, description = "Address id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Address not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Account"
)]
pub async fn delete_address(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .addresses
        .delete_address(id, &user.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
