use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::handlers::common::{validate_input, SessionId};
use crate::{
    entities::{cart, cart_item},
    errors::ServiceError,
    services::{carts::CartWithItems, pricing},
    AppState,
};

/// Creates the router for cart endpoints. All routes are keyed by the
/// caller's session id (cookie or `X-Session-ID` header).
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/plan", post(add_plan))
        .route("/addon", post(add_addon))
        .route("/items/:item_id", put(update_item_quantity).delete(remove_item))
        .route("/billing-cycle", post(set_billing_cycle))
}

/// Cart payload returned by every cart endpoint. Totals are display
/// equivalents; which one gets charged is decided at checkout by the
/// selected billing cycle.
#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub cart: cart::Model,
    pub items: Vec<cart_item::Model>,
    pub totals: pricing::CartTotals,
}

impl From<CartWithItems> for CartResponse {
    fn from(cart: CartWithItems) -> Self {
        let totals = pricing::cart_totals(&cart.items);
        Self {
            cart: cart.cart,
            items: cart.items,
            totals,
        }
    }
}

/// Get (or lazily create) the cart for the current session
#[utoipa::path(
    get,
    path = "/api/v1/cart",
    responses(
        (status = 200, description = "Cart with items and totals"),
        (status = 400, description = "Missing session id", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
) -> Result<Json<CartResponse>, ServiceError> {
    let cart = state.services.cart.get_or_create_cart(&session_id).await?;
    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddPlanRequest {
    #[validate(length(min = 1))]
    pub plan_id: String,
    /// Defaults to 1; values below 1 are clamped up.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

/// Add a plan to the cart (increments quantity if already present)
#[utoipa::path(
    post,
    path = "/api/v1/cart/plan",
    request_body = AddPlanRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Unknown plan id", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn add_plan(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(payload): Json<AddPlanRequest>,
) -> Result<Json<CartResponse>, ServiceError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_plan(&session_id, &payload.plan_id, payload.quantity)
        .await?;

    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddAddonRequest {
    #[validate(length(min = 1))]
    pub addon_id: String,
}

/// Add an add-on to the cart (idempotent)
#[utoipa::path(
    post,
    path = "/api/v1/cart/addon",
    request_body = AddAddonRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Unknown addon id", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn add_addon(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(payload): Json<AddAddonRequest>,
) -> Result<Json<CartResponse>, ServiceError> {
    validate_input(&payload)?;

    let cart = state
        .services
        .cart
        .add_addon(&session_id, &payload.addon_id)
        .await?;

    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    /// Zero or negative removes the item.
    pub quantity: i32,
}

/// Set the quantity of a cart line item
#[utoipa::path(
    put,
    path = "/api/v1/cart/items/{item_id}",
    request_body = UpdateItemRequest,
    params(("item_id" = String, Path, description = "Catalog id of the line item")),
    responses((status = 200, description = "Updated cart")),
    tag = "Cart"
)]
pub async fn update_item_quantity(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Path(item_id): Path<String>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ServiceError> {
    let cart = state
        .services
        .cart
        .set_item_quantity(&session_id, &item_id, payload.quantity)
        .await?;

    Ok(Json(cart.into()))
}

/// Remove a line item from the cart
#[utoipa::path(
    delete,
    path = "/api/v1/cart/items/{item_id}",
    params(("item_id" = String, Path, description = "Catalog id of the line item")),
    responses((status = 200, description = "Updated cart")),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Path(item_id): Path<String>,
) -> Result<Json<CartResponse>, ServiceError> {
    let cart = state
        .services
        .cart
        .remove_item(&session_id, &item_id)
        .await?;

    Ok(Json(cart.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetBillingCycleRequest {
    /// `monthly` or `yearly`
    pub billing_cycle: String,
}

/// Select monthly or yearly billing for the cart
#[utoipa::path(
    post,
    path = "/api/v1/cart/billing-cycle",
    request_body = SetBillingCycleRequest,
    responses(
        (status = 200, description = "Updated cart"),
        (status = 400, description = "Invalid billing cycle", body = crate::errors::ErrorResponse)
    ),
    tag = "Cart"
)]
pub async fn set_billing_cycle(
    State(state): State<AppState>,
    SessionId(session_id): SessionId,
    Json(payload): Json<SetBillingCycleRequest>,
) -> Result<Json<CartResponse>, ServiceError> {
    let cycle = cart::BillingCycle::parse(&payload.billing_cycle).ok_or_else(|| {
        ServiceError::ValidationError(format!("invalid billing cycle: {}", payload.billing_cycle))
    })?;

    let cart = state
        .services
        .cart
        .set_billing_cycle(&session_id, cycle)
        .await?;

    Ok(Json(cart.into()))
}
