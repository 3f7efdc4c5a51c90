use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Hostdeck Storefront API",
        description = "Cart, recurring checkout, and order reconciliation for the Hostdeck hosting platform"
    ),
    paths(
        crate::handlers::catalog::list_plans,
        crate::handlers::catalog::list_addons,
        crate::handlers::carts::get_cart,
        crate::handlers::carts::add_plan,
        crate::handlers::carts::add_addon,
        crate::handlers::carts::update_item_quantity,
        crate::handlers::carts::remove_item,
        crate::handlers::carts::set_billing_cycle,
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::payment_webhooks::payment_webhook,
        crate::handlers::addresses::list_addresses,
        crate::handlers::addresses::create_address,
        crate::handlers::addresses::update_address,
        crate::handlers::addresses::delete_address,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::catalog::Plan,
        crate::catalog::Addon,
        crate::handlers::catalog::PlansResponse,
        crate::handlers::catalog::AddonsResponse,
        crate::handlers::carts::AddPlanRequest,
        crate::handlers::carts::AddAddonRequest,
        crate::handlers::carts::UpdateItemRequest,
        crate::handlers::carts::SetBillingCycleRequest,
        crate::handlers::checkout::CheckoutResponse,
        crate::handlers::addresses::AddressRequest,
        crate::services::pricing::CartTotals,
    )),
    tags(
        (name = "Catalog", description = "Static plan and add-on catalog"),
        (name = "Cart", description = "Per-session shopping cart"),
        (name = "Checkout", description = "Hosted payment session creation"),
        (name = "Payments", description = "Payment provider callbacks"),
        (name = "Account", description = "Authenticated customer data")
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the generated document from
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
