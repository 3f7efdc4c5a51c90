use axum::{routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{self, Addon, Plan};
use crate::AppState;

/// Creates the router for the static catalog endpoints
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/addons", get(list_addons))
}

#[derive(Serialize, ToSchema)]
pub struct PlansResponse {
    pub plans: Vec<Plan>,
}

#[derive(Serialize, ToSchema)]
pub struct AddonsResponse {
    pub addons: Vec<Addon>,
}

/// List the hosting plans on offer
#[utoipa::path(
    get,
    path = "/api/v1/plans",
    responses((status = 200, description = "Plan catalog", body = PlansResponse)),
    tag = "Catalog"
)]
pub async fn list_plans() -> Json<PlansResponse> {
    Json(PlansResponse {
        plans: catalog::plans().into_iter().cloned().collect(),
    })
}

/// List the add-on products on offer
#[utoipa::path(
    get,
    path = "/api/v1/addons",
    responses((status = 200, description = "Add-on catalog", body = AddonsResponse)),
    tag = "Catalog"
)]
pub async fn list_addons() -> Json<AddonsResponse> {
    Json(AddonsResponse {
        addons: catalog::addons().into_iter().cloned().collect(),
    })
}
