use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::app_state::AppState;

pub mod auth;
pub mod cart;
pub mod categories;
pub mod health;
pub mod orders;
pub mod products;
pub mod reviews;

/// Every route of the storefront, with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(categories::routes_with_openapi())
        .merge(products::routes_with_openapi())
        .merge(cart::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(reviews::routes_with_openapi())
        .merge(auth::routes_with_openapi())
        .merge(health::routes_with_openapi())
}

#[derive(Serialize, Debug, ToSchema)]
pub struct SuccessRes {
    pub success: bool,
}

impl SuccessRes {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Answer of a create call: the id of the new row.
#[derive(Serialize, Debug, ToSchema)]
pub struct CreatedRes {
    pub success: bool,
    pub id: i32,
}

impl CreatedRes {
    pub fn ok(id: i32) -> Self {
        Self { success: true, id }
    }
}
