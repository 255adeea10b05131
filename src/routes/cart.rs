use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use super::SuccessRes;
use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::CurrentUser,
    models::{CartItemEntity, CartLine},
    services::cart,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/cart",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_cart, clear_cart))
            .routes(utoipa_axum::routes!(add_to_cart))
            .routes(utoipa_axum::routes!(remove_from_cart)),
    )
}

/// List the caller's cart with the current name, price and image of each product.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Cart"],
    security(("sessionCookie" = [])),
    responses(
        (status = 200, description = "Get my cart", body = StdResponse<Vec<CartLine>, String>),
        (status = 401, description = "No session")
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let lines = cart::get(state.store.as_ref(), &caller).await?;

    Ok(StdResponse {
        data: Some(lines),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AddToCartReq {
    pub product_id: i32,
    /// Defaults to 1.
    pub quantity: Option<i32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct AddToCartRes {
    pub success: bool,
    pub cart_item: CartItemEntity,
}

/// Add a product to the cart. Adding a product that is already in the cart raises its quantity.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Cart"],
    security(("sessionCookie" = [])),
    request_body = AddToCartReq,
    responses(
        (status = 200, description = "Product added", body = StdResponse<AddToCartRes, String>),
        (status = 400, description = "Invalid quantity or unknown product"),
        (status = 401, description = "No session")
    )
)]
async fn add_to_cart(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<AddToCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart_item = cart::add(
        state.store.as_ref(),
        &caller,
        body.product_id,
        body.quantity,
    )
    .await?;

    Ok(StdResponse {
        data: Some(AddToCartRes {
            success: true,
            cart_item,
        }),
        message: Some("Add to cart successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/items/{id}",
    tags = ["Cart"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Cart item ID to remove")
    ),
    responses(
        (status = 200, description = "Cart item removed", body = StdResponse<SuccessRes, String>),
        (status = 404, description = "No such item in my cart")
    )
)]
async fn remove_from_cart(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    cart::remove(state.store.as_ref(), &caller, id).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Remove from cart successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/",
    tags = ["Cart"],
    security(("sessionCookie" = [])),
    responses(
        (status = 200, description = "Cart cleared", body = StdResponse<SuccessRes, String>)
    )
)]
async fn clear_cart(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    cart::clear(state.store.as_ref(), &caller).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Clear cart successfully"),
    })
}
