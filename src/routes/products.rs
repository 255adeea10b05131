use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use utoipa_axum::router::OpenApiRouter;

use super::{CreatedRes, SuccessRes};
use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::CurrentUser,
    models::{CreateProductEntity, ProductEntity, UpdateProductEntity},
    services::catalog,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/products",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_products, create_product))
            .routes(utoipa_axum::routes!(get_products_by_category))
            .routes(utoipa_axum::routes!(
                get_product,
                update_product,
                delete_product
            )),
    )
}

/// List active products.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Products"],
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let products = catalog::list_products(state.store.as_ref()).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

/// List the products of one category.
#[utoipa::path(
    get,
    path = "/by-category/{categoryId}",
    tags = ["Products"],
    params(
        ("categoryId" = i32, Path, description = "Category to list products of")
    ),
    responses(
        (status = 200, description = "List products of a category", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_products_by_category(
    Path(category_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let products = catalog::products_by_category(state.store.as_ref(), category_id).await?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get products successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Products"],
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product", body = StdResponse<ProductEntity, String>),
        (status = 404, description = "Product not found")
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::product_by_id(state.store.as_ref(), id).await?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Get product successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Products"],
    security(("sessionCookie" = [])),
    request_body = CreateProductEntity,
    responses(
        (status = 200, description = "Product created", body = StdResponse<CreatedRes, String>),
        (status = 400, description = "Invalid product or unknown category"),
        (status = 403, description = "Admin access required")
    )
)]
async fn create_product(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CreateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    let product = catalog::create_product(state.store.as_ref(), &caller, body).await?;

    Ok(StdResponse {
        data: Some(CreatedRes::ok(product.id)),
        message: Some("Create product successfully"),
    })
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Products"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductEntity,
    responses(
        (status = 200, description = "Product updated", body = StdResponse<SuccessRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Product not found")
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<UpdateProductEntity>,
) -> Result<impl IntoResponse, AppError> {
    catalog::update_product(state.store.as_ref(), &caller, id, body).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Update product successfully"),
    })
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Products"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to delete")
    ),
    responses(
        (status = 200, description = "Product deleted", body = StdResponse<SuccessRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Product not found")
    )
)]
async fn delete_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_product(state.store.as_ref(), &caller, id).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Delete product successfully"),
    })
}
