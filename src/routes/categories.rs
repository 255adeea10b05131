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
    models::{CategoryEntity, CreateCategoryEntity, UpdateCategoryEntity},
    services::catalog,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/categories",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_categories, create_category))
            .routes(utoipa_axum::routes!(get_category_by_slug))
            .routes(utoipa_axum::routes!(update_category, delete_category)),
    )
}

/// List active categories in display order.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Categories"],
    responses(
        (status = 200, description = "List categories", body = StdResponse<Vec<CategoryEntity>, String>)
    )
)]
async fn get_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let categories = catalog::list_categories(state.store.as_ref()).await?;

    Ok(StdResponse {
        data: Some(categories),
        message: Some("Get categories successfully"),
    })
}

/// Fetch a category by its slug, active or not.
#[utoipa::path(
    get,
    path = "/slug/{slug}",
    tags = ["Categories"],
    params(
        ("slug" = String, Path, description = "Category slug")
    ),
    responses(
        (status = 200, description = "Get category", body = StdResponse<CategoryEntity, String>),
        (status = 404, description = "No category with this slug")
    )
)]
async fn get_category_by_slug(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let category = catalog::category_by_slug(state.store.as_ref(), &slug).await?;

    Ok(StdResponse {
        data: Some(category),
        message: Some("Get category successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Categories"],
    security(("sessionCookie" = [])),
    request_body = CreateCategoryEntity,
    responses(
        (status = 200, description = "Category created", body = StdResponse<CreatedRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 409, description = "Slug already taken")
    )
)]
async fn create_category(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CreateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    let category = catalog::create_category(state.store.as_ref(), &caller, body).await?;

    Ok(StdResponse {
        data: Some(CreatedRes::ok(category.id)),
        message: Some("Create category successfully"),
    })
}

/// Partially update a category. Absent fields are left unchanged.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Categories"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Category ID to update")
    ),
    request_body = UpdateCategoryEntity,
    responses(
        (status = 200, description = "Category updated", body = StdResponse<SuccessRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found")
    )
)]
async fn update_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<UpdateCategoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    catalog::update_category(state.store.as_ref(), &caller, id, body).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Update category successfully"),
    })
}

/// Delete a category together with its products.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Categories"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Category ID to delete")
    ),
    responses(
        (status = 200, description = "Category deleted", body = StdResponse<SuccessRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Category not found")
    )
)]
async fn delete_category(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    catalog::delete_category(state.store.as_ref(), &caller, id).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Delete category successfully"),
    })
}
