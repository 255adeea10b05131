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
    models::{RatingSummary, ReviewEntity},
    services::reviews::{self, CreateReviewReq},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/reviews",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_product_reviews))
            .routes(utoipa_axum::routes!(get_product_rating))
            .routes(utoipa_axum::routes!(create_review))
            .routes(utoipa_axum::routes!(delete_review)),
    )
}

/// List the reviews of a product, newest first.
#[utoipa::path(
    get,
    path = "/product/{productId}",
    tags = ["Reviews"],
    params(
        ("productId" = i32, Path, description = "Product to list reviews of")
    ),
    responses(
        (status = 200, description = "List reviews", body = StdResponse<Vec<ReviewEntity>, String>)
    )
)]
async fn get_product_reviews(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let reviews = reviews::by_product(state.store.as_ref(), product_id).await?;

    Ok(StdResponse {
        data: Some(reviews),
        message: Some("Get reviews successfully"),
    })
}

/// Mean rating and number of reviews of a product. Both are 0 without reviews.
#[utoipa::path(
    get,
    path = "/product/{productId}/rating",
    tags = ["Reviews"],
    params(
        ("productId" = i32, Path, description = "Product to rate")
    ),
    responses(
        (status = 200, description = "Get average rating", body = StdResponse<RatingSummary, String>)
    )
)]
async fn get_product_rating(
    Path(product_id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let summary = reviews::average_rating(state.store.as_ref(), product_id).await?;

    Ok(StdResponse {
        data: Some(summary),
        message: Some("Get average rating successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/",
    tags = ["Reviews"],
    security(("sessionCookie" = [])),
    request_body = CreateReviewReq,
    responses(
        (status = 200, description = "Review created", body = StdResponse<CreatedRes, String>),
        (status = 400, description = "Rating out of range or unknown product"),
        (status = 401, description = "No session")
    )
)]
async fn create_review(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CreateReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let review = reviews::create(state.store.as_ref(), &caller, body).await?;

    Ok(StdResponse {
        data: Some(CreatedRes::ok(review.id)),
        message: Some("Create review successfully"),
    })
}

/// Delete one of the caller's own reviews.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Reviews"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Review ID to delete")
    ),
    responses(
        (status = 200, description = "Review deleted", body = StdResponse<SuccessRes, String>),
        (status = 403, description = "Review belongs to another user"),
        (status = 404, description = "Review not found")
    )
)]
async fn delete_review(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    reviews::delete(state.store.as_ref(), &caller, id).await?;

    Ok(StdResponse {
        data: Some(SuccessRes::ok()),
        message: Some("Delete review successfully"),
    })
}
