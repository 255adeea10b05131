use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::CurrentUser,
    models::{OrderEntity, OrderStatus},
    services::orders::{self, CreateOrderReq, OrderWithItems},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders, create_order))
            .routes(utoipa_axum::routes!(get_my_orders))
            .routes(utoipa_axum::routes!(update_order_status)),
    )
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct CreateOrderRes {
    pub success: bool,
    pub order_id: i32,
}

/// Place an order from the submitted line items.
///
/// The order and its items are written together or not at all. The cart is
/// left as is; clients clear it once the order is placed.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Orders"],
    security(("sessionCookie" = [])),
    request_body = CreateOrderReq,
    responses(
        (status = 200, description = "Order placed", body = StdResponse<CreateOrderRes, String>),
        (status = 400, description = "Empty order or totals that do not add up"),
        (status = 401, description = "No session")
    )
)]
async fn create_order(
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<CreateOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let placed = orders::create(state.store.as_ref(), &caller, body).await?;

    Ok(StdResponse {
        data: Some(CreateOrderRes {
            success: true,
            order_id: placed.order.id,
        }),
        message: Some("Create order successfully"),
    })
}

/// Fetch all orders belonging to the caller, oldest first.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Orders"],
    security(("sessionCookie" = [])),
    responses(
        (status = 200, description = "List my orders", body = StdResponse<Vec<OrderWithItems>, String>)
    )
)]
async fn get_my_orders(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = orders::my_orders(state.store.as_ref(), &caller).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get my orders successfully"),
    })
}

/// Fetch every order in the system, oldest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("sessionCookie" = [])),
    responses(
        (status = 200, description = "List all orders", body = StdResponse<Vec<OrderWithItems>, String>),
        (status = 403, description = "Admin access required")
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    caller: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let orders = orders::all(state.store.as_ref(), &caller).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateOrderStatusReq {
    pub status: OrderStatus,
}

#[derive(Serialize, ToSchema)]
struct UpdateOrderStatusRes {
    pub success: bool,
    pub order: OrderEntity,
}

/// Move an order along its lifecycle.
#[utoipa::path(
    patch,
    path = "/{id}/status",
    tags = ["Orders"],
    security(("sessionCookie" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to update")
    ),
    request_body = UpdateOrderStatusReq,
    responses(
        (status = 200, description = "Status updated", body = StdResponse<UpdateOrderStatusRes, String>),
        (status = 403, description = "Admin access required"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
async fn update_order_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    caller: CurrentUser,
    Json(body): Json<UpdateOrderStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::update_status(state.store.as_ref(), &caller, id, body.status).await?;

    Ok(StdResponse {
        data: Some(UpdateOrderStatusRes {
            success: true,
            order,
        }),
        message: Some("Update order status successfully"),
    })
}
