use axum::{extract::State, response::IntoResponse};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_error::StdResponse, app_state::AppState};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(health))
}

#[derive(Serialize, ToSchema)]
struct HealthRes {
    pub status: String,
    /// `up` or `unavailable`.
    pub database: String,
}

/// Liveness of the service. Answers 200 even when the database is down.
#[utoipa::path(
    get,
    path = "/health",
    tags = ["Health"],
    responses(
        (status = 200, description = "Service is running", body = StdResponse<HealthRes, String>)
    )
)]
async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.store.ping().await {
        Ok(()) => "up",
        Err(err) => {
            warn!("Health check: {}", err);
            "unavailable"
        }
    };

    StdResponse {
        data: Some(HealthRes {
            status: "ok".into(),
            database: database.into(),
        }),
        message: Some("Service is healthy"),
    }
}
