use axum::{extract::State, http::header, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use super::SuccessRes;
use crate::{
    app_error::{AppError, StdResponse},
    app_state::AppState,
    auth::{CurrentUser, expired_session_cookie},
    models::UserEntity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/auth",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_me))
            .routes(utoipa_axum::routes!(logout)),
    )
}

/// The user behind the session cookie, or `null` without a valid session.
#[utoipa::path(
    get,
    path = "/me",
    tags = ["Auth"],
    security((), ("sessionCookie" = [])),
    responses(
        (status = 200, description = "Current user", body = StdResponse<UserEntity, String>)
    )
)]
async fn get_me(caller: Option<CurrentUser>) -> Result<impl IntoResponse, AppError> {
    Ok(StdResponse {
        data: caller.map(|caller| caller.0),
        message: Some("Get current user successfully"),
    })
}

/// Expire the session cookie.
#[utoipa::path(
    post,
    path = "/logout",
    tags = ["Auth"],
    responses(
        (status = 200, description = "Logged out", body = StdResponse<SuccessRes, String>)
    )
)]
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = expired_session_cookie(&state.config.auth.session_cookie_name).to_string();

    (
        [(header::SET_COOKIE, cookie)],
        StdResponse {
            data: Some(SuccessRes::ok()),
            message: Some("Logout successfully"),
        },
    )
}
