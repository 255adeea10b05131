//! Caller identity and the authorization policy.
//!
//! The upstream login gateway sets the session cookie to a token signed with
//! `SESSION_SECRET`. The first request of a new identity creates its user.

use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};

use crate::{
    app_error::AppError,
    app_state::AppState,
    models::{Role, UserEntity},
    services::users,
};

pub mod policy;
pub mod session;

pub use policy::{Access, Capability, authorize};
pub use session::SessionClaims;

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserEntity);

impl CurrentUser {
    pub fn id(&self) -> i32 {
        self.0.id
    }

    pub fn role(&self) -> Role {
        self.0.role()
    }
}

/// Value of the `cookie_name` cookie, if the request carries a non-empty one.
pub fn session_token(jar: &CookieJar, cookie_name: &str) -> Option<String> {
    jar.get(cookie_name)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Cookie that makes the browser drop the session cookie.
pub fn expired_session_cookie(cookie_name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::build((cookie_name.to_string(), ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .build();
    cookie.make_removal();
    cookie
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let auth = &state.config.auth;
    let jar = CookieJar::from_headers(&parts.headers);
    let Some(token) = session_token(&jar, &auth.session_cookie_name) else {
        return Ok(None);
    };
    let Some(secret) = auth.session_secret.as_deref() else {
        warn!("SESSION_SECRET is not set, ignoring the session cookie");
        return Ok(None);
    };
    let Some(claims) = session::verify(&token, secret) else {
        return Ok(None);
    };

    if let Some(user) = state.store.user_by_open_id(&claims.open_id).await? {
        return Ok(Some(CurrentUser(user)));
    }

    let user = users::sync_user(state.store.as_ref(), auth, claims.into()).await?;
    info!("First sign-in of user #{}", user.id);
    Ok(Some(CurrentUser(user)))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        resolve(parts, state).await?.ok_or(AppError::Unauthorized)
    }
}

impl OptionalFromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, AppError> {
        match resolve(parts, state).await {
            Err(AppError::StoreUnavailable) => {
                warn!("Cannot resolve session: database not available");
                Ok(None)
            }
            other => other,
        }
    }
}
