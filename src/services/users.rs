use chrono::Utc;
use tracing::{info, instrument};

use super::require_max_len;
use crate::{
    app_error::AppError,
    config::AuthConfig,
    models::{Role, UpsertUserEntity, UserEntity, limits},
    store::Store,
};

/// Profile fields reported by the login gateway for a signed-in identity.
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub open_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub login_method: Option<String>,
    pub role: Option<Role>,
}

/// Inserts or refreshes the user behind `open_id` and stamps `last_signed_in`.
/// The configured owner identity is promoted to admin unless a role is given.
#[instrument(skip_all, fields(open_id = %profile.open_id))]
pub async fn sync_user(
    store: &dyn Store,
    auth: &AuthConfig,
    profile: UserProfile,
) -> Result<UserEntity, AppError> {
    if profile.open_id.trim().is_empty() {
        return Err(AppError::BadRequest("openId is required".into()));
    }
    require_max_len(&profile.open_id, limits::OPEN_ID, "openId")?;
    if let Some(email) = &profile.email {
        require_max_len(email, limits::EMAIL, "email")?;
    }
    if let Some(login_method) = &profile.login_method {
        require_max_len(login_method, limits::LOGIN_METHOD, "loginMethod")?;
    }

    let is_owner = auth.owner_open_id.as_deref() == Some(profile.open_id.as_str());
    let role = match profile.role {
        Some(role) => Some(role),
        None if is_owner => Some(Role::Admin),
        None => None,
    };

    let user = store
        .upsert_user(UpsertUserEntity {
            open_id: profile.open_id,
            name: profile.name,
            email: profile.email,
            login_method: profile.login_method,
            role: role.map(|role| role.as_str().to_string()),
            last_signed_in: Utc::now(),
        })
        .await?;

    info!("User #{} synced with role {}", user.id, user.role);
    Ok(user)
}
