//! Signed session tokens carried in the session cookie.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::services::users::UserProfile;

/// Identity asserted by the login gateway, signed with the shared session secret.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub open_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_method: Option<String>,
    /// Expiry as seconds since the epoch.
    pub exp: i64,
}

impl SessionClaims {
    pub fn new(open_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            open_id: open_id.into(),
            name: None,
            email: None,
            login_method: None,
            exp: (Utc::now() + ttl).timestamp(),
        }
    }
}

impl From<SessionClaims> for UserProfile {
    fn from(claims: SessionClaims) -> Self {
        UserProfile {
            open_id: claims.open_id,
            name: claims.name,
            email: claims.email,
            login_method: claims.login_method,
            role: None,
        }
    }
}

pub fn issue(secret: &str, claims: &SessionClaims) -> jsonwebtoken::errors::Result<String> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Claims of `token` when its signature matches `secret` and it has not expired.
pub fn verify(token: &str, secret: &str) -> Option<SessionClaims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    match decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(err) => {
            warn!("Rejected session token: {}", err);
            None
        }
    }
}
