use crate::{app_error::AppError, models::Role};

use super::CurrentUser;

/// What an operation demands of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any signed-in caller, acting on their own records.
    Authenticated,
    Admin,
    /// Only the user with this id.
    Owner(i32),
}

/// What the caller was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Public,
    Owner,
    Admin,
}

/// Single decision point for every role and ownership check.
pub fn authorize(caller: Option<&CurrentUser>, access: Access) -> Result<Capability, AppError> {
    if access == Access::Public {
        return Ok(Capability::Public);
    }

    let caller = caller.ok_or(AppError::Unauthorized)?;

    match access {
        Access::Public => Ok(Capability::Public),
        Access::Authenticated => Ok(Capability::Owner),
        Access::Admin if caller.role() == Role::Admin => Ok(Capability::Admin),
        Access::Admin => Err(AppError::ForbiddenResource(
            "Admin access required".into(),
        )),
        Access::Owner(owner_id) if owner_id == caller.id() => Ok(Capability::Owner),
        Access::Owner(_) => Err(AppError::ForbiddenResource(
            "Only the owner may modify this resource".into(),
        )),
    }
}
