//! Business rules between the routes and the store.
//!
//! Every operation consults [`crate::auth::authorize`] before touching the
//! store. Listing reads degrade to an empty result when the database is not
//! available; writes surface the failure.

use tracing::warn;

use crate::{
    app_error::AppError,
    store::{StoreError, StoreResult},
};

pub mod cart;
pub mod catalog;
pub mod orders;
pub mod reviews;
pub mod users;

fn degrade<T: Default>(result: StoreResult<T>, operation: &str) -> Result<T, AppError> {
    match result {
        Err(StoreError::Unavailable) => {
            warn!("Cannot {}: database not available", operation);
            Ok(T::default())
        }
        other => other.map_err(AppError::from),
    }
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Counts characters, as `VARCHAR(n)` does.
fn require_max_len(value: &str, max: usize, field: &str) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

fn require_non_negative(value: i32, field: &str) -> Result<(), AppError> {
    if value < 0 {
        return Err(AppError::BadRequest(format!("{} must not be negative", field)));
    }
    Ok(())
}
