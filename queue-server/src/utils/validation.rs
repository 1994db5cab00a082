//! Request payload validation helpers

use validator::Validate;

use super::{AppError, AppResult};

/// Validate a request body, mapping field errors to a 400 response
pub fn validate_payload<T: Validate>(payload: &T) -> AppResult<()> {
    payload
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))
}
