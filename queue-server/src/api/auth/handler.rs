//! Authentication Handlers

use std::time::Duration;

use axum::{Json, extract::State};
use shared::client::{LoginRequest, LoginResponse};
use shared::models::AccountInfo;

use crate::auth::password;
use crate::core::ServerState;
use crate::db::repository::account;
use crate::utils::{AppError, AppResult};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// POST /api/auth/login - 员工登录
///
/// Authenticates staff credentials and returns a JWT token. Failures use a
/// unified message to prevent username enumeration.
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let found = account::find_by_username(&state.db.pool, &req.username).await?;

    // Fixed delay before checking the result
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    let account = match found {
        Some(account) => {
            if !account.is_active {
                return Err(AppError::Forbidden("Account has been disabled".to_string()));
            }

            let password_valid = password::verify_password(&req.password, &account.password_hash)
                .map_err(|e| AppError::Internal(format!("Password verification failed: {e}")))?;

            if !password_valid {
                tracing::warn!(username = %req.username, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }

            account
        }
        None => {
            tracing::warn!(username = %req.username, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let token = state
        .jwt_service
        .generate_token(&account)
        .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))?;

    tracing::info!(username = %account.username, "Staff logged in");

    Ok(Json(LoginResponse {
        token,
        user: AccountInfo::from(&account),
    }))
}
