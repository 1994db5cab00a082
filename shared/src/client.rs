//! Client-facing DTOs shared between the server and its consumers

use serde::{Deserialize, Serialize};

use crate::models::AccountInfo;

/// Login request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response: bearer token plus the authenticated account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: AccountInfo,
}
