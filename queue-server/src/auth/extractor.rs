//! JWT Extractor
//!
//! Custom extractor validating the bearer token and yielding the acting
//! staff identity in protected handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::auth::{Claims, JwtError, JwtService};
use crate::core::ServerState;
use crate::utils::AppError;

/// Authenticated staff identity attached to a request
#[derive(Debug, Clone)]
pub struct CurrentStaff {
    pub id: i64,
    pub username: String,
    pub display_name: String,
}

impl TryFrom<Claims> for CurrentStaff {
    type Error = String;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| format!("non-numeric subject: {}", claims.sub))?;
        Ok(Self {
            id,
            username: claims.username,
            display_name: claims.display_name,
        })
    }
}

impl FromRequestParts<ServerState> for CurrentStaff {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Check if already extracted earlier in the request
        if let Some(staff) = parts.extensions.get::<CurrentStaff>() {
            return Ok(staff.clone());
        }

        let auth_header = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        let token = match auth_header {
            Some(header) => JwtService::extract_from_header(header)
                .ok_or(AppError::InvalidToken)?,
            None => {
                tracing::warn!(uri = %parts.uri, "missing authorization header");
                return Err(AppError::Unauthorized);
            }
        };

        match state.jwt_service.validate_token(token) {
            Ok(claims) => {
                let staff = CurrentStaff::try_from(claims).map_err(|e| {
                    tracing::warn!(error = %e, "malformed JWT claims");
                    AppError::InvalidToken
                })?;

                // Store in extensions for potential reuse
                parts.extensions.insert(staff.clone());
                Ok(staff)
            }
            Err(e) => {
                tracing::warn!(uri = %parts.uri, error = %e, "token validation failed");
                match e {
                    JwtError::ExpiredToken => Err(AppError::TokenExpired),
                    _ => Err(AppError::InvalidToken),
                }
            }
        }
    }
}
