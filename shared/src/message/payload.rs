//! 总线消息负载类型

use serde::{Deserialize, Serialize};

/// Subscriber trust tiers
pub const ROLE_PUBLIC: &str = "public";
pub const ROLE_STAFF: &str = "staff";

/// Handshake payload sent by a connecting subscriber
///
/// A `staff` handshake must carry a valid JWT or the connection is closed;
/// connections that never handshake are treated as public.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakePayload {
    pub role: String,
    pub token: Option<String>,
}

impl HandshakePayload {
    pub fn public() -> Self {
        Self {
            role: ROLE_PUBLIC.to_string(),
            token: None,
        }
    }

    pub fn staff(token: impl Into<String>) -> Self {
        Self {
            role: ROLE_STAFF.to_string(),
            token: Some(token.into()),
        }
    }

    pub fn is_staff(&self) -> bool {
        self.role == ROLE_STAFF
    }
}
