//! Call Log Model
//!
//! Append-only audit trail of ticket lifecycle transitions. Entries are
//! never mutated and are deleted only by cascade with their ticket.

use serde::{Deserialize, Serialize};

/// Logged action: a ticket was called
pub const ACTION_CALL: &str = "call";
/// Logged action: guest-initiated cancellation
pub const ACTION_SKIP: &str = "skip";

/// Fixed reason recorded on guest self-cancellation
pub const GUEST_CANCEL_REASON: &str = "Guest canceled";

/// CallLog entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CallLog {
    pub id: i64,
    pub ticket_id: i64,
    /// Acting staff account, or None for guest/anonymous action
    pub staff_id: Option<i64>,
    pub action: String,
    pub note: Option<String>,
    pub created_at: i64,
}
