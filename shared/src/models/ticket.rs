//! Ticket Model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket status state machine: pending → serving → {done, skipped}
///
/// `done` and `skipped` are terminal; no transition is defined out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum TicketStatus {
    Pending,
    Serving,
    Done,
    Skipped,
}

impl TicketStatus {
    /// Terminal states admit no further transition
    pub fn is_terminal(self) -> bool {
        matches!(self, TicketStatus::Done | TicketStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Serving => "serving",
            TicketStatus::Done => "done",
            TicketStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket entity
///
/// `number` is unique within its queue and strictly increasing in claim
/// order. Holder info is stored inline on the ticket (no separate holder
/// table).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    pub queue_id: i64,
    pub number: i64,
    pub status: TicketStatus,
    pub holder_name: String,
    pub holder_code: String,
    pub created_at: i64,
    pub called_at: Option<i64>,
    pub service_start_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub cancel_reason: Option<String>,
    /// Staff account that called the ticket, if it resolved to a known account
    pub served_by: Option<i64>,
}
