//! Queue Model

use serde::{Deserialize, Serialize};

use super::Ticket;

/// Queue entity (full row, including the access token)
///
/// The token gates ticket claims and guest cancellation. It is returned only
/// by staff endpoints (create/update/rotate); public views use
/// [`QueueSummary`] / [`QueueDetail`], which carry no token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Queue {
    pub id: i64,
    pub name: String,
    pub is_open: bool,
    /// Informational counter; authoritative numbering is derived from tickets
    pub last_number: i64,
    pub token: String,
    pub created_at: i64,
}

/// Queue list item with live counters (public view, no token)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct QueueSummary {
    pub id: i64,
    pub name: String,
    pub is_open: bool,
    pub last_number: i64,
    pub created_at: i64,
    pub pending_count: i64,
    pub serving_count: i64,
}

/// Queue detail with its tickets (public view, no token)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDetail {
    pub id: i64,
    pub name: String,
    pub is_open: bool,
    pub last_number: i64,
    pub created_at: i64,
    pub tickets: Vec<Ticket>,
}

impl QueueDetail {
    pub fn from_parts(queue: Queue, tickets: Vec<Ticket>) -> Self {
        Self {
            id: queue.id,
            name: queue.name,
            is_open: queue.is_open,
            last_number: queue.last_number,
            created_at: queue.created_at,
            tickets,
        }
    }
}

/// Create queue payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueCreate {
    pub name: String,
}

/// Update queue payload (partial)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueUpdate {
    pub name: Option<String>,
    pub is_open: Option<bool>,
}
