//! Call Log Repository
//!
//! Append-only; entries are written inside the lifecycle transactions and
//! never mutated afterwards.

use shared::models::CallLog;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::RepoResult;

/// Append an entry within an ongoing lifecycle transaction
pub async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    ticket_id: i64,
    staff_id: Option<i64>,
    action: &str,
    note: Option<&str>,
    created_at: i64,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO call_log (ticket_id, staff_id, action, note, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ticket_id)
    .bind(staff_id)
    .bind(action)
    .bind(note)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// A ticket's transition history, oldest first
pub async fn find_by_ticket(pool: &SqlitePool, ticket_id: i64) -> RepoResult<Vec<CallLog>> {
    let entries = sqlx::query_as::<_, CallLog>(
        "SELECT id, ticket_id, staff_id, action, note, created_at \
         FROM call_log WHERE ticket_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(ticket_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
